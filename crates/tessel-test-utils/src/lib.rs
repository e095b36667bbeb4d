//! Test utilities and mock types for Tessel development.
//!
//! Provides a recording [`Transport`](tessel_core::Transport) mock that
//! can be switched into failure mode, and a set of partition fixtures
//! (see [`fixtures`]) shared by unit tests, integration tests and
//! benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
mod transport;

pub use fixtures::{grid_partition, quadrant_partition, two_host_partition};
pub use transport::RecordingTransport;
