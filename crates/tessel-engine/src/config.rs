//! Host configuration, validation, and error types.
//!
//! [`WorldConfig`] is the input for constructing a [`HostWorld`](crate::HostWorld).
//! [`validate()`](WorldConfig::validate) checks every structural invariant
//! at startup; an invalid partition is fatal and never reaches the tick
//! loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessel_core::HostId;
use tessel_space::{Partition, PartitionConfig, PartitionError};

/// Default dispatch queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default bounded-wait offer timeout, in milliseconds.
pub const DEFAULT_OFFER_TIMEOUT_MS: u64 = 10;
/// Default tick interval, in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
/// Default live snapshot ring size.
pub const DEFAULT_RING_SIZE: usize = 8;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`WorldConfig::validate()`] or host startup.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The partition configuration is inconsistent.
    #[error("partition: {0}")]
    Partition(#[from] PartitionError),
    /// `local_host` is not in the host directory.
    #[error("local host {host} is not in the host directory")]
    UnknownLocalHost {
        /// The configured local host.
        host: HostId,
    },
    /// `local_host` owns no subtile.
    #[error("local host {host} owns no territory")]
    EmptyTerritory {
        /// The configured local host.
        host: HostId,
    },
    /// Tick interval is zero.
    #[error("tick_interval_ms must be at least 1")]
    InvalidTickInterval,
    /// Dispatch queue capacity is zero.
    #[error("queue_capacity must be at least 1")]
    QueueCapacityZero,
    /// Snapshot ring size is below the minimum of 2.
    #[error("snapshot_ring_size {configured} is below minimum of 2")]
    RingTooSmall {
        /// The configured size that was too small.
        configured: usize,
    },
    /// A background thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

// ── WorldConfig ────────────────────────────────────────────────────

/// Complete configuration for one host.
///
/// Every host of a deployment shares the same `partition`; only
/// `local_host` differs. Deserializable so a bootstrapper can ship it in
/// any serde format; omitted tuning fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World bounds, subtile grid, assignment and host directory.
    pub partition: PartitionConfig,
    /// The host this process is.
    pub local_host: HostId,
    /// Fixed tick period in milliseconds. Default: 50.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Dispatch queue capacity. Default: 1000.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long a tick waits for queue space before dropping an update
    /// list, in milliseconds. Default: 10.
    #[serde(default = "default_offer_timeout_ms")]
    pub offer_timeout_ms: u64,
    /// Number of dispatch worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[1, 8]`).
    #[serde(default)]
    pub worker_count: Option<usize>,
    /// Number of live snapshots retained. Default: 8. Minimum: 2.
    #[serde(default = "default_ring_size")]
    pub snapshot_ring_size: usize,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_offer_timeout_ms() -> u64 {
    DEFAULT_OFFER_TIMEOUT_MS
}

fn default_ring_size() -> usize {
    DEFAULT_RING_SIZE
}

impl WorldConfig {
    /// A configuration with default tuning.
    pub fn new(partition: PartitionConfig, local_host: HostId) -> Self {
        Self {
            partition,
            local_host,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            offer_timeout_ms: DEFAULT_OFFER_TIMEOUT_MS,
            worker_count: None,
            snapshot_ring_size: DEFAULT_RING_SIZE,
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_partition().map(|_| ())
    }

    /// Validate and build the shared partition.
    pub(crate) fn build_partition(&self) -> Result<Arc<Partition>, ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero);
        }
        if self.snapshot_ring_size < 2 {
            return Err(ConfigError::RingTooSmall {
                configured: self.snapshot_ring_size,
            });
        }
        let partition = Partition::new(self.partition.clone())?;
        if !partition.directory().contains(self.local_host) {
            return Err(ConfigError::UnknownLocalHost {
                host: self.local_host,
            });
        }
        if partition.territory(self.local_host).is_empty() {
            return Err(ConfigError::EmptyTerritory {
                host: self.local_host,
            });
        }
        Ok(Arc::new(partition))
    }

    /// Tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Offer timeout.
    pub fn offer_timeout(&self) -> Duration {
        Duration::from_millis(self.offer_timeout_ms)
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(2);
                (cpus / 2).clamp(1, 8)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_test_utils::two_host_partition;

    #[test]
    fn defaults_validate() {
        let cfg = WorldConfig::new(two_host_partition(), HostId(1));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.queue_capacity, 1000);
        assert_eq!(cfg.offer_timeout(), Duration::from_millis(10));
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut cfg = WorldConfig::new(two_host_partition(), HostId(1));
        cfg.queue_capacity = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::QueueCapacityZero));
    }

    #[test]
    fn ring_too_small_rejected() {
        let mut cfg = WorldConfig::new(two_host_partition(), HostId(1));
        cfg.snapshot_ring_size = 1;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::RingTooSmall { configured: 1 })
        );
    }

    #[test]
    fn unknown_local_host_rejected() {
        let cfg = WorldConfig::new(two_host_partition(), HostId(9));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UnknownLocalHost { host: HostId(9) })
        );
    }

    #[test]
    fn partition_errors_propagate() {
        let mut cfg = WorldConfig::new(two_host_partition(), HostId(1));
        cfg.partition.subtiles.pop();
        assert!(matches!(cfg.validate(), Err(ConfigError::Partition(_))));
    }

    #[test]
    fn worker_count_clamped() {
        let mut cfg = WorldConfig::new(two_host_partition(), HostId(1));
        cfg.worker_count = Some(0);
        assert_eq!(cfg.resolved_worker_count(), 1);
        cfg.worker_count = Some(500);
        assert_eq!(cfg.resolved_worker_count(), 64);
        cfg.worker_count = None;
        assert!((1..=8).contains(&cfg.resolved_worker_count()));
    }

    #[test]
    fn tuning_fields_default_when_omitted() {
        let json = serde_json::json!({
            "partition": serde_json::to_value(two_host_partition()).unwrap(),
            "local_host": 2
        });
        let cfg: WorldConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.local_host, HostId(2));
        assert_eq!(cfg.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(cfg.snapshot_ring_size, DEFAULT_RING_SIZE);
        assert!(cfg.worker_count.is_none());
    }
}
