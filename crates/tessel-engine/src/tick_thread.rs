//! Tick thread body for [`HostWorld`](crate::HostWorld).
//!
//! Owns the [`InterestEngine`] exclusively and runs it at a fixed
//! interval. The engine is returned from [`run`](TickThreadState::run)
//! so shutdown can stop it after the loop has exited.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::tick::{InterestEngine, TickOutcome};

pub(crate) struct TickThreadState {
    engine: InterestEngine,
    shutdown_flag: Arc<AtomicBool>,
    tick_stopped: Arc<AtomicBool>,
    interval: Duration,
}

impl TickThreadState {
    pub(crate) fn new(
        engine: InterestEngine,
        shutdown_flag: Arc<AtomicBool>,
        tick_stopped: Arc<AtomicBool>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            shutdown_flag,
            tick_stopped,
            interval,
        }
    }

    /// Main tick loop. Runs until `shutdown_flag` is set; a tick in
    /// progress always completes.
    pub(crate) fn run(mut self) -> InterestEngine {
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                break;
            }

            let tick_start = Instant::now();
            if let TickOutcome::Executed(report) = self.engine.execute_tick() {
                if report.dropped > 0 {
                    tracing::trace!(tick = report.tick, dropped = report.dropped, "update lists dropped");
                }
            }

            // park_timeout instead of sleep so shutdown can unpark us.
            let elapsed = tick_start.elapsed();
            if let Some(remaining) = self.interval.checked_sub(elapsed) {
                std::thread::park_timeout(remaining);
            }
        }

        self.tick_stopped.store(true, Ordering::Release);
        self.engine
    }
}
