//! User-facing [`HostWorld`] API and shutdown state machine.
//!
//! One `HostWorld` per host process. It validates the configuration,
//! builds the interest engine, moves it onto a dedicated tick thread and
//! spawns the dispatch worker pool. Callers interact through cheap
//! handles only: [`RegistryHandle`] for mutations,
//! [`publish_frame`](HostWorld::publish_frame) for simulation output and
//! [`latest_live`](HostWorld::latest_live) for observation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tessel_core::{HostId, SimFrame};
use tessel_space::Partition;

use crate::config::{ConfigError, WorldConfig};
use crate::dispatch::{self, Dispatcher};
use crate::metrics::{DispatchCounters, DispatchStats};
use crate::registry::{RegistryHandle, SubmitError};
use crate::ring::SnapshotRing;
use crate::tick::{InterestEngine, LiveSnapshot};
use crate::tick_thread::TickThreadState;

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from the shutdown state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Time spent waiting for the tick thread to stop.
    pub drain_ms: u64,
    /// Time spent letting workers drain the queues.
    pub quiesce_ms: u64,
    /// Whether the tick thread was joined successfully.
    pub tick_joined: bool,
    /// Number of worker threads joined.
    pub workers_joined: usize,
}

// ── ShutdownState ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Draining,
    Quiescing,
    Stopped,
}

// ── HostWorld ────────────────────────────────────────────────────

/// A running host: tick thread plus dispatch workers.
pub struct HostWorld {
    partition: Arc<Partition>,
    local: HostId,
    registry: RegistryHandle,
    frames: Arc<SnapshotRing<SimFrame>>,
    /// Serializes [`publish_frame`](Self::publish_frame); the ring is
    /// single-producer.
    publish: Mutex<()>,
    live: Arc<SnapshotRing<LiveSnapshot>>,
    counters: Arc<DispatchCounters>,
    shutdown_flag: Arc<AtomicBool>,
    tick_stopped: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<InterestEngine>>,
    worker_threads: Vec<JoinHandle<()>>,
    state: ShutdownState,
}

impl HostWorld {
    /// Validate `config` and start the host.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        let partition = config.build_partition()?;
        let local = config.local_host;
        let worker_count = config.resolved_worker_count();

        let counters = Arc::new(DispatchCounters::new());
        let (dispatcher, receivers) =
            Dispatcher::new(config.queue_capacity, config.offer_timeout(), Arc::clone(&counters));
        let frames = Arc::new(SnapshotRing::new(config.snapshot_ring_size));
        let live = Arc::new(SnapshotRing::new(config.snapshot_ring_size));

        let engine = InterestEngine::new(
            Arc::clone(&partition),
            local,
            dispatcher,
            Arc::clone(&frames),
            Arc::clone(&live),
        );
        let registry = engine.registry_handle();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let tick_stopped = Arc::new(AtomicBool::new(false));

        // Workers first: if one fails to spawn, the engine (and with it
        // the queue senders) is dropped here and the others exit.
        let mut worker_threads = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = receivers.clone();
            let handle = registry.clone();
            let c = Arc::clone(&counters);
            let worker = thread::Builder::new()
                .name(format!("tessel-dispatch-{i}"))
                .spawn(move || dispatch::worker_loop(rx, handle, c))
                .map_err(|e| ConfigError::ThreadSpawnFailed {
                    reason: format!("dispatch worker {i}: {e}"),
                })?;
            worker_threads.push(worker);
        }
        drop(receivers);

        let state = TickThreadState::new(
            engine,
            Arc::clone(&shutdown_flag),
            Arc::clone(&tick_stopped),
            config.tick_interval(),
        );
        let tick_thread = thread::Builder::new()
            .name("tessel-tick".into())
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("tick thread: {e}"),
            })?;

        tracing::info!(
            host = %local,
            workers = worker_count,
            tick_ms = config.tick_interval_ms,
            queue = config.queue_capacity,
            subtiles = partition.territory(local).len(),
            "host started"
        );

        Ok(Self {
            partition,
            local,
            registry,
            frames,
            publish: Mutex::new(()),
            live,
            counters,
            shutdown_flag,
            tick_stopped,
            tick_thread: Some(tick_thread),
            worker_threads,
            state: ShutdownState::Running,
        })
    }

    /// A producer handle for staging registry operations.
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Publish one simulation step. The next tick merges it.
    pub fn publish_frame(&self, frame: SimFrame) -> Result<(), SubmitError> {
        if self.state != ShutdownState::Running {
            return Err(SubmitError::Shutdown);
        }
        let _guard = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        self.frames.push(frame);
        Ok(())
    }

    /// Membership after the most recent executed tick.
    pub fn latest_live(&self) -> Option<Arc<LiveSnapshot>> {
        self.live.latest()
    }

    /// Cumulative dispatch counters.
    pub fn counters(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    /// The shared partition.
    pub fn partition(&self) -> &Arc<Partition> {
        &self.partition
    }

    /// This host's identity.
    pub fn local_host(&self) -> HostId {
        self.local
    }

    /// Stop the host.
    ///
    /// 1. **Running → Draining:** set the shutdown flag, unpark the tick
    ///    thread and wait for it to leave its loop. A tick in progress
    ///    completes.
    /// 2. **Draining → Quiescing:** recover the engine, clear the live
    ///    sequences and drop it, which closes both dispatch queues.
    ///    Workers drain what is queued and exit.
    /// 3. **Quiescing → Stopped:** join every worker.
    ///
    /// Idempotent.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ShutdownState::Stopped {
            return ShutdownReport {
                total_ms: 0,
                drain_ms: 0,
                quiesce_ms: 0,
                tick_joined: true,
                workers_joined: 0,
            };
        }

        let start = Instant::now();

        // Phase 1: Running → Draining
        self.state = ShutdownState::Draining;
        self.shutdown_flag.store(true, Ordering::Release);
        if let Some(handle) = &self.tick_thread {
            handle.thread().unpark();
        }
        let drain_deadline = Instant::now() + Duration::from_millis(500);
        while !self.tick_stopped.load(Ordering::Acquire) {
            if Instant::now() > drain_deadline {
                tracing::warn!(host = %self.local, "tick thread slow to stop");
                break;
            }
            thread::yield_now();
        }

        let tick_joined = match self.tick_thread.take().map(JoinHandle::join) {
            Some(Ok(engine)) => {
                engine.stop();
                true
            }
            Some(Err(_)) => false,
            None => true,
        };
        let drain_ms = start.elapsed().as_millis() as u64;

        // Phase 2: Draining → Quiescing
        self.state = ShutdownState::Quiescing;
        let mut workers_joined = 0;
        for handle in self.worker_threads.drain(..) {
            if handle.join().is_ok() {
                workers_joined += 1;
            }
        }
        let quiesce_ms = (start.elapsed().as_millis() as u64).saturating_sub(drain_ms);

        // Phase 3: Quiescing → Stopped
        self.state = ShutdownState::Stopped;
        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            drain_ms,
            quiesce_ms,
            tick_joined,
            workers_joined,
        };
        tracing::info!(
            host = %self.local,
            total_ms = report.total_ms,
            workers = report.workers_joined,
            "host stopped"
        );
        report
    }
}

impl Drop for HostWorld {
    fn drop(&mut self) {
        if self.state != ShutdownState::Stopped {
            self.shutdown();
        }
    }
}
