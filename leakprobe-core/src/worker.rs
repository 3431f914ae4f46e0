//! ## leakprobe-core::worker
//! **Background leak simulation**
//!
//! `Idle -> Running -> Stopped`. While running the worker grows the ledger by
//! a fixed increment, sleeps, and repeats. A full ledger stretches the sleep
//! instead of spinning against the ceiling. No failure ends the loop; only
//! the run state does.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinError, JoinHandle};
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};

use leakprobe_telemetry::MetricsRecorder;

use crate::error::LedgerError;
use crate::ledger::AllocationLedger;
use crate::lifecycle::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            _ => WorkerState::Stopped,
        }
    }
}

/// Result of one allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Allocated,
    LimitReached,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakSchedule {
    pub rate_mb: u64,
    pub interval: Duration,
}

impl LeakSchedule {
    /// Multiplier applied to the interval once the ceiling is reached.
    pub const LIMIT_BACKOFF_FACTOR: u32 = 5;

    pub fn new(rate_mb: u64, interval: Duration) -> Self {
        Self { rate_mb, interval }
    }

    pub fn delay_after(&self, outcome: StepOutcome) -> Duration {
        match outcome {
            StepOutcome::Allocated | StepOutcome::Failed => self.interval,
            StepOutcome::LimitReached => self.interval * Self::LIMIT_BACKOFF_FACTOR,
        }
    }
}

pub struct LeakWorker {
    ledger: Arc<AllocationLedger>,
    run_state: Arc<RunState>,
    schedule: LeakSchedule,
    metrics: MetricsRecorder,
    state: Arc<AtomicU8>,
}

/// Handle to a spawned worker.
pub struct WorkerHandle {
    state: Arc<AtomicU8>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}

impl LeakWorker {
    pub fn new(
        ledger: Arc<AllocationLedger>,
        run_state: Arc<RunState>,
        schedule: LeakSchedule,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            ledger,
            run_state,
            schedule,
            metrics,
            state: Arc::new(AtomicU8::new(WorkerState::Idle as u8)),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Runs the worker as a detached tokio task.
    pub fn spawn(self) -> WorkerHandle {
        let state = self.state.clone();
        let join = tokio::spawn(self.run().instrument(info_span!("leak_worker")));
        WorkerHandle { state, join }
    }

    pub async fn run(self) {
        self.set_state(WorkerState::Running);
        info!(
            rate_mb = self.schedule.rate_mb,
            interval_ms = self.schedule.interval.as_millis() as u64,
            "Memory leak worker started"
        );

        loop {
            if !self.run_state.is_running() {
                break;
            }

            let outcome = self.step().await;
            let delay = self.schedule.delay_after(outcome);

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.run_state.stopped() => break,
            }
        }

        self.set_state(WorkerState::Stopped);
        info!("Memory leak worker stopped");
    }

    /// One allocation attempt on the blocking pool; page commitment of up to
    /// 100MB must not occupy a runtime thread.
    pub async fn step(&self) -> StepOutcome {
        let ledger = self.ledger.clone();
        let rate_mb = self.schedule.rate_mb;

        match task::spawn_blocking(move || ledger.allocate(rate_mb)).await {
            Ok(Ok(())) => {
                self.metrics.allocations.inc();
                StepOutcome::Allocated
            }
            Ok(Err(LedgerError::LimitExceeded { ceiling_mb, .. })) => {
                self.metrics.limit_hits.inc();
                warn!("Memory allocation would exceed limit ({ceiling_mb}MB), backing off");
                StepOutcome::LimitReached
            }
            Ok(Err(e)) => {
                self.metrics.allocation_failures.inc();
                error!("Memory allocation failed: {e}");
                StepOutcome::Failed
            }
            Err(e) => {
                self.metrics.allocation_failures.inc();
                error!("Unexpected error in memory leak worker: {e}");
                StepOutcome::Failed
            }
        }
    }
}
