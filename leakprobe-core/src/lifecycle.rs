//! One-way running flag shared by the worker, the control surface and the
//! signal watcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::{
    CancellationToken, WaitForCancellationFuture, WaitForCancellationFutureOwned,
};

/// `running` starts true and can only ever become false.
#[derive(Debug)]
pub struct RunState {
    running: AtomicBool,
    started_at: Instant,
    stopped: CancellationToken,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            started_at: Instant::now(),
            stopped: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flips the flag and wakes every waiter. Returns `true` for the call that
    /// actually performed the transition.
    ///
    /// Safe to call from a signal watcher: it neither allocates nor logs.
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.stopped.cancel();
        was_running
    }

    /// Resolves once [`RunState::stop`] has been called.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stopped.cancelled()
    }

    pub fn stopped_owned(&self) -> WaitForCancellationFutureOwned {
        self.stopped.clone().cancelled_owned()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
