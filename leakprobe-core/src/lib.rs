//! # leakprobe-core
//!
//! The bounded allocation state machine and the pieces that share it.
//!
//! ### Key Submodules:
//! - `ledger`: block ownership, ceiling enforcement, release
//! - `worker`: the background leak simulation
//! - `lifecycle`: the one-way running flag and uptime clock
//! - `process`: resident/virtual memory of this process via `sysinfo`
//! - `stats`: the on-demand snapshot served by `/metrics`

pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod process;
pub mod stats;
pub mod worker;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::ledger::*;
    pub use crate::lifecycle::*;
    pub use crate::process::*;
    pub use crate::stats::*;
    pub use crate::worker::*;
}

pub use error::{LedgerError, SampleError};
pub use ledger::{AllocationLedger, LedgerStats, ReleaseSummary};
pub use lifecycle::RunState;
pub use process::{ProcessMemory, ProcessSampler};
pub use stats::StatsSnapshot;
pub use worker::{LeakSchedule, LeakWorker, WorkerHandle, WorkerState};
