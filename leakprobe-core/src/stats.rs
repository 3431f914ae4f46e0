//! ## leakprobe-core::stats
//! **The on-demand snapshot served by `/metrics`**
//!
//! Recomputed for every request; nothing here is cached.

use std::time::Duration;

use serde::Serialize;

use crate::error::SampleError;
use crate::ledger::{AllocationLedger, LedgerStats};
use crate::lifecycle::RunState;
use crate::process::{ProcessMemory, ProcessSampler};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub allocated_chunks: usize,
    pub allocated_memory_mb: u64,
    pub process_memory_mb: f64,
    pub process_virtual_memory_mb: f64,
    pub memory_percent: f64,
    pub uptime_seconds: u64,
    pub leak_enabled: bool,
    pub max_memory_mb: u64,
}

impl StatsSnapshot {
    /// The ledger is read first, so `allocated_memory_mb` reflects the ledger
    /// at the moment of the call rather than after the process probe.
    pub fn capture(
        ledger: &AllocationLedger,
        sampler: &ProcessSampler,
        run_state: &RunState,
        leak_enabled: bool,
    ) -> Result<Self, SampleError> {
        let ledger = ledger.stats();
        let process = sampler.sample()?;
        Ok(Self::compose(ledger, process, run_state.uptime(), leak_enabled))
    }

    pub fn compose(
        ledger: LedgerStats,
        process: ProcessMemory,
        uptime: Duration,
        leak_enabled: bool,
    ) -> Self {
        Self {
            allocated_chunks: ledger.chunks,
            allocated_memory_mb: ledger.allocated_mb,
            process_memory_mb: process.resident_mb(),
            process_virtual_memory_mb: process.virtual_mb(),
            memory_percent: process.percent_of_host(),
            uptime_seconds: uptime.as_secs(),
            leak_enabled,
            max_memory_mb: ledger.ceiling_mb,
        }
    }
}
