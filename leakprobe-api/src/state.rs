use std::sync::Arc;

use leakprobe_config::ProbeConfig;
use leakprobe_core::{AllocationLedger, ProcessSampler, RunState};
use leakprobe_telemetry::MetricsRecorder;

/// Everything a handler may read. Cheap to clone; axum clones it per request.
#[derive(Clone)]
pub struct ControlState {
    pub config: Arc<ProbeConfig>,
    pub ledger: Arc<AllocationLedger>,
    pub run_state: Arc<RunState>,
    pub sampler: Arc<ProcessSampler>,
    pub metrics: MetricsRecorder,
}

impl ControlState {
    pub fn new(
        config: Arc<ProbeConfig>,
        ledger: Arc<AllocationLedger>,
        run_state: Arc<RunState>,
        sampler: Arc<ProcessSampler>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            config,
            ledger,
            run_state,
            sampler,
            metrics,
        }
    }
}
