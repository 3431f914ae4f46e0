//! ## leakprobe-telemetry::metrics
//! **Prometheus exporter for allocation activity**
//!
//! Counters are bumped by the leak worker and the cleanup endpoint; the
//! gauges are refreshed from a ledger snapshot right before each scrape.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub allocations: IntCounter,
    pub limit_hits: IntCounter,
    pub allocation_failures: IntCounter,
    pub cleanups: IntCounter,
    pub allocated_mb: IntGauge,
    pub allocated_chunks: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let allocations = IntCounter::new(
            "leakprobe_allocations_total",
            "Blocks successfully added to the ledger",
        )?;
        let limit_hits = IntCounter::new(
            "leakprobe_limit_hits_total",
            "Allocations refused because the ceiling would be exceeded",
        )?;
        let allocation_failures = IntCounter::new(
            "leakprobe_allocation_failures_total",
            "Allocations the host could not satisfy",
        )?;
        let cleanups = IntCounter::new(
            "leakprobe_cleanups_total",
            "Release passes triggered through the control surface",
        )?;
        let allocated_mb = IntGauge::new(
            "leakprobe_allocated_megabytes",
            "Logical memory currently held by the ledger",
        )?;
        let allocated_chunks = IntGauge::new(
            "leakprobe_allocated_chunks",
            "Blocks currently held by the ledger",
        )?;

        registry.register(Box::new(allocations.clone()))?;
        registry.register(Box::new(limit_hits.clone()))?;
        registry.register(Box::new(allocation_failures.clone()))?;
        registry.register(Box::new(cleanups.clone()))?;
        registry.register(Box::new(allocated_mb.clone()))?;
        registry.register(Box::new(allocated_chunks.clone()))?;

        Ok(Self {
            registry,
            allocations,
            limit_hits,
            allocation_failures,
            cleanups,
            allocated_mb,
            allocated_chunks,
        })
    }

    /// Records the ledger occupancy the next scrape should report.
    pub fn set_occupancy(&self, chunks: usize, megabytes: u64) {
        self.allocated_chunks.set(chunks as i64);
        self.allocated_mb.set(megabytes as i64);
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposition_contains_all_series() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.allocations.inc();
        metrics.set_occupancy(3, 12);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("leakprobe_allocations_total 1"));
        assert!(text.contains("leakprobe_limit_hits_total 0"));
        assert!(text.contains("leakprobe_allocated_megabytes 12"));
        assert!(text.contains("leakprobe_allocated_chunks 3"));
    }

    #[test]
    fn test_recorders_are_independent() {
        let first = MetricsRecorder::new().unwrap();
        let second = MetricsRecorder::new().unwrap();
        first.cleanups.inc();
        assert_eq!(first.cleanups.get(), 1);
        assert_eq!(second.cleanups.get(), 0);
    }
}
