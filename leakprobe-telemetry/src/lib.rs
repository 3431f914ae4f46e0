//! # leakprobe Telemetry
//!
//! Crate for logging and metrics shared by the probe's worker, control surface
//! and lifecycle coordinator.

pub mod logging;
pub mod metrics;

pub use logging::{EventLogger, ProbeEvent};
pub use metrics::MetricsRecorder;
