//! # leakprobe-engine
//!
//! Ties the ledger, the leak worker and the control surface together and owns
//! process lifetime: startup, signal-driven shutdown, final release.

pub mod engine;

pub use engine::{run_probe, EngineError, ProbeRuntime, ShutdownReport, ShutdownSignals};
