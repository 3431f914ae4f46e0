mod error;
mod runtime;
mod signal;

pub use self::{
    error::EngineError,
    runtime::{run_probe, ProbeRuntime, ShutdownReport},
    signal::ShutdownSignals,
};

pub mod prelude {
    pub use super::{run_probe, EngineError, ProbeRuntime, ShutdownReport};
}
