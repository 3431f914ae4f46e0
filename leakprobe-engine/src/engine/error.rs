use std::net::SocketAddr;

use thiserror::Error;

use leakprobe_core::SampleError;

/// Failures that end the process. All of them happen at startup except
/// [`EngineError::Serve`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("process sampler unavailable: {0}")]
    Sampler(#[from] SampleError),
}
