//! Termination signals. Handlers are registered eagerly in
//! [`ShutdownSignals::install`] so a registration failure surfaces at startup
//! rather than when the first signal arrives.

#[cfg(unix)]
mod platform {
    use std::io;

    use tokio::signal::unix::{signal, Signal, SignalKind};
    use tracing::info;

    pub struct ShutdownSignals {
        interrupt: Signal,
        terminate: Signal,
    }

    impl ShutdownSignals {
        pub fn install() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        /// Resolves with the name of the first signal received.
        pub async fn recv(mut self) -> &'static str {
            let signal = tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            };

            info!(%signal, "Received signal, starting shutdown.");
            signal
        }
    }
}

#[cfg(not(unix))]
mod platform {
    use std::io;

    use tracing::{info, warn};

    pub struct ShutdownSignals;

    impl ShutdownSignals {
        pub fn install() -> io::Result<Self> {
            Ok(Self)
        }

        pub async fn recv(self) -> &'static str {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for CTRL_C: {e}");
                std::future::pending::<()>().await;
            }
            info!("Received CTRL_C, starting shutdown.");
            "CTRL_C"
        }
    }
}

pub use platform::ShutdownSignals;
