//! Probe lifecycle coordinator.
//!
//! Startup order is ledger, worker, watcher, server. Shutdown runs the other
//! way: the run state flips, the server drains, the worker is joined and the
//! ledger is released exactly once.

use std::future::{Future, IntoFuture};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use leakprobe_api::ControlState;
use leakprobe_config::ProbeConfig;
use leakprobe_core::{AllocationLedger, LeakSchedule, LeakWorker, ProcessSampler, RunState};
use leakprobe_telemetry::{EventLogger, MetricsRecorder, ProbeEvent};

use crate::engine::error::EngineError;
use crate::engine::signal::ShutdownSignals;

/// Upper bound on waiting for in-flight connections once stopped.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShutdownReport {
    pub released_blocks: usize,
    pub released_mb: u64,
    pub uptime: Duration,
}

pub struct ProbeRuntime {
    config: Arc<ProbeConfig>,
    ledger: Arc<AllocationLedger>,
    run_state: Arc<RunState>,
    sampler: Arc<ProcessSampler>,
    metrics: MetricsRecorder,
}

impl ProbeRuntime {
    pub fn new(config: ProbeConfig) -> Result<Self, EngineError> {
        let ledger = Arc::new(AllocationLedger::new(config.max_memory_mb));
        Ok(Self {
            config: Arc::new(config),
            ledger,
            run_state: Arc::new(RunState::new()),
            sampler: Arc::new(ProcessSampler::new()?),
            metrics: MetricsRecorder::new()?,
        })
    }

    pub fn ledger(&self) -> &Arc<AllocationLedger> {
        &self.ledger
    }

    pub fn run_state(&self) -> &Arc<RunState> {
        &self.run_state
    }

    /// Binds every IPv4 interface on the configured port.
    pub async fn bind(&self) -> Result<TcpListener, EngineError> {
        let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        TcpListener::bind(address)
            .await
            .map_err(|source| EngineError::Bind { address, source })
    }

    /// Serves until `shutdown` resolves (or the server fails), then tears
    /// everything down. The ledger is released even when serving failed.
    #[instrument(name = "probe_runtime", skip_all)]
    pub async fn run<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<ShutdownReport, EngineError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr().map_err(EngineError::Serve)?;
        info!(
            %address,
            leak_enabled = self.config.leak_enabled,
            max_memory_mb = self.config.max_memory_mb,
            "Starting memory leak probe"
        );
        EventLogger::log_event(
            ProbeEvent::Started,
            &[
                KeyValue::new("port", i64::from(address.port())),
                KeyValue::new("leak_enabled", self.config.leak_enabled),
                KeyValue::new("max_memory_mb", self.config.max_memory_mb as i64),
            ],
        )
        .await;

        let worker = self.config.leak_enabled.then(|| {
            LeakWorker::new(
                self.ledger.clone(),
                self.run_state.clone(),
                LeakSchedule::new(self.config.leak_rate_mb, self.config.leak_interval()),
                self.metrics.clone(),
            )
            .spawn()
        });

        // Only flips the flag; everything else happens on this task.
        let watcher = {
            let run_state = self.run_state.clone();
            tokio::spawn(async move {
                shutdown.await;
                run_state.stop();
            })
        };

        let app = leakprobe_api::router(ControlState::new(
            self.config.clone(),
            self.ledger.clone(),
            self.run_state.clone(),
            self.sampler.clone(),
            self.metrics.clone(),
        ));
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(self.run_state.stopped_owned())
            .into_future();
        tokio::pin!(server);

        let finished_early = tokio::select! {
            result = &mut server => Some(result),
            () = self.run_state.stopped() => None,
        };
        let served = match finished_early {
            Some(result) => result,
            None => match timeout(DRAIN_TIMEOUT, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Connections still open after {}ms, closing them",
                        DRAIN_TIMEOUT.as_millis()
                    );
                    Ok(())
                }
            },
        };

        self.run_state.stop();
        watcher.abort();

        if let Some(worker) = worker {
            if let Err(e) = worker.join().await {
                error!("Memory leak worker ended abnormally: {e}");
            }
        }

        let summary = self.ledger.release_all();
        let report = ShutdownReport {
            released_blocks: summary.blocks,
            released_mb: summary.megabytes,
            uptime: self.run_state.uptime(),
        };
        info!(
            released_blocks = report.released_blocks,
            released_mb = report.released_mb,
            "Memory leak probe stopped"
        );
        EventLogger::log_event(
            ProbeEvent::Stopped,
            &[
                KeyValue::new("released_mb", report.released_mb as i64),
                KeyValue::new("uptime_seconds", report.uptime.as_secs() as i64),
            ],
        )
        .await;

        served.map_err(EngineError::Serve)?;
        Ok(report)
    }
}

/// Runs the probe until SIGINT or SIGTERM.
pub async fn run_probe(config: ProbeConfig) -> Result<ShutdownReport, EngineError> {
    let signals = ShutdownSignals::install().map_err(EngineError::Signal)?;
    let runtime = ProbeRuntime::new(config)?;
    let listener = runtime.bind().await?;
    runtime
        .run(listener, async move {
            signals.recv().await;
        })
        .await
}
