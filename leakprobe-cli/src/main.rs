//! ## leakprobe-cli
//! **Process entrypoint**
//!
//! Installs logging, resolves configuration and hands control to the engine
//! until SIGINT or SIGTERM. A startup failure exits non-zero.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use leakprobe_config::ProbeConfig;
use leakprobe_telemetry::logging::EventLogger;

mod args;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();

    let config = ProbeConfig::load_with(cli.into()).context("invalid configuration")?;
    info!(
        leak_enabled = config.leak_enabled,
        leak_rate_mb = config.leak_rate_mb,
        leak_interval_secs = config.leak_interval_secs,
        max_memory_mb = config.max_memory_mb,
        port = config.port,
        "Configuration loaded"
    );

    let report = leakprobe_engine::run_probe(config)
        .await
        .context("memory leak probe failed")?;
    info!(
        released_mb = report.released_mb,
        uptime_secs = report.uptime.as_secs(),
        "Shutdown complete"
    );
    Ok(())
}
