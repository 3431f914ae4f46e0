use clap::Parser;

use leakprobe_config::Overrides;

/// Memory leak probe: a small HTTP service that can grow its own memory use
/// on purpose, up to a hard ceiling.
///
/// Every flag is optional and, when given, wins over the matching
/// environment variable.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Enable the background leak (overrides LEAK)
    #[arg(long)]
    pub leak: Option<bool>,

    /// Megabytes per allocation step, clamped to 1..=100 (overrides LEAK_RATE)
    #[arg(long)]
    pub leak_rate: Option<i64>,

    /// Seconds between steps, clamped to 0.1..=10 (overrides LEAK_INTERVAL)
    #[arg(long)]
    pub leak_interval: Option<f64>,

    /// Allocation ceiling in megabytes, clamped to 10..=2048 (overrides MAX_MEMORY)
    #[arg(long)]
    pub max_memory: Option<i64>,

    /// Listening port (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl From<Cli> for Overrides {
    fn from(cli: Cli) -> Self {
        Overrides {
            leak: cli.leak,
            leak_rate: cli.leak_rate,
            leak_interval: cli.leak_interval,
            max_memory: cli.max_memory,
            port: cli.port,
        }
    }
}
