//! Probe settings: the raw, operator-facing shape and the clamped result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Allowed range of the per-allocation increment, in MiB.
pub const LEAK_RATE_MB: std::ops::RangeInclusive<u64> = 1..=100;
/// Allowed range of the allocation cadence, in seconds.
pub const LEAK_INTERVAL_SECS: std::ops::RangeInclusive<f64> = 0.1..=10.0;
/// Allowed range of the allocation ceiling, in MiB.
pub const MAX_MEMORY_MB: std::ops::RangeInclusive<u64> = 10..=2048;

/// Validated probe configuration, immutable after startup.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct ProbeConfig {
    /// Whether the leak worker runs at all.
    pub leak_enabled: bool,

    /// Size of each allocation made by the worker.
    #[validate(range(min = 1, max = 100))]
    pub leak_rate_mb: u64,

    /// Pause between successful allocations.
    #[validate(range(min = 0.1, max = 10.0))]
    #[validate(custom(function = validation::validate_finite))]
    pub leak_interval_secs: f64,

    /// Hard ceiling on tracked allocation.
    #[validate(range(min = 10, max = 2048))]
    pub max_memory_mb: u64,

    /// HTTP port of the control surface.
    pub port: u16,
}

impl ProbeConfig {
    /// Builds a configuration, clamping every numeric field into its range.
    pub fn new(
        leak_enabled: bool,
        leak_rate_mb: i64,
        leak_interval_secs: f64,
        max_memory_mb: i64,
        port: u16,
    ) -> Self {
        Self {
            leak_enabled,
            leak_rate_mb: validation::clamp_int(leak_rate_mb, LEAK_RATE_MB),
            leak_interval_secs: validation::clamp_float(leak_interval_secs, LEAK_INTERVAL_SECS),
            max_memory_mb: validation::clamp_int(max_memory_mb, MAX_MEMORY_MB),
            port,
        }
    }

    pub fn leak_interval(&self) -> Duration {
        Duration::from_secs_f64(self.leak_interval_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        RawSettings::default().into()
    }
}

/// `LEAK` is read leniently: figment may hand us a bool, a number or a string
/// depending on how the value looks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum LeakFlag {
    Bool(bool),
    Num(f64),
    Text(String),
}

impl LeakFlag {
    fn enabled(&self) -> bool {
        match self {
            LeakFlag::Bool(b) => *b,
            LeakFlag::Num(_) => false,
            LeakFlag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// Settings exactly as the environment spells them, before clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawSettings {
    pub leak: LeakFlag,
    pub leak_rate: i64,
    pub leak_interval: f64,
    pub max_memory: i64,
    pub port: u16,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            leak: LeakFlag::Bool(false),
            leak_rate: 1,
            leak_interval: 1.0,
            max_memory: 500,
            port: 8080,
        }
    }
}

impl From<RawSettings> for ProbeConfig {
    fn from(raw: RawSettings) -> Self {
        ProbeConfig::new(
            raw.leak.enabled(),
            raw.leak_rate,
            raw.leak_interval,
            raw.max_memory,
            raw.port,
        )
    }
}

/// Command-line overrides. Unset fields leave the environment value alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leak: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leak_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leak_interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}
