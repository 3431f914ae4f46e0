//! # leakprobe Configuration
//!
//! Loads the probe settings from the process environment, lets command-line
//! flags override them, and clamps every numeric value into its documented
//! range.
//!
//! ## Sources (later wins)
//! 1. Built-in defaults
//! 2. `LEAK`, `LEAK_RATE`, `LEAK_INTERVAL`, `MAX_MEMORY`, `PORT`
//! 3. [`Overrides`] supplied by the caller

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use validator::Validate;

mod error;
mod probe;
mod validation;

pub use error::ConfigError;
pub use probe::{Overrides, ProbeConfig, LEAK_INTERVAL_SECS, LEAK_RATE_MB, MAX_MEMORY_MB};

use probe::RawSettings;

/// Environment variables read by the probe.
pub const ENV_KEYS: [&str; 5] = ["LEAK", "LEAK_RATE", "LEAK_INTERVAL", "MAX_MEMORY", "PORT"];

impl ProbeConfig {
    /// Load configuration from defaults and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Overrides::default())
    }

    /// Load configuration, letting `overrides` win over the environment.
    pub fn load_with(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(overrides))
    }

    /// The layered provider stack, exposed for embedding and tests.
    pub fn figment(overrides: Overrides) -> Figment {
        Figment::from(Serialized::defaults(RawSettings::default()))
            .merge(Env::raw().only(&ENV_KEYS))
            .merge(Serialized::defaults(overrides))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let raw: RawSettings = figment.extract()?;
        let config = ProbeConfig::from(raw);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load() -> figment::Result<ProbeConfig> {
        ProbeConfig::load().map_err(|e| e.to_string().into())
    }

    #[test]
    fn defaults_without_environment() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = load()?;
            assert_eq!(config, ProbeConfig::default());
            Ok(())
        });
    }

    #[test]
    fn environment_values_are_read() {
        Jail::expect_with(|jail| {
            jail.set_env("LEAK", "TRUE");
            jail.set_env("LEAK_RATE", "4");
            jail.set_env("LEAK_INTERVAL", "0.5");
            jail.set_env("MAX_MEMORY", "64");
            jail.set_env("PORT", "9090");

            let config = load()?;
            assert!(config.leak_enabled);
            assert_eq!(config.leak_rate_mb, 4);
            assert_eq!(config.leak_interval_secs, 0.5);
            assert_eq!(config.max_memory_mb, 64);
            assert_eq!(config.port, 9090);
            Ok(())
        });
    }

    #[test]
    fn leak_flag_is_case_insensitive() {
        Jail::expect_with(|jail| {
            jail.set_env("LEAK", "true");
            assert!(load()?.leak_enabled);
            jail.set_env("LEAK", "False");
            assert!(!load()?.leak_enabled);
            jail.set_env("LEAK", "1");
            assert!(!load()?.leak_enabled);
            Ok(())
        });
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        Jail::expect_with(|jail| {
            jail.set_env("LEAK_RATE", "500");
            jail.set_env("MAX_MEMORY", "5");
            let config = load()?;
            assert_eq!(config.leak_rate_mb, 100);
            assert_eq!(config.max_memory_mb, 10);

            jail.set_env("LEAK_RATE", "0");
            jail.set_env("LEAK_INTERVAL", "99");
            let config = load()?;
            assert_eq!(config.leak_rate_mb, 1);
            assert_eq!(config.leak_interval_secs, 10.0);
            Ok(())
        });
    }

    #[test]
    fn integer_interval_is_accepted() {
        Jail::expect_with(|jail| {
            jail.set_env("LEAK_INTERVAL", "2");
            assert_eq!(load()?.leak_interval_secs, 2.0);
            Ok(())
        });
    }

    #[test]
    fn unparsable_values_are_errors() {
        Jail::expect_with(|jail| {
            jail.set_env("LEAK_RATE", "fast");
            assert!(matches!(
                ProbeConfig::load(),
                Err(ConfigError::Parsing(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn overrides_win_over_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "9090");
            jail.set_env("LEAK_RATE", "3");
            let overrides = Overrides {
                port: Some(7070),
                leak: Some(true),
                ..Overrides::default()
            };
            let config = ProbeConfig::load_with(overrides).map_err(|e| e.to_string())?;
            assert_eq!(config.port, 7070);
            assert!(config.leak_enabled);
            assert_eq!(config.leak_rate_mb, 3);
            Ok(())
        });
    }
}
