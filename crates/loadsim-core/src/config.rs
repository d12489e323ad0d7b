//! Simulation run configuration.
//!
//! Supports file sources, environment variable overrides, reasonable
//! defaults, and validation.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Run-level simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Global simulation duration in seconds.
    pub global_duration_secs: u64,

    /// Directory receiving per-run metric logs.
    pub output_dir: String,

    /// Lower bound of the inter-iteration jitter sleep in milliseconds.
    pub jitter_min_ms: u64,

    /// Upper bound of the inter-iteration jitter sleep in milliseconds.
    pub jitter_max_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            global_duration_secs: 300,
            output_dir: "simulation_results".to_string(),
            jitter_min_ms: 50,
            jitter_max_ms: 500,
        }
    }
}

impl SimConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by LOADSIM_CONFIG env var
    /// 3. ./config/loadsim.yaml
    /// 4. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("LOADSIM_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(File::with_name("./config/loadsim").required(false));

        // Example: LOADSIM_JITTER_MAX_MS=200
        builder = builder.add_source(
            Environment::with_prefix("LOADSIM")
                .separator("__")
                .try_parsing(true),
        );

        let config: SimConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("global_duration_secs", 300)?
            .set_default("output_dir", "simulation_results")?
            .set_default("jitter_min_ms", 50)?
            .set_default("jitter_max_ms", 500)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_duration_secs == 0 {
            return Err(ConfigError::Message(
                "global_duration_secs must be > 0".to_string(),
            ));
        }

        if self.jitter_min_ms > self.jitter_max_ms {
            return Err(ConfigError::Message(
                "jitter_min_ms must be <= jitter_max_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: SimConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Global simulation duration.
    #[must_use]
    pub fn global_duration(&self) -> Duration {
        Duration::from_secs(self.global_duration_secs)
    }

    /// Inter-iteration jitter bounds.
    #[must_use]
    pub fn jitter_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.jitter_min_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}
