//! Service configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `AQUAGUARD_*` environment variables.
//!
//! ```toml
//! validity_minutes = 30
//! latency_min_ms = 500
//! latency_max_ms = 1500
//! failure_probability = 0.05
//! audit_capacity = 1000
//! ```

use chrono::Duration;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{CommandError, Result};

pub const ENV_PREFIX: &str = "AQUAGUARD";

/// One year; longer windows defeat the purpose of expiry
const MAX_VALIDITY_MINUTES: u64 = 525_600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How long a created command may wait for execution
    pub validity_minutes: u64,
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    /// Chance in [0, 1] that the simulated gateway reports a failure
    pub failure_probability: f64,
    pub effect_min_secs: u32,
    pub effect_max_secs: u32,
    /// Maximum retained audit entries; the oldest is evicted beyond this
    pub audit_capacity: usize,
    pub default_page_size: usize,
    pub reaper_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            validity_minutes: 30,
            latency_min_ms: 500,
            latency_max_ms: 1500,
            failure_probability: 0.05,
            effect_min_secs: 15,
            effect_max_secs: 45,
            audit_capacity: 1000,
            default_page_size: 50,
            reaper_interval_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Load from an optional TOML file plus the process environment
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a source cannot be read or parsed, or if
    /// the merged values fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::build(builder)
    }

    /// Load from TOML text and an explicit variable map instead of the
    /// process environment
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::load`].
    pub fn from_sources(toml: Option<&str>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(toml) = toml {
            builder = builder.add_source(File::from_str(toml, FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(env)),
        );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let parsed: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CommandError::InvalidConfig {
                reason: e.to_string(),
            })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(CommandError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.validity_minutes == 0 || self.validity_minutes > MAX_VALIDITY_MINUTES {
            return invalid("validity_minutes must be between 1 and 525600");
        }
        if self.latency_min_ms > self.latency_max_ms {
            return invalid("latency_min_ms must not exceed latency_max_ms");
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return invalid("failure_probability must be within [0, 1]");
        }
        if self.effect_min_secs > self.effect_max_secs {
            return invalid("effect_min_secs must not exceed effect_max_secs");
        }
        if self.audit_capacity == 0 {
            return invalid("audit_capacity must be at least 1");
        }
        if self.default_page_size == 0 {
            return invalid("default_page_size must be at least 1");
        }
        if self.reaper_interval_secs == 0 {
            return invalid("reaper_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn validity_window(&self) -> Duration {
        Duration::minutes(self.validity_minutes.min(MAX_VALIDITY_MINUTES) as i64)
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reaper_interval_secs)
    }

    /// Zero latency and no failures; for tests and dry runs
    pub fn deterministic() -> Self {
        Self {
            latency_min_ms: 0,
            latency_max_ms: 0,
            failure_probability: 0.0,
            ..Self::default()
        }
    }
}
