//! Application configuration using Figment
//!
//! Configuration is loaded from:
//! 1. A TOML file (every section optional)
//! 2. Environment variables prefixed with `HP5316_`, nested keys split on `__`
//!
//! ```toml
//! [counter]
//! resource = "GPIB1::20::INSTR"
//! settle_time = "200ms"
//!
//! [settings]
//! meas_mode = "period_a"
//! trigger_level_mode = "set_level"
//! trigger_level_a = 0.01
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! Example override: `HP5316_COUNTER__RESOURCE=GPIB0::3::INSTR`

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::driver::DEFAULT_SETTLE_TIME;
use crate::error::{CounterError, CounterResult};
use crate::logging::{parse_log_level, LogFormat};
use crate::settings::CounterSettings;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "HP5316_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connection settings
    pub counter: CounterConfig,
    /// Instrument settings pushed after connecting
    pub settings: CounterSettings,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// VISA resource address; required unless running against the mock bus
    pub resource: Option<String>,
    /// Pause after each configuration write
    #[serde(with = "humantime_serde")]
    pub settle_time: Duration,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            resource: None,
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by environment variables only.
    pub fn load() -> CounterResult<Self> {
        Self::figment(None).extract().map_err(CounterError::from)
    }

    /// Load from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error; the defaults are used instead.
    pub fn load_from<P: AsRef<Path>>(path: P) -> CounterResult<Self> {
        Self::figment(Some(path.as_ref()))
            .extract()
            .map_err(CounterError::from)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> CounterResult<()> {
        self.settings.validate()?;
        parse_log_level(&self.logging.level).map_err(CounterError::Config)?;
        if let Some(resource) = &self.counter.resource {
            if resource.trim().is_empty() {
                return Err(CounterError::Config(
                    "counter.resource must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
