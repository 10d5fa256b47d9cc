//! Preloader configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decay::ExponentialDecay;
use crate::{ConfigError, Result};

/// Default share of the bar attributed to the pre-interactive phase.
pub const DEFAULT_CEILING: f64 = 0.4;

/// Default emission interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Preloader configuration.
///
/// Durations are expressed in milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloaderConfig {
    /// Fraction of progress attributed to the pre-interactive phase
    pub ceiling: f64,

    /// Minimum time between two state emissions, and the synthetic tick
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,

    /// Parameters of the default synthetic decay
    pub decay: DecayConfig,
}

impl Default for PreloaderConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            decay: DecayConfig::default(),
        }
    }
}

impl PreloaderConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Set the ceiling.
    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Set the emission interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check every field is within range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ceiling) {
            return Err(ConfigError::Invalid {
                field: "ceiling",
                reason: format!("{} is not within [0, 1]", self.ceiling),
            });
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.decay.validate()
    }
}

/// Parameters of the default exponential decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Time constant of the exponential
    #[serde(rename = "time_constant_ms", with = "millis")]
    pub time_constant: Duration,

    /// Synthetic progress never exceeds this
    pub cap: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        let decay = ExponentialDecay::default();
        Self {
            time_constant: decay.time_constant,
            cap: decay.cap,
        }
    }
}

impl DecayConfig {
    /// Check every field is within range.
    pub fn validate(&self) -> Result<()> {
        if self.time_constant.is_zero() {
            return Err(ConfigError::Invalid {
                field: "decay.time_constant_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.cap) {
            return Err(ConfigError::Invalid {
                field: "decay.cap",
                reason: format!("{} is not within [0, 1]", self.cap),
            });
        }
        Ok(())
    }

    /// Build the decay function these parameters describe.
    pub fn build(&self) -> ExponentialDecay {
        ExponentialDecay::new(self.time_constant, self.cap)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
