//! Engine configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document (or no
//! config file at all) yields [`EngineConfig::default`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Upper bound on any transfer lifetime, whatever the configuration says
pub const HARD_MAX_EXPIRE_HOURS: i64 = 7 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime used when a request asks for none or an out-of-range one
    pub default_expire_hours: i64,

    /// Longest lifetime a request may ask for
    pub max_expire_hours: i64,

    pub sweep_interval_secs: u64,

    /// Transfers expired per sweeper page
    pub sweep_page_size: usize,

    /// Whether the initiator of a team transfer may also confirm it
    pub allow_self_approval: bool,

    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_expire_hours: 24,
            max_expire_hours: HARD_MAX_EXPIRE_HOURS,
            sweep_interval_secs: 60,
            sweep_page_size: 100,
            allow_self_approval: false,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document and correct out-of-range values
    ///
    /// # Errors
    ///
    /// Returns an error message if the document is not valid YAML for this
    /// structure.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, String> {
        Self::parse_yaml(yaml).map(Self::validated)
    }

    /// Read, parse and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self, String> {
        Self::read(path).map(Self::validated)
    }

    /// Read and parse a YAML config file without validating it
    ///
    /// Lets the caller install logging from `log_level` before
    /// [`EngineConfig::validated`] reports corrections.
    pub fn read(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        Self::parse_yaml(&content)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, String> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Replace invalid values with defaults, warning about each one
    pub fn validated(self) -> Self {
        let default = Self::default();

        let max_expire_hours = if self.max_expire_hours <= 0 {
            warn!(
                value = self.max_expire_hours,
                fallback = default.max_expire_hours,
                "invalid max_expire_hours, using default"
            );
            default.max_expire_hours
        } else if self.max_expire_hours > HARD_MAX_EXPIRE_HOURS {
            warn!(
                value = self.max_expire_hours,
                cap = HARD_MAX_EXPIRE_HOURS,
                "max_expire_hours above hard cap, clamping"
            );
            HARD_MAX_EXPIRE_HOURS
        } else {
            self.max_expire_hours
        };

        let default_expire_hours =
            if self.default_expire_hours <= 0 || self.default_expire_hours > max_expire_hours {
                let fallback = default.default_expire_hours.min(max_expire_hours);
                warn!(
                    value = self.default_expire_hours,
                    fallback, "invalid default_expire_hours, using default"
                );
                fallback
            } else {
                self.default_expire_hours
            };

        let sweep_interval_secs = if self.sweep_interval_secs == 0 {
            warn!(
                fallback = default.sweep_interval_secs,
                "invalid sweep_interval_secs (0), using default"
            );
            default.sweep_interval_secs
        } else {
            self.sweep_interval_secs
        };

        let sweep_page_size = if self.sweep_page_size == 0 {
            warn!(
                fallback = default.sweep_page_size,
                "invalid sweep_page_size (0), using default"
            );
            default.sweep_page_size
        } else {
            self.sweep_page_size
        };

        Self {
            default_expire_hours,
            max_expire_hours,
            sweep_interval_secs,
            sweep_page_size,
            allow_self_approval: self.allow_self_approval,
            log_level: self.log_level,
        }
    }

    /// Lifetime in hours for a transfer that requested `requested`
    ///
    /// Values outside `(0, max_expire_hours]`, or none at all, fall back to
    /// `default_expire_hours`.
    pub fn expire_hours(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(hours) if hours > 0 && hours <= self.max_expire_hours => hours,
            _ => self.default_expire_hours,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
