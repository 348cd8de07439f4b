//! Configuration for the KENN interest-management system.
//!
//! Maps directly to `kenn.toml`. Every field has a serde default so a
//! partial file (or an empty one) is valid.

use serde::{Deserialize, Serialize};

/// Top-level KENN configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KennConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Visibility clamp and destruction timing.
    #[serde(default)]
    pub interest: InterestConfig,
    /// Telemetry & observability.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl KennConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `KennError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::KennError::Config(e.to_string()))?;
        config.interest.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Tuning of the interest-set mutation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestConfig {
    /// Reject first contact beyond `clamp_distance`.
    #[serde(default = "default_true")]
    pub initial_clamp: bool,
    /// Maximum planar distance for a first contact.
    #[serde(default = "default_clamp_distance")]
    pub clamp_distance: f32,
    /// Seconds an agent stays known after leaving visibility.
    #[serde(default = "default_destruction_time")]
    pub destruction_time_secs: f64,
}

impl InterestConfig {
    /// Squared clamp distance, compared against planar squared distances.
    #[must_use]
    pub fn clamp_distance_sq(&self) -> f32 {
        self.clamp_distance * self.clamp_distance
    }

    /// Reject non-finite or negative tuning values.
    ///
    /// # Errors
    /// Returns `KennError::Config` naming the offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.clamp_distance.is_finite() || self.clamp_distance < 0.0 {
            return Err(crate::KennError::Config(format!(
                "interest.clamp_distance must be a non-negative number, got {}",
                self.clamp_distance
            )));
        }
        if !self.destruction_time_secs.is_finite() || self.destruction_time_secs < 0.0 {
            return Err(crate::KennError::Config(format!(
                "interest.destruction_time_secs must be a non-negative number, got {}",
                self.destruction_time_secs
            )));
        }
        Ok(())
    }
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            initial_clamp: true,
            clamp_distance: 112.5,
            destruction_time_secs: 25.0,
        }
    }
}

/// Telemetry and observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Warn about any tick exceeding this threshold (ms).
    #[serde(default = "default_5_0")]
    pub log_slow_ticks_ms: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_slow_ticks_ms: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_clamp_distance() -> f32 { 112.5 }
fn default_destruction_time() -> f64 { 25.0 }
fn default_5_0() -> f64 { 5.0 }
