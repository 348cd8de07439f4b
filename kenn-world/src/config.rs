//! Host configuration for a KENN-driven world (`world.toml`).
//!
//! Wraps the base `kenn_core::config::KennConfig` and adds the broad-phase
//! and scheduling knobs only a host cares about.

use std::path::Path;

use anyhow::Context;
use kenn_core::config::KennConfig;
use serde::{Deserialize, Serialize};

/// Full host configuration. Core sections sit at the top level, next to
/// `[grid]` and `[tick]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Core interest tuning, logging and telemetry.
    #[serde(flatten)]
    pub core: KennConfig,
    /// Uniform-grid spatial index.
    #[serde(default)]
    pub grid: GridConfig,
    /// Tick scheduling.
    #[serde(default)]
    pub tick: TickConfig,
}

impl WorldConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str).context("invalid world configuration")?;
        config.core.interest.validate()?;
        anyhow::ensure!(
            config.grid.cell_size.is_finite() && config.grid.cell_size > 0.0,
            "grid.cell_size must be positive, got {}",
            config.grid.cell_size
        );
        Ok(config)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// Uniform grid over the ground plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Side length of one cell. Candidates come from the 3x3 block around
    /// the observer's cell, so this should be at least the view radius.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
        }
    }
}

/// Per-tick scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Rayon worker threads for the parallel update; 0 uses the global pool.
    #[serde(default)]
    pub worker_threads: usize,
    /// Run target acquisition for monsters and pets every tick.
    #[serde(default = "default_true")]
    pub update_targets: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            update_targets: true,
        }
    }
}

fn default_cell_size() -> f32 { 192.0 }
fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_toml() {
        let config = WorldConfig::from_toml("").expect("parses");
        assert!((config.grid.cell_size - 192.0).abs() < f32::EPSILON);
        assert_eq!(config.tick.worker_threads, 0);
        assert!(config.tick.update_targets);
        assert!(config.core.interest.initial_clamp);
    }

    #[test]
    fn core_sections_are_flattened() {
        let config = WorldConfig::from_toml(
            "[interest]\ndestruction_time_secs = 10.0\n\n[grid]\ncell_size = 64.0\n\n[tick]\nworker_threads = 4\n",
        )
        .expect("parses");
        assert!((config.core.interest.destruction_time_secs - 10.0).abs() < f64::EPSILON);
        assert!((config.grid.cell_size - 64.0).abs() < f32::EPSILON);
        assert_eq!(config.tick.worker_threads, 4);
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        assert!(WorldConfig::from_toml("[grid]\ncell_size = 0.0\n").is_err());
    }
}
