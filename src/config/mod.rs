//! Configuration loading and defaults.
//!
//! Every tunable constant of the engine lives here: signal weights, tier
//! thresholds, learning deltas, lookback windows. Loaded from an optional
//! `.context-scout.toml` / `.context-scout.yaml` at the project root; an
//! explicitly provided path wins over discovery, and a broken
//! auto-discovered file falls back to defaults with a warning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Weights for combining the four signals into a base score.
///
/// Keyword and relation carry the most weight; recency and co-change are
/// corroborating signals, not drivers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScoringWeights {
    pub keyword: f64,
    pub recency: f64,
    pub relation: f64,
    pub co_change: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { keyword: 0.35, recency: 0.20, relation: 0.30, co_change: 0.15 }
    }
}

/// Score thresholds separating the four tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TierThresholds {
    pub essential: f64,
    pub recommended: f64,
    pub optional: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self { essential: 0.7, recommended: 0.5, optional: 0.3 }
    }
}

/// Constants governing how override feedback turns into score adjustments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LearningConfig {
    /// Consistent observations required before any adjustment applies.
    pub strikes: u32,
    /// Delta applied per consistent "added" override.
    pub added_delta: f64,
    /// Delta applied per consistent "removed" override (negative).
    pub removed_delta: f64,
    /// Confidence gained per recorded override, capped at 1.0.
    pub confidence_increment: f64,
    /// Adjustments at or below this confidence are stored but not surfaced.
    pub confidence_gate: f64,
    pub adjustment_min: f64,
    pub adjustment_max: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            strikes: 3,
            added_delta: 0.3,
            removed_delta: -0.05,
            confidence_increment: 0.2,
            confidence_gate: 0.5,
            adjustment_min: -0.5,
            adjustment_max: 1.0,
        }
    }
}

/// Scanner filters, a subset of what the walker honors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    pub exclude_globs: Vec<String>,
    pub max_file_bytes: u64,
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_globs: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/dist/**".to_string(),
                "**/*.min.js".to_string(),
                "**/*.lock".to_string(),
            ],
            max_file_bytes: 1_048_576,
            respect_gitignore: true,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScoutConfig {
    pub weights: ScoringWeights,
    pub thresholds: TierThresholds,
    pub learning: LearningConfig,
    pub scan: ScanConfig,
    /// Recency signal saturates to zero at this horizon.
    pub recency_horizon_days: Horizon,
    /// Commits examined for the co-change signal.
    pub co_change_lookback: Lookback,
    /// Wall-clock bound on history walking, in milliseconds.
    pub history_deadline_ms: DeadlineMs,
}

// Newtype defaults so #[serde(default)] on the struct picks them up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Horizon(pub f64);
impl Default for Horizon {
    fn default() -> Self {
        Horizon(30.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lookback(pub usize);
impl Default for Lookback {
    fn default() -> Self {
        Lookback(50)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeadlineMs(pub u64);
impl Default for DeadlineMs {
    fn default() -> Self {
        DeadlineMs(2_000)
    }
}

const CONFIG_BASENAMES: &[&str] =
    &[".context-scout.toml", ".context-scout.yaml", ".context-scout.yml"];

/// Load configuration for a project root.
///
/// An explicit `config_path` must parse or the load fails; a discovered
/// file that fails to parse only warns and yields defaults.
pub fn load_config(project_root: &Path, config_path: Option<&Path>) -> Result<ScoutConfig> {
    let explicit = config_path.is_some();
    let discovered = match config_path {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config(project_root),
    };

    let Some(file) = discovered else {
        return Ok(ScoutConfig::default());
    };

    let content = fs::read_to_string(&file)
        .with_context(|| format!("Failed reading config file: {}", file.display()))?;
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let parsed: Result<ScoutConfig> = match ext.as_str() {
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML config: {}", file.display())),
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML config: {}", file.display())),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            file.display()
        )),
    };

    match parsed {
        Ok(cfg) => Ok(cfg),
        Err(e) if explicit => Err(e),
        Err(e) => {
            tracing::warn!("Ignoring unparseable config {}: {e:#}", file.display());
            Ok(ScoutConfig::default())
        }
    }
}

fn discover_config(project_root: &Path) -> Option<PathBuf> {
    CONFIG_BASENAMES.iter().map(|name| project_root.join(name)).find(|p| p.is_file())
}
