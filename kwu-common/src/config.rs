//! Configuration loading and resolution
//!
//! Resolution priority for the configuration file:
//! 1. Command-line path (highest priority)
//! 2. `KWU_CONFIG` environment variable
//! 3. `<user config dir>/kwu/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! An explicitly named file (1, 2) must exist and parse. A missing default file
//! is not an error. `KWU_BRAND_NAME` and `KWU_LOG_LEVEL` override whatever
//! file was loaded.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "KWU_CONFIG";
/// Environment override for [`EngineConfig::brand_name`]
pub const BRAND_NAME_ENV_VAR: &str = "KWU_BRAND_NAME";
/// Environment override for [`LoggingConfig::level`]
pub const LOG_LEVEL_ENV_VAR: &str = "KWU_LOG_LEVEL";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display name of the brand whose rankings are analysed
    pub brand_name: String,
    pub logging: LoggingConfig,
    pub subsets: SubsetConfig,
    pub weights: WeightOverrides,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            brand_name: "brand".to_string(),
            logging: LoggingConfig::default(),
            subsets: SubsetConfig::default(),
            weights: WeightOverrides::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive (e.g. "info", "kwu_engine=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Longest accepted `newly_discovered` look-back window, in days
pub const MAX_NEWLY_DISCOVERED_DAYS: i64 = 36_500;

/// Thresholds for the derived subsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    /// Rows kept in `top_opportunities`
    pub top_opportunities_limit: usize,
    /// Lowest brand position counted as low-hanging fruit
    pub low_hanging_min_position: f64,
    /// Highest brand position counted as low-hanging fruit
    pub low_hanging_max_position: f64,
    /// Maximum difficulty for `high_value_low_competition`
    pub low_competition_max_difficulty: f64,
    /// Minimum search volume for `high_value_low_competition`
    pub low_competition_min_volume: f64,
    /// Business value quantile a record must exceed to be `high_value`
    pub high_value_quantile: f64,
    /// Look-back window for `newly_discovered`
    pub newly_discovered_days: i64,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            top_opportunities_limit: 200,
            low_hanging_min_position: 4.0,
            low_hanging_max_position: 15.0,
            low_competition_max_difficulty: 10.0,
            low_competition_min_volume: 500.0,
            high_value_quantile: 0.75,
            newly_discovered_days: 90,
        }
    }
}

/// Industry-specific exact-label weights, consulted before the seed tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightOverrides {
    /// Journey phase label → weight
    pub journey: BTreeMap<String, f64>,
    /// Search intent label → weight
    pub intent: BTreeMap<String, f64>,
}

impl EngineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Apply `KWU_BRAND_NAME` / `KWU_LOG_LEVEL` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(brand) = non_empty_env(BRAND_NAME_ENV_VAR) {
            debug!(brand = %brand, "Brand name overridden from environment");
            self.brand_name = brand;
        }
        if let Some(level) = non_empty_env(LOG_LEVEL_ENV_VAR) {
            self.logging.level = level;
        }
    }

    /// Reject configurations the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.brand_name.trim().is_empty() {
            return Err(Error::Config("brand_name must not be empty".to_string()));
        }

        let s = &self.subsets;
        if s.top_opportunities_limit == 0 {
            return Err(Error::Config(
                "subsets.top_opportunities_limit must be greater than 0".to_string(),
            ));
        }
        if s.low_hanging_min_position > s.low_hanging_max_position {
            return Err(Error::Config(format!(
                "subsets.low_hanging_min_position ({}) exceeds low_hanging_max_position ({})",
                s.low_hanging_min_position, s.low_hanging_max_position
            )));
        }
        if !(0.0..=1.0).contains(&s.high_value_quantile) {
            return Err(Error::Config(format!(
                "subsets.high_value_quantile must be within [0, 1], got {}",
                s.high_value_quantile
            )));
        }
        if !(0..=MAX_NEWLY_DISCOVERED_DAYS).contains(&s.newly_discovered_days) {
            return Err(Error::Config(format!(
                "subsets.newly_discovered_days must be within [0, {}], got {}",
                MAX_NEWLY_DISCOVERED_DAYS, s.newly_discovered_days
            )));
        }

        for (axis, table) in [("journey", &self.weights.journey), ("intent", &self.weights.intent)] {
            if let Some((label, weight)) = table.iter().find(|(_, w)| !w.is_finite()) {
                return Err(Error::Config(format!(
                    "weights.{}.{} is not a finite number ({})",
                    axis, label, weight
                )));
            }
        }

        Ok(())
    }
}

/// Resolves the effective configuration from CLI, environment, file, defaults
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    pub fn resolve(&self) -> Result<EngineConfig> {
        let mut config = if let Some(path) = &self.cli_path {
            EngineConfig::load_from_file(path)?
        } else if let Some(path) = non_empty_env(CONFIG_ENV_VAR) {
            EngineConfig::load_from_file(Path::new(&path))?
        } else if let Some(path) = default_config_path().filter(|p| p.exists()) {
            EngineConfig::load_from_file(&path)?
        } else {
            info!("No configuration file found, using compiled defaults");
            EngineConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Default configuration file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kwu").join("config.toml"))
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &EngineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    info!(path = %path.display(), "Configuration written");
    Ok(())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
