//! Configuration for Reforge.
//!
//! ```toml
//! [storage]
//! data_dir = "~/.reforge/data"
//! autosave_threshold = 10
//!
//! [reforge]
//! material = "Ingredient_Bar_Iron"
//! destruction_chance = 0.20
//! ```
//!
//! Every section and field is optional. Semantic validation (probability rows,
//! tier tables, the classifier pattern) happens where those values are turned
//! into domain objects, not here.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "REFORGE_CONFIG";

const CONFIG_DIR: &str = ".reforge";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReforgeConfig {
    pub storage: StorageConfig,
    pub sweep: SweepConfig,
    pub reforge: RulesConfig,
    pub tiers: TiersConfig,
    pub sfx: SfxConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Snapshot location and autosave policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the snapshot and its backups. `~/` is expanded.
    pub data_dir: Option<String>,
    pub snapshot_file: String,
    /// Mutations since the last flush that force an autosave.
    pub autosave_threshold: u32,
    pub autosave_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            snapshot_file: "weapon_upgrades.json".to_string(),
            autosave_threshold: 10,
            autosave_interval_secs: 300,
        }
    }
}

impl StorageConfig {
    /// Configured data directory, or `~/.reforge/data` (falling back to
    /// `./.reforge/data` when there is no home directory).
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        match self.data_dir.as_deref() {
            Some(raw) => expand_home(raw),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CONFIG_DIR)
                .join("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Reforge action rules: material cost, risk, and what counts as upgradeable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub material: String,
    pub material_cost: u32,
    /// Chance that an item at the last pre-cap tier shatters.
    pub destruction_chance: f64,
    /// Regex matched against the whole item kind.
    pub upgradeable_pattern: String,
    /// Per-tier `[degrade, same, upgrade, jackpot]` probabilities.
    pub weights: Vec<[f64; 4]>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            material: "Ingredient_Bar_Iron".to_string(),
            material_cost: 1,
            destruction_chance: 0.20,
            upgradeable_pattern: ".*[Ww]eapon.*".to_string(),
            weights: vec![
                [0.00, 0.65, 0.34, 0.01],
                [0.35, 0.45, 0.19, 0.01],
                [0.60, 0.30, 0.095, 0.005],
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TiersConfig {
    pub names: Vec<String>,
    pub damage_multipliers: Vec<f64>,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            names: ["", "Sharp", "Deadly", "Legendary"]
                .into_iter()
                .map(String::from)
                .collect(),
            damage_multipliers: vec![1.0, 1.10, 1.15, 1.25],
        }
    }
}

/// Sound event ids played for each feedback cue. Empty disables a cue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SfxConfig {
    pub start: String,
    pub success: String,
    pub jackpot: String,
    pub fail: String,
    pub no_change: String,
    pub shatter: String,
}

impl Default for SfxConfig {
    fn default() -> Self {
        let metal = || "SFX_Drop_Item_Metal".to_string();
        Self {
            start: metal(),
            success: metal(),
            jackpot: metal(),
            fail: metal(),
            no_change: metal(),
            shatter: metal(),
        }
    }
}

impl ReforgeConfig {
    /// Load from the default location. `Ok(None)` means no file exists and
    /// defaults apply.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Load, or fall back to defaults when no file exists.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }
}

/// `$REFORGE_CONFIG` if set, else `~/.reforge/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}
