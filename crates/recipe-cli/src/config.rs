//! Host configuration
//!
//! Where the radiation tool lives and where runs go by default. Read from
//! `--config` (or `$RADIATION_RECIPE_CONFIG`), then from the user config
//! directory; any field left out keeps its default.

use std::path::{Path, PathBuf};

use radiation_recipes::IncidentRadiationConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::paths;

/// Configuration of the command line host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// How to launch the radiation tool
    #[serde(flatten)]
    pub tool: IncidentRadiationConfig,
    /// Run folder used when `run` is given no `--folder`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_folder: Option<PathBuf>,
}

impl CliConfig {
    /// Resolve the configuration for this invocation
    ///
    /// An explicit path must exist. The user config file is optional.
    pub async fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !fs::try_exists(path).await.unwrap_or(false) {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load(path).await;
        }

        match user_config_path() {
            Some(path) if fs::try_exists(&path).await.unwrap_or(false) => Self::load(&path).await,
            _ => {
                log::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a JSON file
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(ConfigError::Io)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, contents).await.map_err(ConfigError::Io)?;
        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}

/// `<user config dir>/radiation-recipe/config.json`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(paths::CONFIG_DIR).join(paths::CONFIG_FILE))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
