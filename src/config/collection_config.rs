use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::default_configs::builtin_tools;
use crate::config::tool_defs::ToolDefinition;
use crate::constants::{
    AI_APP_KEYWORDS, DEFAULT_DB_DIR_NAME, DEFAULT_DB_FILE_NAME, INVENTORY_TIMEOUT_SECS,
};
use crate::security::path_validator::validate_db_path;
use crate::security::policy::SecurityPolicy;

/// Settings for the installed-application inventory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InventoryConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Application names containing any of these (case-insensitive) are reported
    pub app_keywords: Vec<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(target_os = "macos"),
            command: "system_profiler".to_string(),
            args: vec!["SPApplicationsDataType".to_string()],
            timeout_secs: INVENTORY_TIMEOUT_SECS,
            app_keywords: AI_APP_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub version: String,
    /// Home directory every root is resolved against; the current user's
    /// home when unset
    #[serde(default)]
    pub home: Option<PathBuf>,
    /// Artifact database; `<home>/.ai-forensics/traces.db` when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub security: SecurityPolicy,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default = "builtin_tools")]
    pub tools: Vec<ToolDefinition>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            home: None,
            db_path: None,
            security: SecurityPolicy::default(),
            inventory: InventoryConfig::default(),
            tools: builtin_tools(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        AppConfig::default().save_to_yaml_file(path)
    }

    /// The configured home, or the current user's.
    pub fn resolve_home(&self) -> Result<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory")),
        }
    }

    /// The configured database path, or the default under the home directory.
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        let path = match &self.db_path {
            Some(path) => path.clone(),
            None => self
                .resolve_home()?
                .join(DEFAULT_DB_DIR_NAME)
                .join(DEFAULT_DB_FILE_NAME),
        };
        validate_db_path(&path)?;
        Ok(path)
    }

    /// Tool definitions that are switched on.
    pub fn enabled_tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().filter(|tool| tool.enabled)
    }
}

/// Load a configuration file, or fall back to the built-in defaults.
///
/// A missing file is not an error; a file that exists but does not parse is.
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<AppConfig> {
    match config_path {
        Some(path) if path.exists() => AppConfig::from_yaml_file(path),
        Some(path) => {
            info!(
                "Config {} not found, using built-in defaults",
                path.display()
            );
            Ok(AppConfig::default())
        }
        None => {
            debug!("No config path provided, using built-in defaults");
            Ok(AppConfig::default())
        }
    }
}
