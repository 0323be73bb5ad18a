//! Configuration loading and management
//!
//! Handles parsing of `weekplan.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::Storage;

/// File name looked up in the data directory when no path is given
pub const CONFIG_FILE_NAME: &str = "weekplan.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the planner document lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the planner file
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    /// File stem of the planner document
    #[serde(default = "default_storage_key")]
    pub key: String,
}

/// Platform data directory, or `.weekplan` when none can be determined
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "weekplan")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".weekplan"))
}

fn default_storage_key() -> String {
    "weekly-planner-tasks-v2".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            key: default_storage_key(),
        }
    }
}

/// Shared-password gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: u32,

    /// Add `Secure` to the session cookie
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_password() -> String {
    "0210".to_string()
}

fn default_cookie_name() -> String {
    "site-auth".to_string()
}

fn default_cookie_max_age_days() -> u32 {
    7
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: default_password(),
            cookie_name: default_cookie_name(),
            cookie_max_age_days: default_cookie_max_age_days(),
            secure_cookie: false,
        }
    }
}

impl AuthConfig {
    pub fn cookie_max_age_secs(&self) -> u64 {
        u64::from(self.cookie_max_age_days) * 24 * 60 * 60
    }

    fn validate(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(Error::InvalidConfig(
                "auth.password cannot be empty".to_string(),
            ));
        }
        if !is_cookie_token(&self.cookie_name) {
            return Err(Error::InvalidConfig(format!(
                "auth.cookie_name '{}' is not a valid cookie name",
                self.cookie_name
            )));
        }
        if !(1..=365).contains(&self.cookie_max_age_days) {
            return Err(Error::InvalidConfig(format!(
                "auth.cookie_max_age_days must be between 1 and 365, got {}",
                self.cookie_max_age_days
            )));
        }
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// RFC 6265 token: visible ASCII minus separators.
fn is_cookie_token(name: &str) -> bool {
    const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(c))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `weekplan.toml` from `data_dir`, or return defaults.
    ///
    /// A file that fails to load is logged and ignored.
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "ignoring unreadable config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Resolve configuration for a command.
    ///
    /// An explicit `config_path` must load. Otherwise `weekplan.toml` in the
    /// data directory is used when present. `data_dir` always wins over
    /// `storage.dir`.
    pub fn resolve(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                let dir = data_dir
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_data_dir);
                Self::load_from_dir(&dir)
            }
        };
        if let Some(dir) = data_dir {
            config.storage.dir = dir.to_path_buf();
        }
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn storage(&self) -> Storage {
        Storage::new(self.storage.dir.clone(), self.storage.key.clone())
    }

    fn validate(&self) -> Result<()> {
        let key = &self.storage.key;
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(Error::InvalidConfig(format!(
                "storage.key '{key}' must be non-empty and use only letters, digits, '.', '_' or '-'"
            )));
        }
        self.auth.validate()?;
        if self.server.port == 0 {
            return Err(Error::InvalidConfig(
                "server.port must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
