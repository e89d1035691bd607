//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/hubsync/config.toml)
//! 3. Environment variables (HUBSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::DatabaseInfo;

/// Environment variable prefix
const ENV_PREFIX: &str = "HUBSYNC";

/// Default hub request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite document store)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Hub WebSocket URL (optional)
    #[serde(default)]
    pub hub_url: Option<String>,

    /// Hub database the local store mirrors
    #[serde(default = "default_database")]
    pub database: String,

    /// Display name for the hub database
    #[serde(default)]
    pub database_name: Option<String>,

    /// Seconds to wait for a hub response
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            hub_url: None,
            database: default_database(),
            database_name: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (HUBSYNC_DATA_DIR, HUBSYNC_HUB_URL,
    ///    HUBSYNC_DATABASE, HUBSYNC_REQUEST_TIMEOUT_SECS)
    /// 2. Config file (~/.config/hubsync/config.toml or HUBSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // Empty string clears the hub URL
        if let Ok(val) = std::env::var(format!("{}_HUB_URL", ENV_PREFIX)) {
            self.hub_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_DATABASE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.database = val;
            }
        }

        // Unparseable values are ignored
        if let Ok(val) = std::env::var(format!("{}_REQUEST_TIMEOUT_SECS", ENV_PREFIX)) {
            if let Ok(secs) = val.parse() {
                self.request_timeout_secs = secs;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with HUBSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hubsync")
            .join("config.toml")
    }

    /// Get the path to the SQLite document store
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("documents.db")
    }

    /// Hub request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Descriptor of the configured hub database
    pub fn database_info(&self) -> Result<DatabaseInfo> {
        let name = self.database_name.clone().unwrap_or_else(|| self.database.clone());
        DatabaseInfo::new(self.database.clone(), name).context("Invalid database in config")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hubsync")
}

fn default_database() -> String {
    "default".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Serializes tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "HUBSYNC_DATA_DIR",
        "HUBSYNC_HUB_URL",
        "HUBSYNC_DATABASE",
        "HUBSYNC_REQUEST_TIMEOUT_SECS",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.hub_url.is_none());
        assert_eq!(config.database, "default");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.data_dir.ends_with("hubsync"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.sqlite_path().ends_with("documents.db"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("HUBSYNC_DATA_DIR", "/tmp/hubsync-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/hubsync-test"));
    }

    #[test]
    fn test_env_override_hub_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.hub_url.is_none());

        env::set_var("HUBSYNC_HUB_URL", "ws://localhost:5000/hub");
        config.apply_env_overrides();
        assert_eq!(config.hub_url, Some("ws://localhost:5000/hub".to_string()));

        env::set_var("HUBSYNC_HUB_URL", "");
        config.apply_env_overrides();
        assert!(config.hub_url.is_none());
    }

    #[test]
    fn test_env_override_timeout() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("HUBSYNC_REQUEST_TIMEOUT_SECS", "3");
        config.apply_env_overrides();
        assert_eq!(config.request_timeout_secs, 3);

        env::set_var("HUBSYNC_REQUEST_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.request_timeout_secs, 3);
    }

    #[test]
    fn test_database_info() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        config.database = "inventory".to_string();

        let info = config.database_info().unwrap();
        assert_eq!(info.id, "inventory");
        assert_eq!(info.name, "inventory");

        config.database_name = Some("Inventory (prod)".to_string());
        assert_eq!(config.database_info().unwrap().name, "Inventory (prod)");

        config.database = String::new();
        assert!(config.database_info().is_err());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            hub_url = "ws://example.com/hub"
            database = "orders"
            request_timeout_secs = 30
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.hub_url, Some("ws://example.com/hub".to_string()));
        assert_eq!(config.database, "orders");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_serialization() {
        let config = Config {
            data_dir: PathBuf::from("/data/hubsync"),
            hub_url: Some("ws://hub.example.com".to_string()),
            database: "orders".to_string(),
            database_name: None,
            request_timeout_secs: 5,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("hub_url"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.hub_url, config.hub_url);
        assert_eq!(parsed.database, config.database);
        assert_eq!(parsed.request_timeout_secs, 5);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("HUBSYNC_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.hub_url.is_none());
        assert!(config.data_dir.exists());
    }
}
