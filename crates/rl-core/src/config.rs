//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/rl/config.toml)
//! 3. Environment variables (RL_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::timestamp::DisplayZone;

/// Environment variable prefix
const ENV_PREFIX: &str = "RL";

/// Default time to wait for another process holding the database lock
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding the database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Explicit database file, overriding `data_dir/links.db`
    ///
    /// `:memory:` opens a throwaway in-memory database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Milliseconds a write waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Zone used to display timestamps
    #[serde(default)]
    pub timezone: DisplayZone,

    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            timezone: DisplayZone::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (RL_DATA_DIR, RL_DB_PATH, RL_BUSY_TIMEOUT_MS, RL_TIMEZONE)
    /// 2. Config file (~/.config/rl/config.toml or RL_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` when given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // RL_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // RL_DB_PATH
        if let Ok(val) = std::env::var(format!("{}_DB_PATH", ENV_PREFIX)) {
            self.db_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // RL_BUSY_TIMEOUT_MS
        if let Ok(val) = std::env::var(format!("{}_BUSY_TIMEOUT_MS", ENV_PREFIX)) {
            self.busy_timeout_ms = val
                .parse()
                .with_context(|| format!("Invalid {}_BUSY_TIMEOUT_MS: '{}'", ENV_PREFIX, val))?;
        }

        // RL_TIMEZONE
        if let Ok(val) = std::env::var(format!("{}_TIMEZONE", ENV_PREFIX)) {
            self.timezone = val
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {}_TIMEZONE", ENV_PREFIX))?;
        }

        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with RL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rl")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("links.db"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rl")
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
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
        "RL_DATA_DIR",
        "RL_DB_PATH",
        "RL_BUSY_TIMEOUT_MS",
        "RL_TIMEZONE",
        "RL_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data_dir.ends_with("rl"));
        assert!(config.db_path.is_none());
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.timezone, DisplayZone::Utc);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_database_path() {
        let mut config = Config {
            data_dir: PathBuf::from("/data/rl"),
            ..Config::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/data/rl/links.db"));

        config.db_path = Some(PathBuf::from("/elsewhere/mine.db"));
        assert_eq!(config.database_path(), PathBuf::from("/elsewhere/mine.db"));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("RL_DATA_DIR", "/tmp/rl-test");
        env::set_var("RL_DB_PATH", ":memory:");
        env::set_var("RL_BUSY_TIMEOUT_MS", "250");
        env::set_var("RL_TIMEZONE", "-05:00");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/rl-test"));
        assert_eq!(config.database_path(), PathBuf::from(":memory:"));
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.timezone, "-05:00".parse().unwrap());

        // Empty string clears the db path
        env::set_var("RL_DB_PATH", "");
        config.apply_env_overrides().unwrap();
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("RL_BUSY_TIMEOUT_MS", "soon");
        assert!(Config::load_from_str("").is_err());
        env::remove_var("RL_BUSY_TIMEOUT_MS");

        env::set_var("RL_TIMEZONE", "America/Nowhere");
        assert!(Config::load_from_str("").is_err());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            busy_timeout_ms = 1000
            timezone = "local"
            log_file = "/tmp/rl.log"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.busy_timeout_ms, 1000);
        assert_eq!(config.timezone, DisplayZone::Local);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/rl.log")));
    }

    #[test]
    fn test_load_from_str_rejects_bad_timezone() {
        let _guard = EnvGuard::new(ENV_VARS);
        assert!(Config::load_from_str(r#"timezone = "Mars/Olympus""#).is_err());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: PathBuf::from("/data/rl"),
            db_path: Some(PathBuf::from("/data/rl/other.db")),
            busy_timeout_ms: 42,
            timezone: "+09:00".parse().unwrap(),
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("timezone = \"+09:00\""));
        assert!(!content.contains("log_file"));

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_to_default_location() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rl").join("config.toml");
        env::set_var("RL_CONFIG", &path);

        let config = Config {
            timezone: "America/New_York".parse().unwrap(),
            ..Config::default()
        };
        config.save().unwrap();

        assert!(path.exists());
        assert_eq!(Config::load().unwrap(), config);
    }

    #[test]
    fn test_load_with_cli_override() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "busy_timeout_ms = 7").unwrap();

        let config = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(config.busy_timeout_ms, 7);
    }

    #[test]
    fn test_config_file_path_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("RL_CONFIG", "/tmp/custom-rl.toml");
        assert_eq!(
            Config::config_file_path(),
            PathBuf::from("/tmp/custom-rl.toml")
        );
    }
}
