//! Configuration management for Storylens.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Storylens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inference server settings
    pub server: ServerConfig,

    /// Story generation settings
    pub generation: GenerationConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.storylens.storylens/config.toml
    /// - Linux: ~/.config/storylens/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\storylens\config\config.toml
    ///
    /// Falls back to ~/.storylens/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "storylens", "storylens")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".storylens").join("config.toml")
            })
    }

    /// Get the resolved story output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.output.dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Replace the server endpoint, re-validating the result.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        self.server.endpoint = endpoint.to_string();
        self.validate()?;
        Ok(self)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.endpoint, "http://localhost:11434");
        assert_eq!(config.server.connect_timeout_secs, 5);
        assert_eq!(config.generation.default_model(), None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[generation]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nendpoint = \"http://10.0.0.5:11434\"\n\n[generation]\ndefault_model = \"llava:7b\""
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.endpoint, "http://10.0.0.5:11434");
        assert_eq!(config.server.connect_timeout_secs, 5);
        assert_eq!(config.generation.default_model(), Some("llava:7b"));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nendpoint = \"localhost\"").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("server.endpoint"));
    }

    #[test]
    fn test_with_endpoint_override() {
        let config = Config::default()
            .with_endpoint("http://gpu-box:11434")
            .unwrap();
        assert_eq!(config.server.endpoint, "http://gpu-box:11434");
        assert!(Config::default().with_endpoint("ftp://nope").is_err());
    }
}
