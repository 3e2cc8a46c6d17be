//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Inference server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// TCP connect timeout in seconds (does not bound pulls or generation)
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Story generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model used when none is given on the command line.
    /// Empty means the catalog default.
    pub default_model: String,
}

impl GenerationConfig {
    /// The configured default model, if one is set.
    pub fn default_model(&self) -> Option<&str> {
        let name = self.default_model.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that `story --save` writes into
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "~/stories".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
