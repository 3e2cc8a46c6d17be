//! Error types for Storylens.
//!
//! Raw failures from the inference server are [`InferenceError`]s. Before they
//! reach a caller of the story client they are classified into a
//! [`StoryError`], whose message carries the remediation steps a user needs.

use crate::client::Stage;
use thiserror::Error;

/// The inference server operation a raw error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing installed models
    List,
    /// Pulling (downloading) a model
    Pull,
    /// The chat/completion call
    Chat,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Pull => "pull",
            Operation::Chat => "chat",
        };
        f.write_str(name)
    }
}

/// A raw, unclassified failure reported by the inference server or the
/// transport underneath it.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct InferenceError {
    /// Operation that failed
    pub operation: Operation,
    /// Error text, including the transport's nested causes
    pub message: String,
    /// HTTP status, when the server answered at all
    pub status_code: Option<u16>,
    /// Set when the nested transport error is a refused TCP connection
    pub connection_refused: bool,
}

impl InferenceError {
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            status_code: None,
            connection_refused: false,
        }
    }

    /// Build an error from a non-success HTTP response body.
    pub fn http(operation: Operation, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::new(operation, message)
        }
    }

    /// Build an error from a transport failure, flattening the source chain
    /// into the message so keyword matching sees the underlying cause.
    pub fn transport(operation: Operation, err: &reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut refused = false;
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                refused |= io.kind() == std::io::ErrorKind::ConnectionRefused;
            }
            let text = cause.to_string();
            // Some connectors box the io error, so check its rendering too
            refused |= text.to_lowercase().contains("connection refused");
            message.push_str(": ");
            message.push_str(&text);
            source = cause.source();
        }

        Self {
            operation,
            message,
            status_code: err.status().map(|s| s.as_u16()),
            connection_refused: refused,
        }
    }
}

/// Classified failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The inference server refused the connection
    Connectivity,
    /// A model download failed for network reasons
    ModelPullNetwork,
    /// The model runner died, typically from resource pressure
    ResourceExhaustion,
    /// The model did not fit in memory
    OutOfMemory,
    /// The installed-model list could not be fetched
    EnsureFailed,
    /// The caller cancelled the invocation
    Cancelled,
    /// Nothing recognizable; the raw message is passed through
    Unknown,
}

/// Top-level error returned by story generation.
#[derive(Error, Debug)]
pub enum StoryError {
    #[error(
        "Cannot connect to Ollama. Please make sure Ollama is running on {endpoint}\n\n\
         Start it with `ollama serve`, or point Storylens at the right address \
         with --endpoint / OLLAMA_HOST."
    )]
    Connectivity {
        endpoint: String,
        #[source]
        source: InferenceError,
    },

    #[error(
        "Failed to download model '{model}' because of a network problem: {source}\n\n\
         Try the following:\n  \
         1. Wait a few minutes and try again; the model registry may be busy\n  \
         2. Pull the model manually: ollama pull {model}\n  \
         3. Check your internet connection, proxy and firewall settings\n  \
         4. Choose a smaller model such as '{smaller}'"
    )]
    ModelPullNetwork {
        model: String,
        smaller: String,
        #[source]
        source: InferenceError,
    },

    #[error(
        "The model runner for '{model}' stopped unexpectedly, most likely because of \
         resource limitations.\n\n\
         Try the following:\n  \
         1. Use a smaller model such as '{smaller}'\n  \
         2. Close other applications to free memory ('{model}' needs at least {min_ram} of RAM)\n  \
         3. Restart the Ollama server"
    )]
    ResourceExhaustion {
        model: String,
        min_ram: String,
        smaller: String,
        #[source]
        source: InferenceError,
    },

    #[error(
        "Not enough memory to run '{model}' (requires at least {min_ram} of RAM).\n\n\
         Try the following:\n  \
         1. Switch to a smaller model such as '{smaller}'\n  \
         2. Close other applications to free memory\n  \
         3. Restart your computer if memory stays exhausted"
    )]
    OutOfMemory {
        model: String,
        min_ram: String,
        smaller: String,
        #[source]
        source: InferenceError,
    },

    #[error(
        "Failed to ensure model '{model}' is available. Make sure Ollama is running \
         on {endpoint}. Error: {source}"
    )]
    EnsureFailed {
        model: String,
        endpoint: String,
        #[source]
        source: InferenceError,
    },

    #[error("Story generation cancelled while {stage}")]
    Cancelled { stage: Stage },

    /// Unrecognized server failure, passed through unchanged.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl StoryError {
    /// The classified kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoryError::Connectivity { .. } => ErrorKind::Connectivity,
            StoryError::ModelPullNetwork { .. } => ErrorKind::ModelPullNetwork,
            StoryError::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
            StoryError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            StoryError::EnsureFailed { .. } => ErrorKind::EnsureFailed,
            StoryError::Cancelled { .. } => ErrorKind::Cancelled,
            StoryError::Inference(_) => ErrorKind::Unknown,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Convenience type alias for story generation results.
pub type Result<T> = std::result::Result<T, StoryError>;
