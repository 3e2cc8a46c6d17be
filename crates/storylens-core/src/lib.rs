//! Storylens Core - turn an image into a short story with a local vision model.
//!
//! Storylens talks to a locally running Ollama server. Before generating it
//! makes sure the requested model is installed (pulling it if needed), then
//! sends the image with a fixed story prompt and returns the generated text.
//! Failures are classified into errors that tell the user what to do next.
//!
//! # Architecture
//!
//! ```text
//! Image → Resolve model → Ensure installed (pull?) → Encode (base64) → Chat → Story
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use storylens_core::{Config, StoryClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let client = StoryClient::from_config(&config)?;
//!
//!     let image = std::fs::read("./beach.jpg")?;
//!     let story = client.generate_story(&image, Some("llava:7b")).await?;
//!     println!("{story}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod availability;
pub mod backend;
pub mod cancel;
pub mod catalog;
pub mod classify;
pub mod client;
pub mod config;
pub mod encoder;
pub mod error;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use availability::{name_matches, ModelAvailabilityManager};
pub use backend::{InferenceBackend, InstalledModel, OllamaBackend};
pub use cancel::CancelSignal;
pub use catalog::{ModelCatalog, ModelDescriptor};
pub use client::{GenerationRequest, Stage, StoryClient, FALLBACK_STORY, STORY_PROMPT};
pub use config::Config;
pub use error::{ConfigError, ErrorKind, InferenceError, Operation, Result, StoryError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
