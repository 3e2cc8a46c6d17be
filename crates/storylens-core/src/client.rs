//! Story generation: the pipeline callers invoke.
//!
//! A single invocation moves through
//! `Idle → CheckingModel → (Pulling)? → Encoding → Requesting → {Succeeded | Failed}`.
//! There is no retry loop; generation is not idempotent, so retries are left
//! to the caller re-invoking the whole pipeline.

use crate::availability::ModelAvailabilityManager;
use crate::backend::{ChatMessage, ChatRequest, InferenceBackend, OllamaBackend};
use crate::cancel::CancelSignal;
use crate::catalog::ModelCatalog;
use crate::classify::Remediation;
use crate::config::Config;
use crate::encoder;
use crate::error::{ConfigError, Result, StoryError};
use std::sync::Arc;
use std::time::Instant;

/// Prompt sent with every image.
pub const STORY_PROMPT: &str = "Look at this image and create a creative, engaging story \
     based on what you see. The story should be 3-5 paragraphs long, descriptive, and \
     imaginative. Make it interesting and captivating.";

/// Returned when the server answers without any content.
pub const FALLBACK_STORY: &str = "Unable to generate story at this time.";

/// Progress of a single story invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    CheckingModel,
    Pulling,
    Encoding,
    Requesting,
    Succeeded,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Stage::Idle => "idle",
            Stage::CheckingModel => "checking model",
            Stage::Pulling => "pulling model",
            Stage::Encoding => "encoding image",
            Stage::Requesting => "requesting story",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// One story request: the caller's image, the resolved model and the prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub image: &'a [u8],
    pub model: String,
    pub prompt: &'static str,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(image: &'a [u8], model: impl Into<String>) -> Self {
        Self {
            image,
            model: model.into(),
            prompt: STORY_PROMPT,
        }
    }

    /// Encode the image and build the non-streaming chat request.
    pub fn to_chat_request(&self) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(
                self.prompt,
                vec![encoder::encode(self.image)],
            )],
            stream: false,
        }
    }
}

/// Turns images into stories using a vision model on an inference server.
///
/// Holds no mutable state; concurrent invocations on one client proceed
/// independently.
#[derive(Clone)]
pub struct StoryClient {
    backend: Arc<dyn InferenceBackend>,
    catalog: ModelCatalog,
    availability: ModelAvailabilityManager,
    default_model: Option<String>,
}

impl StoryClient {
    /// Create a client over any inference backend with the built-in catalog.
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self::with_catalog(backend, ModelCatalog::default())
    }

    pub fn with_catalog(backend: Arc<dyn InferenceBackend>, catalog: ModelCatalog) -> Self {
        let availability = ModelAvailabilityManager::new(backend.clone(), catalog);
        Self {
            backend,
            catalog,
            availability,
            default_model: None,
        }
    }

    /// Create a client talking to the Ollama server named in `config`.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        let backend = OllamaBackend::new(&config.server)?;
        let client = Self::new(Arc::new(backend))
            .with_default_model(config.generation.default_model().map(String::from));
        Ok(client)
    }

    /// Override the model used when a caller does not name one.
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn availability(&self) -> &ModelAvailabilityManager {
        &self.availability
    }

    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    /// The model an invocation will use: the requested one, else the
    /// configured default, else the catalog default.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_model.as_deref())
            .unwrap_or_else(|| self.catalog.default_model())
            .to_string()
    }

    fn remediation<'a>(&'a self, model: &'a str) -> Remediation<'a> {
        Remediation {
            model,
            catalog: &self.catalog,
            endpoint: self.backend.endpoint(),
        }
    }

    /// Make sure `model` is installed, pulling it if needed. Returns `true`
    /// when a pull was performed.
    ///
    /// Failures are classified the same way as in story generation.
    pub async fn ensure_model(&self, model: &str, cancel: &CancelSignal) -> Result<bool> {
        self.availability
            .ensure_available(model, cancel)
            .await
            .map_err(|err| self.remediation(model).refine(err))
    }

    /// Generate a story for `image`, without cancellation.
    pub async fn generate_story(&self, image: &[u8], model: Option<&str>) -> Result<String> {
        self.generate_story_with_cancel(image, model, &CancelSignal::new())
            .await
    }

    /// Generate a story for `image`.
    ///
    /// Pulls the model first if the server does not have it. Failures are
    /// classified into remediation-bearing errors; firing `cancel` aborts the
    /// pending server call with [`StoryError::Cancelled`].
    pub async fn generate_story_with_cancel(
        &self,
        image: &[u8],
        model: Option<&str>,
        cancel: &CancelSignal,
    ) -> Result<String> {
        let request = GenerationRequest::new(image, self.resolve_model(model));
        let start = Instant::now();

        match self.run(&request, cancel).await {
            Ok(story) => {
                tracing::debug!(
                    model = %request.model,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "stage: {}",
                    Stage::Succeeded
                );
                Ok(story)
            }
            Err(err) => {
                let err = self.remediation(&request.model).refine(err);
                tracing::debug!(model = %request.model, kind = ?err.kind(), "stage: {}", Stage::Failed);
                Err(err)
            }
        }
    }

    async fn run(&self, request: &GenerationRequest<'_>, cancel: &CancelSignal) -> Result<String> {
        let model = request.model.as_str();

        tracing::debug!(model, "stage: {}", Stage::CheckingModel);
        self.availability.ensure_available(model, cancel).await?;

        tracing::debug!(model, bytes = request.image.len(), "stage: {}", Stage::Encoding);
        let chat = request.to_chat_request();

        tracing::debug!(model, "stage: {}", Stage::Requesting);
        let response = cancel
            .run(self.backend.chat(&chat))
            .await
            .ok_or(StoryError::Cancelled {
                stage: Stage::Requesting,
            })??;

        match response.content() {
            Some(text) => Ok(text.to_string()),
            None => {
                tracing::warn!("{model} returned no content, using fallback story");
                Ok(FALLBACK_STORY.to_string())
            }
        }
    }
}
