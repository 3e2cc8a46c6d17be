//! In-memory inference backend for pipeline tests.

use crate::backend::{ChatMessage, ChatRequest, ChatResponse, InferenceBackend, InstalledModel};
use crate::error::InferenceError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A configurable fake server.
///
/// Pulls succeed by default and add the pulled name to the installed list;
/// chat answers with `reply` (or no message at all when `reply` is `None`).
pub struct FakeBackend {
    installed: Mutex<Vec<String>>,
    list_error: Option<InferenceError>,
    pull_error: Option<InferenceError>,
    pull_hangs: bool,
    chat_result: Result<Option<String>, InferenceError>,
    chat_delay: Option<Duration>,
    pulled: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
    list_calls: AtomicU32,
}

impl FakeBackend {
    pub fn with_installed(names: &[&str]) -> Self {
        Self {
            installed: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            list_error: None,
            pull_error: None,
            pull_hangs: false,
            chat_result: Ok(Some("A story.".to_string())),
            chat_delay: None,
            pulled: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            list_calls: AtomicU32::new(0),
        }
    }

    pub fn failing_list(mut self, err: InferenceError) -> Self {
        self.list_error = Some(err);
        self
    }

    pub fn failing_pull(mut self, err: InferenceError) -> Self {
        self.pull_error = Some(err);
        self
    }

    /// Pulls never complete.
    pub fn hanging_pull(mut self) -> Self {
        self.pull_hangs = true;
        self
    }

    pub fn replying(mut self, content: Option<&str>) -> Self {
        self.chat_result = Ok(content.map(String::from));
        self
    }

    pub fn failing_chat(mut self, err: InferenceError) -> Self {
        self.chat_result = Err(err);
        self
    }

    pub fn slow_chat(mut self, delay: Duration) -> Self {
        self.chat_delay = Some(delay);
        self
    }

    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }

    pub fn pull_count(&self) -> usize {
        self.pulled.lock().unwrap().len()
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn endpoint(&self) -> &str {
        "http://fake-ollama:11434"
    }

    async fn list_models(&self) -> Result<Vec<InstalledModel>, InferenceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        let installed = self.installed.lock().unwrap();
        Ok(installed
            .iter()
            .map(|name| InstalledModel { name: name.clone() })
            .collect())
    }

    async fn pull_model(&self, name: &str) -> Result<(), InferenceError> {
        if self.pull_hangs {
            std::future::pending::<()>().await;
        }
        if let Some(err) = &self.pull_error {
            return Err(err.clone());
        }
        self.pulled.lock().unwrap().push(name.to_string());
        self.installed.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.chat_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.chat_result {
            Ok(content) => Ok(ChatResponse {
                message: content.as_ref().map(|text| ChatMessage {
                    role: "assistant".to_string(),
                    content: text.clone(),
                    images: Vec::new(),
                }),
            }),
            Err(err) => Err(err.clone()),
        }
    }
}
