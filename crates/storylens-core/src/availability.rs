//! Ensures a model is installed on the inference server before use.

use crate::backend::{InferenceBackend, InstalledModel};
use crate::cancel::CancelSignal;
use crate::catalog::ModelCatalog;
use crate::classify::{self, Remediation};
use crate::client::Stage;
use crate::error::{Result, StoryError};
use std::sync::Arc;

/// Whether an installed model satisfies a requested model name.
///
/// Matches on exact equality, or when the installed name contains the
/// requested name's family prefix (the part before the first `:`). This
/// tolerates tags the server appends, at the cost of treating models that
/// share a family prefix as equivalent (`llava:34b` satisfies `llava:7b`).
pub fn name_matches(installed: &str, requested: &str) -> bool {
    let family = requested.split(':').next().unwrap_or(requested);
    installed == requested || installed.contains(family)
}

/// Checks for and pulls models on the inference server.
#[derive(Clone)]
pub struct ModelAvailabilityManager {
    backend: Arc<dyn InferenceBackend>,
    catalog: ModelCatalog,
}

impl ModelAvailabilityManager {
    pub fn new(backend: Arc<dyn InferenceBackend>, catalog: ModelCatalog) -> Self {
        Self { backend, catalog }
    }

    fn ensure_failed(&self, name: &str, source: crate::error::InferenceError) -> StoryError {
        StoryError::EnsureFailed {
            model: name.to_string(),
            endpoint: self.backend.endpoint().to_string(),
            source,
        }
    }

    /// Installed models, as reported by the server.
    pub async fn installed(&self) -> Result<Vec<InstalledModel>> {
        Ok(self.backend.list_models().await?)
    }

    /// Whether the server has a model matching `name` installed.
    pub async fn is_available(&self, name: &str) -> Result<bool> {
        let installed = self
            .backend
            .list_models()
            .await
            .map_err(|e| self.ensure_failed(name, e))?;
        Ok(installed.iter().any(|m| name_matches(&m.name, name)))
    }

    /// Make sure `name` is installed, pulling it if it is not.
    ///
    /// A pull can take minutes; it is bounded only by `cancel`. Returns
    /// `true` when a pull was performed.
    pub async fn ensure_available(&self, name: &str, cancel: &CancelSignal) -> Result<bool> {
        let available = cancel
            .run(self.is_available(name))
            .await
            .ok_or(StoryError::Cancelled {
                stage: Stage::CheckingModel,
            })??;
        if available {
            tracing::debug!("Model {name} already installed");
            return Ok(false);
        }

        let info = self.catalog.get_info(name);
        tracing::info!("Model {name} not found. Pulling model...");
        if info.name == name {
            tracing::info!(
                "This model is approximately {}. Please be patient...",
                info.size_label
            );
        }

        let pulled = cancel
            .run(self.backend.pull_model(name))
            .await
            .ok_or(StoryError::Cancelled {
                stage: Stage::Pulling,
            })?;

        match pulled {
            Ok(()) => {
                tracing::info!("Model {name} pulled successfully!");
                Ok(true)
            }
            Err(e) if classify::is_network_failure(&e.message) => {
                tracing::warn!("Pulling {name} failed with a network error: {e}");
                let remediation = Remediation {
                    model: name,
                    catalog: &self.catalog,
                    endpoint: self.backend.endpoint(),
                };
                Err(remediation.report(e))
            }
            Err(e) => Err(StoryError::Inference(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, InferenceError, Operation};
    use crate::testing::FakeBackend;

    fn manager(backend: &Arc<FakeBackend>) -> ModelAvailabilityManager {
        ModelAvailabilityManager::new(backend.clone(), ModelCatalog::default())
    }

    #[test]
    fn test_name_matches_exact() {
        assert!(name_matches("llava:7b", "llava:7b"));
    }

    #[test]
    fn test_name_matches_family_prefix() {
        assert!(name_matches("llava:latest", "llava:7b"));
        assert!(name_matches("llava:34b", "llava:7b"));
        assert!(name_matches("moondream:latest", "moondream"));
        assert!(!name_matches("moondream:latest", "llava:7b"));
    }

    #[tokio::test]
    async fn test_is_available_exact() {
        let backend = Arc::new(FakeBackend::with_installed(&["llava:7b"]));
        assert!(manager(&backend).is_available("llava:7b").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_available_prefix() {
        let backend = Arc::new(FakeBackend::with_installed(&["llava:13b-v1.6"]));
        assert!(manager(&backend).is_available("llava:7b").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_available_missing() {
        let backend = Arc::new(FakeBackend::with_installed(&["moondream:latest"]));
        assert!(!manager(&backend).is_available("llava:7b").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_available_skips_pull_when_installed() {
        let backend = Arc::new(FakeBackend::with_installed(&["llava:7b"]));
        let pulled = manager(&backend)
            .ensure_available("llava:7b", &CancelSignal::new())
            .await
            .unwrap();
        assert!(!pulled);
        assert_eq!(backend.pull_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_available_pulls_missing_model() {
        let backend = Arc::new(FakeBackend::with_installed(&[]));
        let pulled = manager(&backend)
            .ensure_available("bakllava", &CancelSignal::new())
            .await
            .unwrap();
        assert!(pulled);
        assert_eq!(backend.pulled(), vec!["bakllava".to_string()]);
    }

    #[tokio::test]
    async fn test_list_failure_is_ensure_failed() {
        let backend = Arc::new(
            FakeBackend::with_installed(&[])
                .failing_list(InferenceError::http(Operation::List, 502, "bad gateway")),
        );
        let err = manager(&backend)
            .ensure_available("llava:7b", &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EnsureFailed);
        assert!(err.to_string().contains("http://fake-ollama:11434"));
        assert_eq!(backend.pull_count(), 0);
    }

    #[tokio::test]
    async fn test_pull_network_failure_is_wrapped() {
        let backend = Arc::new(
            FakeBackend::with_installed(&[])
                .failing_pull(InferenceError::new(Operation::Pull, "connection reset by peer")),
        );
        let err = manager(&backend)
            .ensure_available("llava:13b", &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelPullNetwork);
        assert!(err.to_string().contains("ollama pull llava:13b"));
    }

    #[tokio::test]
    async fn test_pull_other_failure_propagates_raw() {
        let backend = Arc::new(FakeBackend::with_installed(&[]).failing_pull(
            InferenceError::new(Operation::Pull, "pull model manifest: file does not exist"),
        ));
        let err = manager(&backend)
            .ensure_available("not-a-model", &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.to_string(), "pull model manifest: file does not exist");
    }

    #[tokio::test]
    async fn test_cancel_during_pull() {
        let backend = Arc::new(FakeBackend::with_installed(&[]).hanging_pull());
        let cancel = CancelSignal::new();
        let remote = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            remote.cancel();
        });

        let err = manager(&backend)
            .ensure_available("llava:7b", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoryError::Cancelled {
                stage: Stage::Pulling
            }
        ));
    }
}
