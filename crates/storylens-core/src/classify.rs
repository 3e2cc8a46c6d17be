//! Classification of raw inference failures into actionable errors.
//!
//! Matching is substring-based on the server's free-form error text, which
//! makes the server's literal wording the contract. Rules are checked in
//! this order and the first match wins:
//!
//! 1. connection refused (message contains `ECONNREFUSED`, or the nested
//!    transport error is a refused connection)
//! 2. network failure during a pull
//! 3. resource exhaustion of the model runner
//! 4. out of memory
//!
//! Resource-exhaustion phrasing overlaps with generic internal errors and
//! memory wording, so it is checked before the memory rule.

use crate::catalog::ModelCatalog;
use crate::error::{ErrorKind, InferenceError, Operation, StoryError};

const NETWORK_MARKERS: &[&str] = &["timeout", "timed out", "tls", "network", "connection"];

const RESOURCE_MARKERS: &[&str] = &[
    "unexpectedly stopped",
    "resource limitations",
    "internal error",
];

const MEMORY_MARKERS: &[&str] = &["out of memory", "memory"];

fn is_connection_refused(raw: &InferenceError) -> bool {
    raw.connection_refused || raw.message.contains("ECONNREFUSED")
}

/// Timeout, TLS or generic network/connection wording.
pub fn is_network_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    NETWORK_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_resource_exhaustion(message: &str) -> bool {
    let lower = message.to_lowercase();
    (lower.contains("model runner") && lower.contains("stopped"))
        || RESOURCE_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_out_of_memory(message: &str) -> bool {
    message.contains("OOM") || {
        let lower = message.to_lowercase();
        MEMORY_MARKERS.iter().any(|m| lower.contains(m))
    }
}

/// Classify a raw failure. Returns [`ErrorKind::Unknown`] when nothing matches.
pub fn classify(raw: &InferenceError) -> ErrorKind {
    if is_connection_refused(raw) {
        ErrorKind::Connectivity
    } else if raw.operation == Operation::Pull && is_network_failure(&raw.message) {
        ErrorKind::ModelPullNetwork
    } else if is_resource_exhaustion(&raw.message) {
        ErrorKind::ResourceExhaustion
    } else if is_out_of_memory(&raw.message) {
        ErrorKind::OutOfMemory
    } else {
        ErrorKind::Unknown
    }
}

/// Context used to parameterize remediation text.
#[derive(Debug, Clone, Copy)]
pub struct Remediation<'a> {
    /// The model the failing invocation asked for
    pub model: &'a str,
    pub catalog: &'a ModelCatalog,
    /// Inference server address
    pub endpoint: &'a str,
}

impl Remediation<'_> {
    /// Turn a raw failure into the matching remediation-bearing error.
    /// Unrecognized failures pass through unchanged.
    pub fn report(&self, raw: InferenceError) -> StoryError {
        let model = self.model.to_string();
        let min_ram = self.catalog.get_info(self.model).min_ram.to_string();
        let smaller = self.catalog.smallest().name.to_string();

        match classify(&raw) {
            ErrorKind::Connectivity => StoryError::Connectivity {
                endpoint: self.endpoint.to_string(),
                source: raw,
            },
            ErrorKind::ModelPullNetwork => StoryError::ModelPullNetwork {
                model,
                smaller,
                source: raw,
            },
            ErrorKind::ResourceExhaustion => StoryError::ResourceExhaustion {
                model,
                min_ram,
                smaller,
                source: raw,
            },
            ErrorKind::OutOfMemory => StoryError::OutOfMemory {
                model,
                min_ram,
                smaller,
                source: raw,
            },
            _ => StoryError::Inference(raw),
        }
    }

    /// Final classification pass over an error leaving the pipeline.
    ///
    /// Raw failures are classified; an ensure failure caused by a refused
    /// connection becomes a connectivity error. Everything else is already
    /// classified and is returned as is.
    pub fn refine(&self, err: StoryError) -> StoryError {
        match err {
            StoryError::Inference(raw) => self.report(raw),
            StoryError::EnsureFailed { source, .. } if is_connection_refused(&source) => {
                StoryError::Connectivity {
                    endpoint: self.endpoint.to_string(),
                    source,
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(operation: Operation, message: &str) -> InferenceError {
        InferenceError::new(operation, message)
    }

    fn remediation(catalog: &ModelCatalog) -> Remediation<'_> {
        Remediation {
            model: "llava:13b",
            catalog,
            endpoint: "http://localhost:11434",
        }
    }

    #[test]
    fn test_econnrefused_is_connectivity() {
        let err = raw(Operation::Chat, "connect ECONNREFUSED 127.0.0.1:11434");
        assert_eq!(classify(&err), ErrorKind::Connectivity);
    }

    #[test]
    fn test_nested_refused_flag_is_connectivity() {
        let mut err = raw(Operation::Pull, "error sending request: tcp connect error");
        err.connection_refused = true;
        assert_eq!(classify(&err), ErrorKind::Connectivity);
    }

    #[test]
    fn test_pull_timeout_is_pull_network() {
        let err = raw(Operation::Pull, "request timed out");
        assert_eq!(classify(&err), ErrorKind::ModelPullNetwork);
    }

    #[test]
    fn test_pull_tls_is_pull_network() {
        let err = raw(Operation::Pull, "TLS handshake failed");
        assert_eq!(classify(&err), ErrorKind::ModelPullNetwork);
    }

    #[test]
    fn test_network_wording_outside_pull_is_unknown() {
        let err = raw(Operation::Chat, "request timed out");
        assert_eq!(classify(&err), ErrorKind::Unknown);
    }

    #[test]
    fn test_model_runner_stopped_is_resource_exhaustion() {
        let err = raw(Operation::Chat, "model runner process has stopped");
        assert_eq!(classify(&err), ErrorKind::ResourceExhaustion);
    }

    #[test]
    fn test_resource_markers() {
        for message in [
            "llama runner unexpectedly stopped",
            "model failed to load, this may be due to resource limitations",
            "an internal error has occurred",
        ] {
            assert_eq!(
                classify(&raw(Operation::Chat, message)),
                ErrorKind::ResourceExhaustion,
                "{message}"
            );
        }
    }

    #[test]
    fn test_resource_exhaustion_wins_over_memory() {
        let err = raw(
            Operation::Chat,
            "model runner has stopped: insufficient memory",
        );
        assert_eq!(classify(&err), ErrorKind::ResourceExhaustion);
    }

    #[test]
    fn test_out_of_memory() {
        assert_eq!(
            classify(&raw(Operation::Chat, "cuda out of memory")),
            ErrorKind::OutOfMemory
        );
        assert_eq!(
            classify(&raw(Operation::Chat, "killed by OOM")),
            ErrorKind::OutOfMemory
        );
        assert_eq!(
            classify(&raw(Operation::Chat, "model requires more system memory (9.2 GiB)")),
            ErrorKind::OutOfMemory
        );
    }

    #[test]
    fn test_unmatched_is_unknown() {
        let err = raw(Operation::Chat, "model 'foo' not found");
        assert_eq!(classify(&err), ErrorKind::Unknown);
    }

    #[test]
    fn test_report_parameterizes_model_and_ram() {
        let catalog = ModelCatalog::default();
        let err = remediation(&catalog).report(raw(Operation::Chat, "cuda out of memory"));
        let text = err.to_string();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert!(text.contains("'llava:13b'"));
        assert!(text.contains("16 GB"));
        assert!(text.contains("'moondream'"));
    }

    #[test]
    fn test_report_unknown_passes_through() {
        let catalog = ModelCatalog::default();
        let err = remediation(&catalog).report(raw(Operation::Chat, "bad request"));
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.to_string(), "bad request");
    }

    #[test]
    fn test_refine_refused_ensure_failure_is_connectivity() {
        let catalog = ModelCatalog::default();
        let err = StoryError::EnsureFailed {
            model: "llava:13b".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            source: raw(Operation::List, "connect ECONNREFUSED 127.0.0.1:11434"),
        };
        let refined = remediation(&catalog).refine(err);
        assert_eq!(refined.kind(), ErrorKind::Connectivity);
        assert!(refined.to_string().contains("http://localhost:11434"));
    }

    #[test]
    fn test_refine_keeps_other_ensure_failures() {
        let catalog = ModelCatalog::default();
        let err = StoryError::EnsureFailed {
            model: "llava:13b".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            source: raw(Operation::List, "Ollama HTTP 502 Bad Gateway"),
        };
        assert_eq!(remediation(&catalog).refine(err).kind(), ErrorKind::EnsureFailed);
    }
}
