//! Static registry of known vision models.
//!
//! Models are ordered smallest to largest. To add a custom model, append a
//! [`ModelDescriptor`] to [`VISION_MODELS`]; names must stay unique and at
//! least one entry must be recommended.

use serde::Serialize;

/// Catalog entry describing a model's identity and resource requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Model name as known to the inference server (may carry a `:tag`)
    pub name: &'static str,
    /// Approximate download size
    pub size_label: &'static str,
    pub description: &'static str,
    pub recommended: bool,
    /// Minimum RAM needed to run the model
    pub min_ram: &'static str,
}

/// Built-in vision models.
pub const VISION_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        name: "moondream",
        size_label: "~1.6 GB",
        description: "Very small, efficient model optimized for edge devices and \
                      low-resource machines. Fast inference but basic image understanding.",
        recommended: true,
        min_ram: "4 GB",
    },
    ModelDescriptor {
        name: "llava:7b",
        size_label: "~4.5 GB",
        description: "Small, balanced model suitable for general-purpose visual \
                      understanding. Good balance between quality and resource usage.",
        recommended: true,
        min_ram: "8 GB",
    },
    ModelDescriptor {
        name: "bakllava",
        size_label: "~4.5 GB",
        description: "Alternative small vision model with good performance. Similar \
                      to llava:7b with slightly different architecture.",
        recommended: false,
        min_ram: "8 GB",
    },
    ModelDescriptor {
        name: "llava:13b",
        size_label: "~7.5 GB",
        description: "Medium-sized model offering enhanced accuracy for complex visual \
                      tasks. Better quality but requires more resources.",
        recommended: false,
        min_ram: "16 GB",
    },
    ModelDescriptor {
        name: "llava:34b",
        size_label: "~20 GB",
        description: "Large model with excellent image understanding. Best quality but \
                      requires significant resources. Not recommended for most local machines.",
        recommended: false,
        min_ram: "32 GB",
    },
];

/// Read-only view over an ordered, non-empty list of model descriptors.
#[derive(Debug, Clone, Copy)]
pub struct ModelCatalog {
    models: &'static [ModelDescriptor],
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: VISION_MODELS,
        }
    }
}

impl ModelCatalog {
    /// Wrap a custom descriptor list. Returns `None` for an empty list.
    pub fn new(models: &'static [ModelDescriptor]) -> Option<Self> {
        if models.is_empty() {
            None
        } else {
            Some(Self { models })
        }
    }

    /// All descriptors, in catalog order.
    pub fn list(&self) -> &'static [ModelDescriptor] {
        self.models
    }

    /// Name of the first recommended model, or of the first model if none is
    /// recommended.
    pub fn default_model(&self) -> &'static str {
        self.models
            .iter()
            .find(|m| m.recommended)
            .unwrap_or_else(|| self.smallest())
            .name
    }

    /// Descriptor for `name`.
    ///
    /// Unknown names fall back to the first entry instead of signalling
    /// absence, so this must not be used to validate a model name; use
    /// [`ModelCatalog::contains`] for that.
    pub fn get_info(&self, name: &str) -> &'static ModelDescriptor {
        self.models
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| self.smallest())
    }

    /// Whether `name` is an exact catalog entry.
    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }

    /// Recommended models, in catalog order.
    pub fn recommended(&self) -> impl Iterator<Item = &'static ModelDescriptor> {
        self.models.iter().filter(|m| m.recommended)
    }

    /// The first (smallest) catalog entry.
    pub fn smallest(&self) -> &'static ModelDescriptor {
        // `new` and `default` both guarantee a non-empty slice.
        &self.models[0]
    }
}
