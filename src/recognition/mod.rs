pub mod locale;
pub mod normalizer;
pub mod pipeline;
pub mod query;
pub mod validator;

use serde::{Deserialize, Serialize};

/// Literal the model uses for "field not determined".
pub const UNKNOWN: &str = "unknown";

pub fn is_unknown(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(UNKNOWN)
}

/// True when the value carries real text: not blank and not the sentinel.
pub fn has_text(value: &str) -> bool {
    !value.trim().is_empty() && !is_unknown(value)
}

/// One venue extracted from a model response, before validity filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueCandidate {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_handle: Option<String>,
}

impl VenueCandidate {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            original_handle: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.original_handle = Some(handle.into());
        self
    }

    /// Address for display, empty when the model did not find one.
    pub fn display_address(&self) -> &str {
        if has_text(&self.address) {
            self.address.trim()
        } else {
            ""
        }
    }

    pub fn handle(&self) -> Option<&str> {
        self.original_handle
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

/// Canonical output of the normalizer for one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub candidates: Vec<VenueCandidate>,
    #[serde(default)]
    pub food_keywords: String,
}

impl RecognitionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// Re-export commonly used items
pub use locale::{extract_area, is_generic_name};
pub use normalizer::{normalize, parse_response, NormalizeError, SchemaShape};
pub use pipeline::{NotFoundReason, Pipeline, PipelineOutcome, Recognizer, VenueMatch};
pub use query::{build_query, SearchQuery, MAPS_SEARCH_BASE};
pub use validator::{dedup_candidates, filter_valid, is_valid, ValidationPolicy};
