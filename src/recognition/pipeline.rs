use async_trait::async_trait;
use serde::Serialize;

use super::{build_query, dedup_candidates, parse_response, ValidationPolicy};
use crate::errors::RecognitionError;

/// Image-understanding backend: image bytes in, raw model text out.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError>;
}

#[async_trait]
impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError> {
        (**self).recognize(image).await
    }
}

/// One venue ready to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueMatch {
    pub name: String,
    /// Empty when no address was recognised.
    pub address: String,
    pub query: String,
    pub search_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    RecognitionFailed,
    MalformedResponse,
    NoValidCandidates,
}

impl NotFoundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundReason::RecognitionFailed => "recognition_failed",
            NotFoundReason::MalformedResponse => "malformed_response",
            NotFoundReason::NoValidCandidates => "no_valid_candidates",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Never empty.
    Found(Vec<VenueMatch>),
    NotFound(NotFoundReason),
}

impl PipelineOutcome {
    pub fn matches(&self) -> &[VenueMatch] {
        match self {
            PipelineOutcome::Found(matches) => matches,
            PipelineOutcome::NotFound(_) => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PipelineOutcome::Found(_))
    }
}

/// Turns raw model text (or its absence) into the final outcome.
pub fn process_response(raw: Option<&str>, policy: ValidationPolicy) -> PipelineOutcome {
    let Some(raw) = raw else {
        return PipelineOutcome::NotFound(NotFoundReason::RecognitionFailed);
    };

    let result = match parse_response(raw) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Model response rejected: {}", e);
            return PipelineOutcome::NotFound(NotFoundReason::MalformedResponse);
        }
    };

    let extracted = result.count();
    let candidates = dedup_candidates(policy.filter(result.candidates));
    log::debug!(
        "Kept {} of {} extracted candidates",
        candidates.len(),
        extracted
    );

    if candidates.is_empty() {
        return PipelineOutcome::NotFound(NotFoundReason::NoValidCandidates);
    }

    let matches = candidates
        .iter()
        .map(|candidate| {
            let query = build_query(candidate, &result.food_keywords);
            VenueMatch {
                name: candidate.name.trim().to_string(),
                address: candidate.display_address().to_string(),
                query: query.text,
                search_url: query.url,
            }
        })
        .collect();

    PipelineOutcome::Found(matches)
}

pub struct Pipeline<R> {
    recognizer: R,
    policy: ValidationPolicy,
}

impl<R: Recognizer> Pipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            policy: ValidationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Runs one recognition cycle. Never fails: every problem ends as `NotFound`.
    pub async fn run(&self, image: &[u8]) -> PipelineOutcome {
        let raw = match self.recognizer.recognize(image).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Recognition call failed: {}", e);
                None
            }
        };
        self.process_text(raw.as_deref())
    }

    pub fn process_text(&self, raw: Option<&str>) -> PipelineOutcome {
        process_response(raw, self.policy)
    }
}
