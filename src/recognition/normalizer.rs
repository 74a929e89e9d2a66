use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{RecognitionResult, VenueCandidate, UNKNOWN};

lazy_static! {
    static ref LEADING_FENCE: Regex = Regex::new(r"^```(?:json|JSON)?\s*").unwrap();
    static ref TRAILING_FENCE: Regex = Regex::new(r"\s*```$").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Model response was empty")]
    EmptyInput,

    #[error("Model response is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Model response does not match any known schema")]
    UnrecognizedShape,
}

/// Payload layouts the model has produced over its prompt revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaShape {
    /// `{"name": .., "address": ..}`
    LegacyFlat,
    /// `{"restaurants": [{..}], "food_keywords": ..}`
    Multi,
    Unrecognized,
}

type ShapeMatcher = fn(&Map<String, Value>) -> bool;

// A `restaurants` array means the multi shape, even next to stray flat keys.
fn is_legacy_flat(obj: &Map<String, Value>) -> bool {
    (obj.contains_key("name") || obj.contains_key("address")) && !is_multi(obj)
}

fn is_multi(obj: &Map<String, Value>) -> bool {
    obj.get("restaurants").map_or(false, Value::is_array)
}

// Tried in order; first match wins.
const SHAPE_MATCHERS: &[(SchemaShape, ShapeMatcher)] = &[
    (SchemaShape::LegacyFlat, is_legacy_flat),
    (SchemaShape::Multi, is_multi),
];

impl SchemaShape {
    pub fn detect(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return SchemaShape::Unrecognized;
        };
        SHAPE_MATCHERS
            .iter()
            .find(|(_, matches)| matches(obj))
            .map(|(shape, _)| *shape)
            .unwrap_or(SchemaShape::Unrecognized)
    }

    fn convert(self, value: &Value) -> RecognitionResult {
        let Some(obj) = value.as_object() else {
            return RecognitionResult::empty();
        };
        match self {
            SchemaShape::LegacyFlat => RecognitionResult {
                candidates: vec![candidate_from(obj)],
                food_keywords: food_keywords_from(obj),
            },
            SchemaShape::Multi => {
                let candidates = obj
                    .get("restaurants")
                    .and_then(Value::as_array)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(Value::as_object)
                            .map(candidate_from)
                            .collect()
                    })
                    .unwrap_or_default();
                RecognitionResult {
                    candidates,
                    food_keywords: food_keywords_from(obj),
                }
            }
            SchemaShape::Unrecognized => RecognitionResult::empty(),
        }
    }
}

/// Removes markdown code fences the model sometimes wraps its JSON in.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_head = LEADING_FENCE.replace(trimmed, "");
    let without_tail = TRAILING_FENCE.replace(&without_head, "");
    without_tail.trim().to_string()
}

fn parse_json(text: &str) -> Result<Value, NormalizeError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            // Prose around the object: retry on the outermost braces
            if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
                if start < end {
                    if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                        return Ok(value);
                    }
                }
            }
            Err(NormalizeError::InvalidJson {
                message: first_error.to_string(),
            })
        }
    }
}

/// Parses raw model text into a canonical result, reporting why it could not.
pub fn parse_response(raw: &str) -> Result<RecognitionResult, NormalizeError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let value = parse_json(&cleaned)?;
    let shape = SchemaShape::detect(&value);
    log::debug!("Model response shape: {:?}", shape);

    if shape == SchemaShape::Unrecognized {
        return Err(NormalizeError::UnrecognizedShape);
    }
    Ok(shape.convert(&value))
}

/// Like [`parse_response`], but every failure degrades to an empty result.
pub fn normalize(raw: &str) -> RecognitionResult {
    match parse_response(raw) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Discarding model response: {}", e);
            RecognitionResult::empty()
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

fn candidate_from(obj: &Map<String, Value>) -> VenueCandidate {
    // Handles are carried untouched; only blank ones are dropped.
    let original_handle = obj
        .get("original_handle")
        .and_then(Value::as_str)
        .filter(|h| !h.trim().is_empty())
        .map(str::to_string);

    VenueCandidate {
        name: string_field(obj, "name").unwrap_or_else(|| UNKNOWN.to_string()),
        address: string_field(obj, "address").unwrap_or_else(|| UNKNOWN.to_string()),
        original_handle,
    }
}

fn food_keywords_from(obj: &Map<String, Value>) -> String {
    match obj.get("food_keywords") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}
