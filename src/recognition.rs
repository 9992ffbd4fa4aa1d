use crate::canvas::ProcessedImage;
use crate::error::InkMathError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Raw recognizer output.
///
/// Recognizers return either a single `{"text": ..}` mapping or an ordered
/// sequence of such mappings, best candidate first. Any other metadata is kept
/// untouched so it can be reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecognitionResult(Value);

impl RecognitionResult {
    pub fn single(text: impl Into<String>) -> Self {
        Self(json!({ "text": text.into() }))
    }

    /// Ranked candidates with a confidence each
    pub fn candidates<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self(Value::Array(
            entries
                .into_iter()
                .map(|(text, confidence)| json!({ "text": text.into(), "confidence": confidence }))
                .collect(),
        ))
    }

    pub fn empty() -> Self {
        Self(Value::Array(Vec::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Text of the best candidate, see [`extract_text`]
    pub fn text(&self) -> Option<String> {
        extract_text(&self.0)
    }
}

/// Normalize a recognizer's output to the text of its best candidate.
///
/// A sequence contributes its first entry, a mapping itself. Anything else,
/// an empty sequence, a missing or non-string `text` field, or text that is
/// only whitespace, means no expression was detected.
pub fn extract_text(value: &Value) -> Option<String> {
    let entry = match value {
        Value::Array(items) => items.first()?,
        Value::Object(_) => value,
        _ => return None,
    };
    let text = entry.get("text")?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Trait that all recognizers must implement
pub trait Recognizer: Send + Sync {
    /// Returns the recognizer identifier (e.g., "ocrs", "command")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the recognizer
    fn description(&self) -> &'static str;

    /// Convert a processed drawing into candidate LaTeX strings
    fn recognize(&self, image: &ProcessedImage) -> Result<RecognitionResult, InkMathError>;
}
