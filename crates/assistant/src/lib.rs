use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub mod estimate;
pub mod faq;
pub mod language;
pub mod openai;
pub mod validate;

pub use estimate::{CostEstimator, EstimateError, EstimateRequest, RateCardEstimator, ServiceCosts};
pub use faq::{is_faq_query, FaqEntry, FaqMatcher};
pub use openai::{OpenAiClient, OpenAiConfig};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("unexpected language model response: {0}")]
    Decode(String),
}

/// Port to the hosted language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_content: &str)
        -> Result<String, AssistantError>;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError>;
}

pub const EXTRACTION_PROMPT: &str = "You are a JSON parser for a moving service chatbot. \
The user may provide details about their move.\n\
Extract the following information into JSON with these exact keys: origin, destination, \
move_size, move_date, additional_services, username, contact_no.\n\
If a field is not mentioned, set it to null or an empty array.\n\
Return only JSON, no extra text.";

/// Move fields pulled out of one free-text turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub move_size: Option<String>,
    pub move_date: Option<String>,
    pub additional_services: Vec<String>,
    pub username: Option<String>,
    pub contact_no: Option<String>,
}

impl ExtractedFields {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let additional_services = match value.get("additional_services") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        Self {
            origin: text("origin"),
            destination: text("destination"),
            move_size: text("move_size"),
            move_date: text("move_date"),
            additional_services,
            username: text("username"),
            contact_no: text("contact_no"),
        }
    }

    /// True when any of the four fields that drive an estimate was mentioned.
    pub fn has_estimate_input(&self) -> bool {
        self.origin.is_some()
            || self.destination.is_some()
            || self.move_size.is_some()
            || self.move_date.is_some()
    }
}

/// Asks the model for structured move fields. A reply that is not a JSON object yields
/// empty fields rather than an error.
pub async fn extract_move_fields(
    model: &dyn LanguageModel,
    user_text: &str,
) -> Result<ExtractedFields, AssistantError> {
    let raw = model.complete(EXTRACTION_PROMPT, user_text).await?;
    match serde_json::from_str::<Value>(strip_code_fence(&raw)) {
        Ok(value @ Value::Object(_)) => Ok(ExtractedFields::from_value(&value)),
        Ok(_) | Err(_) => {
            warn!(reply_len = raw.len(), "field extraction reply was not a JSON object");
            Ok(ExtractedFields::default())
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
