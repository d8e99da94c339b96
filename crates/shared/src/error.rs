use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Upstream,
    Internal,
}

/// Error body returned by every JSON endpoint. The message travels under `error`,
/// which is the field the call form and chat widget read.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_message_under_error_key() {
        let body = serde_json::to_value(ApiError::validation("phone_number is required"))
            .expect("json");
        assert_eq!(body["error"], "phone_number is required");
        assert_eq!(body["code"], "validation");
    }

    #[test]
    fn displays_code_and_message() {
        let err = ApiError::not_found("chat not found");
        assert_eq!(err.to_string(), "NotFound: chat not found");
        let boxed: Box<dyn std::error::Error> = Box::new(ApiError::validation("bad"));
        assert_eq!(boxed.to_string(), "Validation: bad");
    }
}
