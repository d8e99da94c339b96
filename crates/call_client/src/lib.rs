use std::{
    fmt,
    sync::{Arc, Mutex},
};

use shared::protocol::CallRequest;
use thiserror::Error;

mod client;

pub use client::{interpret_response, CallClient, CallClientError};
pub use shared::domain::{CountryCode, CountryOption, COUNTRY_OPTIONS};

pub const EMPTY_PHONE_ALERT: &str = "Please enter a valid phone number.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter a valid phone number.")]
    EmptyPhone,
}

/// The two inputs of the call form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallForm {
    pub country_code: CountryCode,
    pub phone: String,
}

impl CallForm {
    pub fn new(country_code: CountryCode, phone: impl Into<String>) -> Self {
        Self {
            country_code,
            phone: phone.into(),
        }
    }

    /// Dialing prefix followed directly by the trimmed phone text. Nothing else about the
    /// number is checked or rewritten.
    pub fn assemble(&self) -> Result<CallRequest, FormError> {
        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(FormError::EmptyPhone);
        }
        Ok(CallRequest {
            phone_number: format!("{}{phone}", self.country_code.as_str()),
        })
    }
}

/// Contents of the status line under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusText {
    InProgress,
    /// `call_sid` is `None` when the reply carried no SID; it renders as `undefined`.
    Initiated { call_sid: Option<String> },
    Failed(String),
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusText::InProgress => f.write_str("Initiating call..."),
            StatusText::Initiated { call_sid } => write!(
                f,
                "Call initiated! Call SID: {}",
                call_sid.as_deref().unwrap_or("undefined")
            ),
            StatusText::Failed(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Where the form controller reports to: a blocking alert and a single overwritable
/// status line.
pub trait StatusSink: Send + Sync {
    fn alert(&self, message: &str);
    fn set_status(&self, status: &StatusText);
}

#[derive(Debug, Default)]
struct StatusLog {
    alerts: Vec<String>,
    history: Vec<StatusText>,
}

/// In-memory sink. The current status is whatever was written last.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<StatusLog>>,
}

impl SharedStatus {
    pub fn current(&self) -> Option<StatusText> {
        self.log(|log| log.history.last().cloned())
    }

    pub fn alerts(&self) -> Vec<String> {
        self.log(|log| log.alerts.clone())
    }

    /// Every status written so far, oldest first.
    pub fn history(&self) -> Vec<StatusText> {
        self.log(|log| log.history.clone())
    }

    fn log<T>(&self, f: impl FnOnce(&mut StatusLog) -> T) -> T {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl StatusSink for SharedStatus {
    fn alert(&self, message: &str) {
        self.log(|log| log.alerts.push(message.to_string()));
    }

    fn set_status(&self, status: &StatusText) {
        self.log(|log| log.history.push(status.clone()));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
