use async_trait::async_trait;
use thiserror::Error;

mod twilio;
pub mod twiml;

pub use twilio::{TwilioClient, TwilioConfig, DEFAULT_TWILIO_API_BASE};

/// Outcome of asking the carrier to dial a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub call_sid: String,
    pub status: Option<String>,
}

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("telephony provider is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("telephony request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait CallPlacer: Send + Sync {
    /// Starts an outbound call to `to`. When answered, the carrier fetches call
    /// instructions from `answer_url`.
    async fn place_call(&self, to: &str, answer_url: &str) -> Result<PlacedCall, TelephonyError>;
}
