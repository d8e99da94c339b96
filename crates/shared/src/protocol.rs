use serde::{Deserialize, Serialize};

use crate::domain::ChatId;

/// Body posted by the call form to `/initiate_call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiateCallRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateCallResponse {
    pub call_sid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartChatResponse {
    pub chat_id: ChatId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndChatRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndChatResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralQueryRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateCostRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub move_size: Option<String>,
    #[serde(default)]
    pub additional_services: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub contact_no: Option<String>,
    #[serde(default)]
    pub move_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateCostResponse {
    pub estimated_cost: String,
    pub chat_id: ChatId,
}

/// Form fields Twilio posts to the voice webhooks. Only the ones the service reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhook {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub speech_result: Option<String>,
}

impl VoiceWebhook {
    /// Session key for the call: `CallSid`, falling back to the caller number.
    pub fn chat_id(&self) -> Option<ChatId> {
        self.call_sid
            .as_deref()
            .or(self.from.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| ChatId(v.to_string()))
    }
}
