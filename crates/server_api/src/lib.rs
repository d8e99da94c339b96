use std::sync::Arc;

use assistant::{CostEstimator, EstimateRequest, FaqMatcher, LanguageModel};
use chrono::{NaiveDate, Utc};
use shared::{
    domain::{AdditionalService, ChatId, ChatState, MoveDetails, Sender},
    error::{ApiError, ErrorCode},
    protocol::{
        ChatReply, EndChatResponse, EstimateCostRequest, EstimateCostResponse,
        GeneralQueryRequest, InitiateCallResponse, StartChatResponse, VoiceWebhook,
    },
};
use storage::{Storage, StoredSession};
use telephony::{
    twiml::{Gather, VoiceResponse},
    CallPlacer,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod conversation;

use conversation::Channel;

pub const BOT_NAMES: [&str; 6] = ["MoveBot", "Max", "Sunny", "Atlas", "Piper", "Nova"];
pub const VOICE_INPUT_ROUTE: &str = "/voice/handle_input";
pub const VOICE_ERROR_REPLY: &str = "An error occurred. Please try again later.";
pub const FAREWELL_MESSAGE: &str =
    "Chat ended successfully. Thank you for choosing My Good Movers! 👋";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub telephony: Arc<dyn CallPlacer>,
    pub model: Arc<dyn LanguageModel>,
    pub estimator: Arc<dyn CostEstimator>,
    pub faq: Arc<FaqMatcher>,
    /// Externally reachable base URL the carrier calls back on.
    pub public_url: String,
}

impl ApiContext {
    pub fn voice_answer_url(&self) -> String {
        format!("{}/voice", self.public_url.trim_end_matches('/'))
    }
}

pub fn pick_bot_name() -> &'static str {
    let byte = Uuid::new_v4().as_bytes()[0] as usize;
    BOT_NAMES[byte % BOT_NAMES.len()]
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn initiate_call(
    ctx: &ApiContext,
    phone_number: Option<&str>,
) -> Result<InitiateCallResponse, ApiError> {
    // Forwarded exactly as received; only blankness is checked.
    let phone_number = phone_number
        .filter(|number| !number.trim().is_empty())
        .ok_or_else(|| ApiError::validation("phone_number is required"))?;

    let placed = ctx
        .telephony
        .place_call(phone_number, &ctx.voice_answer_url())
        .await
        .map_err(|e| {
            warn!(error = %e, "outbound call was not placed");
            ApiError::new(ErrorCode::Upstream, e.to_string())
        })?;

    ctx.storage
        .insert_call_record(&placed.call_sid, phone_number)
        .await
        .map_err(internal)?;
    info!(call_sid = %placed.call_sid, status = ?placed.status, "outbound call placed");
    Ok(InitiateCallResponse {
        call_sid: placed.call_sid,
    })
}

pub async fn start_chat(ctx: &ApiContext) -> Result<StartChatResponse, ApiError> {
    let chat_id = ChatId::generate();
    let bot_name = pick_bot_name();
    ctx.storage
        .create_session(&chat_id, bot_name, ChatState::Initial)
        .await
        .map_err(internal)?;

    let message =
        format!("Hello! I'm {bot_name} 🤖. How can I assist you with your move today? 📦🚚");
    ctx.storage
        .insert_message(&chat_id, Sender::Assistant, &message)
        .await
        .map_err(internal)?;
    info!(%chat_id, bot_name, "chat started");
    Ok(StartChatResponse { chat_id, message })
}

pub async fn end_chat(ctx: &ApiContext, chat_id: Option<&str>) -> Result<EndChatResponse, ApiError> {
    let chat_id = required_chat_id(chat_id, "No chat_id provided")?;
    load_session(ctx, &chat_id).await?;

    ctx.storage
        .insert_message(&chat_id, Sender::Assistant, FAREWELL_MESSAGE)
        .await
        .map_err(internal)?;
    ctx.storage
        .deactivate_session(&chat_id)
        .await
        .map_err(internal)?;
    info!(%chat_id, "chat ended");
    Ok(EndChatResponse {
        message: FAREWELL_MESSAGE.to_string(),
    })
}

pub async fn general_query(
    ctx: &ApiContext,
    request: &GeneralQueryRequest,
) -> Result<ChatReply, ApiError> {
    let chat_id = required_chat_id(request.chat_id.as_deref(), "Missing chat_id")?;
    let mut session = load_session(ctx, &chat_id).await?;
    if !session.is_active && session.state != ChatState::Confirmed {
        return Err(ApiError::validation(
            "Chat session is already ended. Please start a new chat.",
        ));
    }

    let reply = conversation::respond(ctx, &mut session, Channel::Text, &request.message, today())
        .await
        .map_err(|e| {
            error!(%chat_id, error = %e, "chat turn failed");
            ApiError::new(
                ErrorCode::Internal,
                "An internal error occurred. Please try again later.",
            )
        })?;
    Ok(ChatReply { reply, chat_id })
}

/// One-shot estimate that also records the session and move details under `chat_id`.
pub async fn estimate_cost(
    ctx: &ApiContext,
    request: &EstimateCostRequest,
) -> Result<EstimateCostResponse, ApiError> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let (Some(origin), Some(destination), Some(move_size)) = (
        present(&request.origin),
        present(&request.destination),
        present(&request.move_size),
    ) else {
        return Err(ApiError::validation(
            "Missing required fields (origin, destination, move_size).",
        ));
    };

    let additional_services: Vec<AdditionalService> = request
        .additional_services
        .iter()
        .filter_map(|raw| match raw.parse::<AdditionalService>() {
            Ok(service) => Some(service),
            Err(e) => {
                debug!(error = %e, "ignoring additional service");
                None
            }
        })
        .collect();
    let move_date = present(&request.move_date);

    let range = ctx
        .estimator
        .estimate(&EstimateRequest {
            origin: origin.clone(),
            destination: destination.clone(),
            move_size: move_size.clone(),
            additional_services: additional_services.clone(),
            move_date: move_date.clone(),
        })
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let chat_id = present(&request.chat_id)
        .map(ChatId)
        .unwrap_or_else(ChatId::generate);
    ctx.storage
        .create_session(&chat_id, pick_bot_name(), ChatState::CostEstimated)
        .await
        .map_err(internal)?;
    let mut session = load_session(ctx, &chat_id).await?;
    let username = present(&request.username);
    let contact_no = present(&request.contact_no);
    if username.is_some() {
        session.username = username.clone();
    }
    if contact_no.is_some() {
        session.contact_no = contact_no.clone();
    }
    if move_date.is_some() {
        session.move_date = move_date.clone();
    }
    session.estimated_cost = Some(range);
    session.state = ChatState::CostEstimated;
    ctx.storage.save_session(&session).await.map_err(internal)?;

    let existing = ctx
        .storage
        .load_move_details(&chat_id)
        .await
        .map_err(internal)?
        .unwrap_or_default();
    let details = MoveDetails {
        origin: Some(origin),
        destination: Some(destination),
        move_size: Some(move_size),
        additional_services,
        move_date: move_date.or(existing.move_date),
        username: username.or(existing.username),
        contact_no: contact_no.or(existing.contact_no),
        estimated_cost: Some(range),
        ..existing
    };
    ctx.storage
        .save_move_details(&chat_id, &details, ChatState::CostEstimated)
        .await
        .map_err(internal)?;

    info!(%chat_id, %range, "cost estimated");
    Ok(EstimateCostResponse {
        estimated_cost: range.to_string(),
        chat_id,
    })
}

/// TwiML greeting for a freshly answered call.
pub async fn voice_greeting(ctx: &ApiContext, hook: &VoiceWebhook) -> Result<String, ApiError> {
    let session = voice_session(ctx, hook).await?;
    let prompt = format!(
        "Hello, this is {}. How can I assist you with your move today?",
        session.bot_name
    );
    Ok(VoiceResponse::new()
        .gather(Gather::speech(VOICE_INPUT_ROUTE, prompt))
        .to_xml())
}

/// Runs one spoken turn. Failures inside the conversation become a spoken apology
/// rather than an HTTP error so the carrier keeps the call alive.
pub async fn voice_turn(ctx: &ApiContext, hook: &VoiceWebhook) -> Result<String, ApiError> {
    let mut session = voice_session(ctx, hook).await?;
    let speech = hook.speech_result.as_deref().unwrap_or_default();

    match conversation::respond(ctx, &mut session, Channel::Voice, speech, today()).await {
        Ok(reply) => Ok(VoiceResponse::new()
            .gather(Gather::speech(VOICE_INPUT_ROUTE, reply))
            .to_xml()),
        Err(e) => {
            error!(chat_id = %session.chat_id, error = %e, "voice turn failed");
            Ok(VoiceResponse::new().say(VOICE_ERROR_REPLY).to_xml())
        }
    }
}

async fn voice_session(ctx: &ApiContext, hook: &VoiceWebhook) -> Result<StoredSession, ApiError> {
    let chat_id = hook
        .chat_id()
        .ok_or_else(|| ApiError::validation("CallSid or From is required"))?;
    if ctx
        .storage
        .create_session(&chat_id, pick_bot_name(), ChatState::Initial)
        .await
        .map_err(internal)?
    {
        info!(%chat_id, "voice session created");
    }
    load_session(ctx, &chat_id).await
}

fn required_chat_id(raw: Option<&str>, missing: &str) -> Result<ChatId, ApiError> {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| ChatId(id.to_string()))
        .ok_or_else(|| ApiError::validation(missing))
}

async fn load_session(ctx: &ApiContext, chat_id: &ChatId) -> Result<StoredSession, ApiError> {
    ctx.storage
        .load_session(chat_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("Chat session not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
