use std::sync::{Arc, Mutex};

use assistant::{
    AssistantError, FaqEntry, FaqMatcher, LanguageModel, RateCardEstimator, EXTRACTION_PROMPT,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::domain::{ChatId, ChatState};
use storage::{Storage, StoredSession};
use telephony::{CallPlacer, PlacedCall, TelephonyError};

use crate::ApiContext;

pub(crate) const GENERAL_REPLY: &str = "Happy to help with your move! 🚚";
pub(crate) const REFUND_ANSWER: &str = "Refunds are processed within 5 business days.";

/// Returns the queued extraction JSON for the field parser and a canned general reply
/// otherwise.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    extraction: Mutex<String>,
    pub(crate) last_general_input: Mutex<Option<String>>,
    pub(crate) last_system_prompt: Mutex<Option<String>>,
    pub(crate) fail: bool,
}

impl ScriptedModel {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn extract(&self, json: &str) {
        *self.extraction.lock().expect("lock") = json.to_string();
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system_prompt: &str, user: &str) -> Result<String, AssistantError> {
        if self.fail {
            return Err(AssistantError::Provider {
                status: 503,
                message: "overloaded".into(),
            });
        }
        if system_prompt == EXTRACTION_PROMPT {
            let queued = self.extraction.lock().expect("lock").clone();
            return Ok(if queued.is_empty() { "{}".into() } else { queued });
        }
        *self.last_general_input.lock().expect("lock") = Some(user.to_string());
        *self.last_system_prompt.lock().expect("lock") = Some(system_prompt.to_string());
        Ok(GENERAL_REPLY.to_string())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError> {
        let lower = text.to_lowercase();
        Ok(["refund", "cancel", "payment"]
            .iter()
            .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakePlacer {
    pub(crate) calls: Mutex<Vec<(String, String)>>,
    pub(crate) reject_with: Option<String>,
}

#[async_trait]
impl CallPlacer for FakePlacer {
    async fn place_call(&self, to: &str, answer_url: &str) -> Result<PlacedCall, TelephonyError> {
        self.calls
            .lock()
            .expect("lock")
            .push((to.to_string(), answer_url.to_string()));
        if let Some(message) = &self.reject_with {
            return Err(TelephonyError::Rejected {
                status: 400,
                message: message.clone(),
            });
        }
        Ok(PlacedCall {
            call_sid: "CA0001".into(),
            status: Some("queued".into()),
        })
    }
}

pub(crate) async fn context(model: Arc<ScriptedModel>, placer: Arc<FakePlacer>) -> ApiContext {
    let faq = FaqMatcher::from_parts(
        vec![FaqEntry {
            question: "What is your refund policy?".into(),
            answer: REFUND_ANSWER.into(),
        }],
        vec![vec![1.0, 0.0, 0.0]],
    );
    ApiContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        telephony: placer,
        model,
        estimator: Arc::new(RateCardEstimator::default()),
        faq: Arc::new(faq),
        public_url: "https://movers.example/".into(),
    }
}

pub(crate) async fn session_in(ctx: &ApiContext, id: &str, state: ChatState) -> StoredSession {
    let chat_id = ChatId(id.into());
    ctx.storage
        .create_session(&chat_id, "Max", ChatState::Initial)
        .await
        .expect("create");
    let mut session = ctx
        .storage
        .load_session(&chat_id)
        .await
        .expect("load")
        .expect("session");
    session.state = state;
    ctx.storage.save_session(&session).await.expect("save");
    session
}

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 15).expect("date")
}
