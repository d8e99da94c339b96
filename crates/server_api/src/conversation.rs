//! Booking dialogue shared by the text chat and the phone line.
//!
//! A turn stores the user's message, runs the handler for the session's current
//! [`ChatState`], persists the session and move details, then stores the reply.

use anyhow::Result;
use assistant::{
    extract_move_fields, is_faq_query,
    language::{non_english_language, respond_in},
    validate::{normalize_contact_number, sanitize_input, standardize_date, title_case, validate_email},
    EstimateRequest, ServiceCosts,
};
use chrono::NaiveDate;
use shared::domain::{AdditionalService, ChatState, CostRange, MoveDetails, Sender};
use storage::StoredSession;
use tracing::{debug, warn};

use crate::ApiContext;

pub const NO_MOVE_DETAILS_REPLY: &str =
    "No move details found. Please provide origin, destination, move size, and move date first.";
pub const DECLINED_REPLY: &str = "No worries! Let me know if you have any other questions.";
pub const PROCEED_REPROMPT: &str =
    "Please respond with Yes or No. Would you like to proceed with booking?";
pub const CONFIRM_REPROMPT: &str = "Please respond with Yes or No. Do you confirm this booking?";
pub const EMAIL_PROMPT: &str = "Please share your email address for updates on your move.";
pub const NAME_PROMPT: &str = "Great! Now please share your name.";
pub const CONTACT_PROMPT: &str = "Thank you! Now please share your 10-digit contact number.";
pub const ESTIMATE_FAILED_REPLY: &str =
    "I'm having trouble calculating the cost. Please verify locations or try again.";

/// How the user is talking to us. Text answers are matched strictly and validated,
/// speech transcripts are matched loosely and stored as heard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Text,
    Voice,
}

impl Channel {
    fn is_yes(self, input: &str) -> bool {
        let lower = input.to_lowercase();
        match self {
            Channel::Text => matches!(lower.trim(), "yes" | "y" | "👍"),
            Channel::Voice => lower.contains("yes"),
        }
    }

    fn is_no(self, input: &str) -> bool {
        let lower = input.to_lowercase();
        match self {
            Channel::Text => matches!(lower.trim(), "no" | "n" | "👎"),
            Channel::Voice => lower.contains("no"),
        }
    }
}

pub fn system_prompt(bot_name: &str) -> String {
    format!(
        "You are {bot_name} 🤖, a friendly assistant for My Good Movers. \
         My Good Movers is a platform that connects users and moving companies. \
         Try to convince the user to take our services, and provide them with the estimated \
         cost of their move. Use emoticons to make your responses more friendly and engaging. \
         Keep your answers brief, no more than 2 short sentences."
    )
}

struct Turn<'a> {
    ctx: &'a ApiContext,
    channel: Channel,
    today: NaiveDate,
    session: &'a mut StoredSession,
    details: Option<MoveDetails>,
}

/// Handles one user turn and returns the assistant's reply.
pub async fn respond(
    ctx: &ApiContext,
    session: &mut StoredSession,
    channel: Channel,
    raw_input: &str,
    today: NaiveDate,
) -> Result<String> {
    let input = match channel {
        Channel::Text => sanitize_input(raw_input.trim()),
        Channel::Voice => raw_input.trim().to_string(),
    };
    let chat_id = session.chat_id.clone();
    ctx.storage
        .insert_message(&chat_id, Sender::User, &input)
        .await?;

    let details = ctx.storage.load_move_details(&chat_id).await?;
    let mut turn = Turn {
        ctx,
        channel,
        today,
        session,
        details,
    };
    let reply = turn.dispatch(&input).await?;

    ctx.storage.save_session(turn.session).await?;
    if let Some(details) = &turn.details {
        ctx.storage
            .save_move_details(&chat_id, details, turn.session.state)
            .await?;
    }
    ctx.storage
        .insert_message(&chat_id, Sender::Assistant, &reply)
        .await?;
    debug!(%chat_id, state = turn.session.state.as_str(), "turn handled");
    Ok(reply)
}

impl Turn<'_> {
    async fn dispatch(&mut self, input: &str) -> Result<String> {
        if is_faq_query(input) {
            return Ok(self
                .ctx
                .faq
                .find_best_match(self.ctx.model.as_ref(), input)
                .await?);
        }

        let state = self.session.state;
        if state.collects_move_details() {
            if let Some(reply) = self.collect_move_details(input).await? {
                return Ok(reply);
            }
            return self.general_reply(input).await;
        }

        match state {
            ChatState::CostEstimated => Ok(self.on_proceed_answer(input)),
            ChatState::AwaitingAdditionalServices => Ok(self.on_additional_services(input).await),
            ChatState::AwaitingEmail => Ok(self.on_email(input)),
            ChatState::AwaitingName => Ok(self.on_name(input)),
            ChatState::AwaitingContact => Ok(self.on_contact(input)),
            ChatState::AwaitingFinalConfirmation => Ok(self.on_final_confirmation(input)),
            _ => self.general_reply(input).await,
        }
    }

    /// Returns `None` when the turn mentions none of origin, destination, size or date.
    async fn collect_move_details(&mut self, input: &str) -> Result<Option<String>> {
        let fields = extract_move_fields(self.ctx.model.as_ref(), input).await?;
        if !fields.has_estimate_input() {
            return Ok(None);
        }

        let details = self.details.get_or_insert_with(MoveDetails::default);
        if fields.origin.is_some() {
            details.origin = fields.origin;
        }
        if fields.destination.is_some() {
            details.destination = fields.destination;
        }
        if fields.move_size.is_some() {
            details.move_size = fields.move_size;
        }
        let services: Vec<AdditionalService> = fields
            .additional_services
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        if !services.is_empty() {
            details.additional_services = services;
        }
        if fields.username.is_some() {
            details.username = fields.username;
        }
        if fields.contact_no.is_some() {
            details.contact_no = fields.contact_no;
        }
        if let Some(raw_date) = fields.move_date {
            match standardize_date(&raw_date, self.today) {
                Ok(date) => {
                    details.move_date = Some(date.clone());
                    self.session.move_date = Some(date);
                }
                Err(e) => return Ok(Some(format!("{e} Please provide a valid future date."))),
            }
        }

        let missing = details.missing_for_estimate();
        if !missing.is_empty() {
            return Ok(Some(format!(
                "I still need your {} to provide an estimate.",
                missing.join(", ")
            )));
        }

        let Some(range) = self.re_estimate().await else {
            return Ok(Some(ESTIMATE_FAILED_REPLY.to_string()));
        };
        self.session.state = ChatState::CostEstimated;

        let details = self.details.as_ref().cloned().unwrap_or_default();
        let lead = format!(
            "The estimated cost for moving from {} to {} ({}, date: {}) is between ${:.0} and ${:.0}. 🏠📦💰\n",
            title_case(details.origin.as_deref().unwrap_or_default()),
            title_case(details.destination.as_deref().unwrap_or_default()),
            title_case(details.move_size.as_deref().unwrap_or_default()),
            details.move_date.as_deref().unwrap_or_default(),
            range.min,
            range.max,
        );
        let ask = match self.channel {
            Channel::Text => "Would you like to proceed with booking this move? (Reply Yes/No) 👍👎",
            Channel::Voice => "Would you like to proceed with booking this move? Please say Yes or No.",
        };
        Ok(Some(format!("{lead}{ask}")))
    }

    /// Prices the current move details and records the range on success.
    async fn re_estimate(&mut self) -> Option<CostRange> {
        let details = self.details.as_mut()?;
        let request = EstimateRequest {
            origin: details.origin.clone().unwrap_or_default(),
            destination: details.destination.clone().unwrap_or_default(),
            move_size: details.move_size.clone().unwrap_or_default(),
            additional_services: details.additional_services.clone(),
            move_date: details.move_date.clone(),
        };
        match self.ctx.estimator.estimate(&request).await {
            Ok(range) => {
                details.estimated_cost = Some(range);
                self.session.estimated_cost = Some(range);
                Some(range)
            }
            Err(e) => {
                warn!(chat_id = %self.session.chat_id, error = %e, "estimate failed");
                None
            }
        }
    }

    fn on_proceed_answer(&mut self, input: &str) -> String {
        if self.channel.is_yes(input) {
            self.session.state = ChatState::AwaitingAdditionalServices;
            let costs = self
                .details
                .as_ref()
                .and_then(|d| d.move_size.as_deref())
                .and_then(|size| self.ctx.estimator.additional_service_costs(size).ok());
            return self.services_prompt(costs);
        }
        if self.channel.is_no(input) {
            self.session.state = ChatState::Initial;
            return DECLINED_REPLY.to_string();
        }
        PROCEED_REPROMPT.to_string()
    }

    fn services_prompt(&self, costs: Option<ServiceCosts>) -> String {
        match (self.channel, costs) {
            (Channel::Text, Some(c)) => format!(
                "Would you like any additional services such as packing (cost: ${:.0}) or storage \
                 (cost: ${:.0})? If yes, please specify them (e.g., 'only packing', 'yes storage', \
                 or 'packing, storage'). If not, type 'no'.",
                c.packing, c.storage
            ),
            (Channel::Voice, Some(c)) => format!(
                "Would you like any additional services such as packing (cost: ${:.0}) or storage \
                 (cost: ${:.0})? Please specify if you want packing, storage, or both. If not, say no.",
                c.packing, c.storage
            ),
            (Channel::Text, None) => "Would you like any additional services such as packing or \
                 storage? If yes, please specify them (e.g., packing, storage). If not, type 'no'."
                .to_string(),
            (Channel::Voice, None) => "Would you like any additional services such as packing or \
                 storage? Please specify, or say no."
                .to_string(),
        }
    }

    async fn on_additional_services(&mut self, input: &str) -> String {
        let Some(details) = self.details.as_mut() else {
            return NO_MOVE_DETAILS_REPLY.to_string();
        };
        let lower = input.trim().to_lowercase();
        let found = AdditionalService::scan(&lower);

        let lead = match self.channel {
            Channel::Text if matches!(lower.as_str(), "no" | "none") => {
                details.additional_services.clear();
                String::new()
            }
            Channel::Text if found.is_empty() => {
                return "Sorry, please respond again with valid additional services \
                        (e.g., packing, storage) or 'no'."
                    .to_string();
            }
            Channel::Text => {
                details.additional_services = found;
                String::new()
            }
            Channel::Voice if found.is_empty() => {
                details.additional_services.clear();
                "I didn't catch any specific additional service. I'll assume you don't want any \
                 additional services. "
                    .to_string()
            }
            Channel::Voice => {
                let chosen = found
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                details.additional_services = found;
                format!("Noted. You chose additional services: {chosen}. ")
            }
        };

        self.re_estimate().await;
        self.session.state = ChatState::AwaitingEmail;
        format!("{lead}{EMAIL_PROMPT}")
    }

    fn on_email(&mut self, input: &str) -> String {
        let Some(details) = self.details.as_mut() else {
            return NO_MOVE_DETAILS_REPLY.to_string();
        };
        let email = match self.channel {
            Channel::Text => match validate_email(input) {
                Ok(email) => email,
                Err(e) => {
                    debug!(error = %e, "rejected email");
                    return "Invalid email format. Please provide a valid email address.".to_string();
                }
            },
            Channel::Voice => input.trim().to_string(),
        };
        details.email = Some(email);
        self.session.state = ChatState::AwaitingName;
        NAME_PROMPT.to_string()
    }

    fn on_name(&mut self, input: &str) -> String {
        let name = input.trim();
        if name.is_empty() {
            return match self.channel {
                Channel::Text => "Please provide your name.",
                Channel::Voice => "I didn't catch your name. Please provide your name.",
            }
            .to_string();
        }
        self.session.username = Some(name.to_string());
        if let Some(details) = self.details.as_mut() {
            details.username = Some(name.to_string());
        }
        self.session.state = ChatState::AwaitingContact;
        CONTACT_PROMPT.to_string()
    }

    fn on_contact(&mut self, input: &str) -> String {
        let contact = match self.channel {
            Channel::Text => match normalize_contact_number(input) {
                Some(contact) => contact,
                None => {
                    return "Invalid contact number format. Please provide a valid 10-digit \
                            contact number."
                        .to_string()
                }
            },
            Channel::Voice => input.trim().to_string(),
        };
        self.session.contact_no = Some(contact.clone());
        if let Some(details) = self.details.as_mut() {
            details.contact_no = Some(contact);
        }
        self.session.state = ChatState::AwaitingFinalConfirmation;
        self.booking_summary()
    }

    fn booking_summary(&self) -> String {
        const NOT_PROVIDED: &str = "Not Provided";
        let details = self.details.clone().unwrap_or_default();
        let titled = |v: &Option<String>| {
            v.as_deref()
                .map(title_case)
                .unwrap_or_else(|| NOT_PROVIDED.to_string())
        };
        let plain = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_PROVIDED.to_string());
        let services = if details.additional_services.is_empty() {
            "None".to_string()
        } else {
            details
                .additional_services
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let cost = self
            .session
            .estimated_cost
            .map(|c| c.to_string())
            .unwrap_or_else(|| NOT_PROVIDED.to_string());

        match self.channel {
            Channel::Text => format!(
                "Here are your move details:\n\
                 📍 From: {}\n\
                 📍 To: {}\n\
                 🏠 Move Size: {}\n\
                 📅 Move Date: {}\n\
                 🔧 Additional Services: {services}\n\
                 📧 Email: {}\n\
                 💰 Estimated Cost: {cost}\n\
                 👤 Name: {}\n\
                 📞 Contact No: {}\n\n\
                 Do you confirm this booking? (Yes/No) 👍👎",
                titled(&details.origin),
                titled(&details.destination),
                titled(&details.move_size),
                plain(&details.move_date),
                plain(&details.email),
                plain(&self.session.username),
                plain(&self.session.contact_no),
            ),
            Channel::Voice => format!(
                "Here are your move details: From {}, To {}, Move Size {}, Move Date {}, \
                 Additional Services {services}, Email {}, Name {}, Contact Number {}. \
                 Do you confirm this booking? Please say Yes or No.",
                titled(&details.origin),
                titled(&details.destination),
                titled(&details.move_size),
                plain(&details.move_date),
                plain(&details.email),
                plain(&self.session.username),
                plain(&self.session.contact_no),
            ),
        }
    }

    fn on_final_confirmation(&mut self, input: &str) -> String {
        if self.channel.is_yes(input) {
            self.session.confirmed = true;
            self.session.is_active = false;
            self.session.state = ChatState::Confirmed;
            return match self.channel {
                Channel::Text => {
                    "Your move has been successfully confirmed! 🎉 Our team will be in touch soon."
                }
                Channel::Voice => {
                    "Your move has been successfully confirmed! Our team will be in touch soon."
                }
            }
            .to_string();
        }
        if self.channel.is_no(input) {
            self.session.state = ChatState::ModifyDetails;
            return match self.channel {
                Channel::Text => {
                    "I understand. Which details would you like to change? (e.g., new date, \
                     different origin/destination, etc.)"
                }
                Channel::Voice => {
                    "I understand. Which details would you like to change? For example, a new \
                     date or different origin/destination?"
                }
            }
            .to_string();
        }
        CONFIRM_REPROMPT.to_string()
    }

    /// Free-form answer from the model, primed with the stored chat history.
    async fn general_reply(&self, input: &str) -> Result<String> {
        let history = self
            .ctx
            .storage
            .list_messages(&self.session.chat_id)
            .await?
            .into_iter()
            .map(|m| format!("{}: {}", m.sender.label(), m.text))
            .collect::<Vec<_>>()
            .join("\n");
        let user_content = format!("Chat History:\n{history}\nUser: {input}");
        let mut prompt = system_prompt(&self.session.bot_name);
        if self.channel == Channel::Voice {
            if let Some(language) = non_english_language(input) {
                debug!(chat_id = %self.session.chat_id, language, "caller is not speaking English");
                prompt = respond_in(language, &prompt);
            }
        }
        Ok(self.ctx.model.complete(&prompt, &user_content).await?)
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
