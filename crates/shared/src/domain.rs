use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(MessageId);
id_newtype!(CallRecordId);

/// Conversation key. Text chats use a random UUID, voice chats use the Twilio `CallSid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseDomainError {
    pub kind: &'static str,
    pub value: String,
}

/// Dialing prefixes offered by the call form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountryCode {
    #[default]
    #[serde(rename = "+1")]
    NorthAmerica,
    #[serde(rename = "+44")]
    UnitedKingdom,
    #[serde(rename = "+91")]
    India,
    #[serde(rename = "+61")]
    Australia,
    #[serde(rename = "+92")]
    Pakistan,
}

impl CountryCode {
    pub const ALL: [CountryCode; 5] = [
        CountryCode::NorthAmerica,
        CountryCode::UnitedKingdom,
        CountryCode::India,
        CountryCode::Australia,
        CountryCode::Pakistan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CountryCode::NorthAmerica => "+1",
            CountryCode::UnitedKingdom => "+44",
            CountryCode::India => "+91",
            CountryCode::Australia => "+61",
            CountryCode::Pakistan => "+92",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        CountryCode::ALL
            .into_iter()
            .find(|code| &code.as_str()[1..] == digits)
            .ok_or_else(|| ParseDomainError {
                kind: "country code",
                value: s.to_string(),
            })
    }
}

/// One labelled entry of the country selector. United States and Canada share `+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryOption {
    pub label: &'static str,
    pub code: CountryCode,
}

pub const COUNTRY_OPTIONS: [CountryOption; 6] = [
    CountryOption {
        label: "United States",
        code: CountryCode::NorthAmerica,
    },
    CountryOption {
        label: "Canada",
        code: CountryCode::NorthAmerica,
    },
    CountryOption {
        label: "United Kingdom",
        code: CountryCode::UnitedKingdom,
    },
    CountryOption {
        label: "India",
        code: CountryCode::India,
    },
    CountryOption {
        label: "Australia",
        code: CountryCode::Australia,
    },
    CountryOption {
        label: "Pakistan",
        code: CountryCode::Pakistan,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    #[default]
    Initial,
    CostEstimated,
    AwaitingAdditionalServices,
    AwaitingEmail,
    AwaitingName,
    AwaitingContact,
    AwaitingFinalConfirmation,
    ModifyDetails,
    Confirmed,
}

impl ChatState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatState::Initial => "initial",
            ChatState::CostEstimated => "cost_estimated",
            ChatState::AwaitingAdditionalServices => "awaiting_additional_services",
            ChatState::AwaitingEmail => "awaiting_email",
            ChatState::AwaitingName => "awaiting_name",
            ChatState::AwaitingContact => "awaiting_contact",
            ChatState::AwaitingFinalConfirmation => "awaiting_final_confirmation",
            ChatState::ModifyDetails => "modify_details",
            ChatState::Confirmed => "confirmed",
        }
    }

    /// States in which free text is scanned for origin, destination, size and date.
    pub fn collects_move_details(self) -> bool {
        matches!(self, ChatState::Initial | ChatState::ModifyDetails)
    }
}

impl FromStr for ChatState {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "initial" => ChatState::Initial,
            "cost_estimated" => ChatState::CostEstimated,
            "awaiting_additional_services" => ChatState::AwaitingAdditionalServices,
            "awaiting_email" => ChatState::AwaitingEmail,
            "awaiting_name" => ChatState::AwaitingName,
            "awaiting_contact" => ChatState::AwaitingContact,
            "awaiting_final_confirmation" => ChatState::AwaitingFinalConfirmation,
            "modify_details" => ChatState::ModifyDetails,
            "confirmed" => ChatState::Confirmed,
            other => {
                return Err(ParseDomainError {
                    kind: "chat state",
                    value: other.to_string(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalService {
    Packing,
    Storage,
}

impl AdditionalService {
    pub fn as_str(self) -> &'static str {
        match self {
            AdditionalService::Packing => "packing",
            AdditionalService::Storage => "storage",
        }
    }

    /// Services mentioned anywhere in `text`, in canonical order.
    pub fn scan(text: &str) -> Vec<AdditionalService> {
        let lower = text.to_lowercase();
        [AdditionalService::Packing, AdditionalService::Storage]
            .into_iter()
            .filter(|service| lower.contains(service.as_str()))
            .collect()
    }
}

impl FromStr for AdditionalService {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "packing" => Ok(AdditionalService::Packing),
            "storage" => Ok(AdditionalService::Storage),
            _ => Err(ParseDomainError {
                kind: "additional service",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRange {
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for CostRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.0} - ${:.0}", self.min, self.max)
    }
}

/// Everything collected about a move so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveDetails {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub move_size: Option<String>,
    pub move_date: Option<String>,
    pub additional_services: Vec<AdditionalService>,
    pub username: Option<String>,
    pub contact_no: Option<String>,
    pub email: Option<String>,
    pub estimated_cost: Option<CostRange>,
}

impl MoveDetails {
    pub fn missing_for_estimate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.origin.is_none() {
            missing.push("origin");
        }
        if self.destination.is_none() {
            missing.push("destination");
        }
        if self.move_size.is_none() {
            missing.push("move size");
        }
        if self.move_date.is_none() {
            missing.push("move date");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_defaults_to_first_selector_option() {
        assert_eq!(CountryCode::default(), COUNTRY_OPTIONS[0].code);
        assert_eq!(CountryCode::default().as_str(), "+1");
    }

    #[test]
    fn country_code_parses_with_or_without_plus() {
        assert_eq!("+91".parse::<CountryCode>(), Ok(CountryCode::India));
        assert_eq!("44".parse::<CountryCode>(), Ok(CountryCode::UnitedKingdom));
        assert!("+7".parse::<CountryCode>().is_err());
    }

    #[test]
    fn united_states_and_canada_share_a_code() {
        let north_america: Vec<_> = COUNTRY_OPTIONS
            .iter()
            .filter(|option| option.code == CountryCode::NorthAmerica)
            .map(|option| option.label)
            .collect();
        assert_eq!(north_america, vec!["United States", "Canada"]);
    }

    #[test]
    fn chat_state_string_form_is_stable() {
        for state in [
            ChatState::Initial,
            ChatState::CostEstimated,
            ChatState::AwaitingAdditionalServices,
            ChatState::AwaitingEmail,
            ChatState::AwaitingName,
            ChatState::AwaitingContact,
            ChatState::AwaitingFinalConfirmation,
            ChatState::ModifyDetails,
            ChatState::Confirmed,
        ] {
            assert_eq!(state.as_str().parse::<ChatState>(), Ok(state));
        }
    }

    #[test]
    fn scans_services_case_insensitively() {
        assert_eq!(
            AdditionalService::scan("Storage and PACKING please"),
            vec![AdditionalService::Packing, AdditionalService::Storage]
        );
        assert!(AdditionalService::scan("nothing else").is_empty());
    }

    #[test]
    fn lists_missing_estimate_fields_in_order() {
        let details = MoveDetails {
            origin: Some("austin".into()),
            move_date: Some("2030-01-01".into()),
            ..MoveDetails::default()
        };
        assert_eq!(details.missing_for_estimate(), vec!["destination", "move size"]);
    }
}
