use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{CallPlacer, PlacedCall, TelephonyError};

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwilioConfig {
    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    pub fn check(&self) -> Result<(), TelephonyError> {
        if self.account_sid.trim().is_empty() {
            return Err(TelephonyError::NotConfigured("missing account sid"));
        }
        if self.auth_token.trim().is_empty() {
            return Err(TelephonyError::NotConfigured("missing auth token"));
        }
        if self.from_number.trim().is_empty() {
            return Err(TelephonyError::NotConfigured("missing caller number"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

pub struct TwilioClient {
    http: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CallPlacer for TwilioClient {
    async fn place_call(&self, to: &str, answer_url: &str) -> Result<PlacedCall, TelephonyError> {
        self.config.check()?;

        let response = self
            .http
            .post(self.config.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Url", answer_url),
                ("Method", "POST"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioErrorBody>(&raw)
                .map(|body| match body.code {
                    Some(code) => format!("{} (code {code})", body.message),
                    None => body.message,
                })
                .unwrap_or_else(|_| format!("twilio returned HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "twilio rejected outbound call");
            return Err(TelephonyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallResource = response.json().await?;
        info!(call_sid = %call.sid, status = ?call.status, "outbound call queued");
        Ok(PlacedCall {
            call_sid: call.sid,
            status: call.status,
        })
    }
}

#[cfg(test)]
#[path = "tests/twilio_tests.rs"]
mod tests;
