use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use assistant::OpenAiConfig;
use telephony::{TwilioConfig, DEFAULT_TWILIO_API_BASE};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub server_public_url: String,
    pub twilio: TwilioConfig,
    pub openai: OpenAiConfig,
    pub faq_dataset_path: PathBuf,
    pub faq_cache_path: PathBuf,
    pub session_ttl_hours: i64,
    pub sweep_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/movecall.db".into(),
            server_public_url: "http://127.0.0.1:8080".into(),
            twilio: TwilioConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                from_number: String::new(),
                api_base: DEFAULT_TWILIO_API_BASE.into(),
            },
            openai: OpenAiConfig::default(),
            faq_dataset_path: PathBuf::from("data/faqs.jsonl"),
            faq_cache_path: PathBuf::from("data/faq_embeddings.json"),
            session_ttl_hours: 24,
            sweep_interval_secs: 3600,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then `file` when present, then environment. Credentials are only read from
/// the environment.
pub fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<toml::Table>(&raw) {
            Ok(table) => {
                let file_cfg: HashMap<String, String> = table
                    .into_iter()
                    .map(|(k, v)| {
                        let v = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                        (k, v)
                    })
                    .collect();
                apply(&mut settings, |key| file_cfg.get(key).cloned());
            }
            Err(error) => warn!(path = %file.display(), %error, "ignoring unreadable config file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("SERVER_PUBLIC_URL") {
        settings.server_public_url = v;
    }

    if let Some(v) = env("TWILIO_ACCOUNT_SID") {
        settings.twilio.account_sid = v;
    }
    if let Some(v) = env("TWILIO_AUTH_TOKEN") {
        settings.twilio.auth_token = v;
    }
    if let Some(v) = env("TWILIO_PHONE_NUMBER") {
        settings.twilio.from_number = v;
    }
    if let Some(v) = env("TWILIO_API_BASE") {
        settings.twilio.api_base = v;
    }

    if let Some(v) = env("OPENAI_API_KEY") {
        settings.openai.api_key = v;
    }
    if let Some(v) = env("OPENAI_BASE_URL") {
        settings.openai.base_url = v;
    }
    if let Some(v) = env("OPENAI_CHAT_MODEL") {
        settings.openai.chat_model = v;
    }
    if let Some(v) = env("OPENAI_EMBEDDING_MODEL") {
        settings.openai.embedding_model = v;
    }

    if let Some(v) = env("FAQ_DATASET_PATH") {
        settings.faq_dataset_path = PathBuf::from(v);
    }
    if let Some(v) = env("FAQ_CACHE_PATH") {
        settings.faq_cache_path = PathBuf::from(v);
    }
    if let Some(parsed) = env("SESSION_TTL_HOURS").and_then(|v| positive_hours(&v)) {
        settings.session_ttl_hours = parsed;
    }
    if let Some(v) = env("SWEEP_INTERVAL_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.sweep_interval_secs = parsed;
        }
    }

    settings
}

fn apply(settings: &mut Settings, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = get("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = get("server_public_url") {
        settings.server_public_url = v;
    }
    if let Some(v) = get("twilio_api_base") {
        settings.twilio.api_base = v;
    }
    if let Some(v) = get("openai_base_url") {
        settings.openai.base_url = v;
    }
    if let Some(v) = get("openai_chat_model") {
        settings.openai.chat_model = v;
    }
    if let Some(v) = get("openai_embedding_model") {
        settings.openai.embedding_model = v;
    }
    if let Some(v) = get("faq_dataset_path") {
        settings.faq_dataset_path = PathBuf::from(v);
    }
    if let Some(v) = get("faq_cache_path") {
        settings.faq_cache_path = PathBuf::from(v);
    }
    if let Some(parsed) = get("session_ttl_hours").and_then(|v| positive_hours(&v)) {
        settings.session_ttl_hours = parsed;
    }
    if let Some(parsed) = get("sweep_interval_secs").and_then(|v| v.parse().ok()) {
        settings.sweep_interval_secs = parsed;
    }
}

/// A session TTL of zero or less would expire every session on the first sweep.
fn positive_hours(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(hours) if hours > 0 => Some(hours),
        Ok(hours) => {
            warn!(hours, "ignoring non-positive session TTL");
            None
        }
        Err(_) => None,
    }
}

/// Twilio fetches call instructions from this URL, so it must be absolute http(s).
pub fn check_public_url(raw: &str) -> anyhow::Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .with_context(|| format!("server public url '{raw}' is not an absolute URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        anyhow::bail!("server public url '{raw}' must be an http(s) URL with a host");
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
