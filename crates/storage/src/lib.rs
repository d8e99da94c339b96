use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    AdditionalService, CallRecordId, ChatId, ChatState, CostRange, MessageId, MoveDetails, Sender,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub chat_id: ChatId,
    pub bot_name: String,
    pub username: Option<String>,
    pub contact_no: Option<String>,
    pub move_date: Option<String>,
    pub estimated_cost: Option<CostRange>,
    pub confirmed: bool,
    pub is_active: bool,
    pub state: ChatState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredCallRecord {
    pub record_id: CallRecordId,
    pub call_sid: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a session unless one already exists for `chat_id`. Returns whether a row was
    /// created.
    pub async fn create_session(
        &self,
        chat_id: &ChatId,
        bot_name: &str,
        state: ChatState,
    ) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO chat_sessions (chat_id, bot_name, state) VALUES (?, ?, ?)
             ON CONFLICT(chat_id) DO NOTHING",
        )
        .bind(chat_id.as_str())
        .bind(bot_name)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    pub async fn load_session(&self, chat_id: &ChatId) -> Result<Option<StoredSession>> {
        let row = sqlx::query(
            "SELECT chat_id, bot_name, username, contact_no, move_date, estimated_cost_min,
                    estimated_cost_max, confirmed, is_active, state, created_at
             FROM chat_sessions WHERE chat_id = ?",
        )
        .bind(chat_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| session_from_row(&r)).transpose()
    }

    /// Writes every mutable column of the session back.
    pub async fn save_session(&self, session: &StoredSession) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE chat_sessions
             SET username = ?, contact_no = ?, move_date = ?, estimated_cost_min = ?,
                 estimated_cost_max = ?, confirmed = ?, is_active = ?, state = ?
             WHERE chat_id = ?",
        )
        .bind(session.username.as_deref())
        .bind(session.contact_no.as_deref())
        .bind(session.move_date.as_deref())
        .bind(session.estimated_cost.map(|c| c.min))
        .bind(session.estimated_cost.map(|c| c.max))
        .bind(session.confirmed)
        .bind(session.is_active)
        .bind(session.state.as_str())
        .bind(session.chat_id.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if affected == 0 {
            anyhow::bail!("chat session {} does not exist", session.chat_id);
        }
        Ok(())
    }

    pub async fn deactivate_session(&self, chat_id: &ChatId) -> Result<bool> {
        let affected = sqlx::query("UPDATE chat_sessions SET is_active = 0 WHERE chat_id = ?")
            .bind(chat_id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    /// Deactivates active sessions created more than `max_age_hours` ago.
    pub async fn deactivate_sessions_older_than(&self, max_age_hours: i64) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE chat_sessions SET is_active = 0
             WHERE is_active = 1 AND created_at < datetime('now', ?)",
        )
        .bind(format!("-{max_age_hours} hours"))
        .execute(&self.pool)
        .await
        .context("failed to deactivate stale chat sessions")?
        .rows_affected();
        Ok(affected)
    }

    pub async fn insert_message(
        &self,
        chat_id: &ChatId,
        sender: Sender,
        text: &str,
    ) -> Result<MessageId> {
        let rec = sqlx::query(
            "INSERT INTO messages (chat_id, sender, message) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(chat_id.as_str())
        .bind(sender.as_str())
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(MessageId(rec.get::<i64, _>(0)))
    }

    pub async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender, message, created_at
             FROM messages
             WHERE chat_id = ?
             ORDER BY id ASC",
        )
        .bind(chat_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StoredMessage {
                message_id: MessageId(r.get::<i64, _>(0)),
                chat_id: ChatId(r.get::<String, _>(1)),
                sender: match r.get::<String, _>(2).as_str() {
                    "user" => Sender::User,
                    _ => Sender::Assistant,
                },
                text: r.get::<String, _>(3),
                created_at: r.get::<DateTime<Utc>, _>(4),
            })
            .collect())
    }

    pub async fn load_move_details(&self, chat_id: &ChatId) -> Result<Option<MoveDetails>> {
        let row = sqlx::query(
            "SELECT origin, destination, move_size, additional_services, move_date, username,
                    contact_no, email, estimated_cost_min, estimated_cost_max
             FROM move_details WHERE chat_id = ?",
        )
        .bind(chat_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| MoveDetails {
            origin: r.get::<Option<String>, _>(0),
            destination: r.get::<Option<String>, _>(1),
            move_size: r.get::<Option<String>, _>(2),
            additional_services: r
                .get::<String, _>(3)
                .split(',')
                .filter_map(|s| s.parse::<AdditionalService>().ok())
                .collect(),
            move_date: r.get::<Option<String>, _>(4),
            username: r.get::<Option<String>, _>(5),
            contact_no: r.get::<Option<String>, _>(6),
            email: r.get::<Option<String>, _>(7),
            estimated_cost: cost_range(r.get::<Option<f64>, _>(8), r.get::<Option<f64>, _>(9)),
        }))
    }

    pub async fn save_move_details(
        &self,
        chat_id: &ChatId,
        details: &MoveDetails,
        state: ChatState,
    ) -> Result<()> {
        let services = details
            .additional_services
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        sqlx::query(
            "INSERT INTO move_details (chat_id, origin, destination, move_size, additional_services,
                                       move_date, username, contact_no, email,
                                       estimated_cost_min, estimated_cost_max, state)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET
                origin = excluded.origin,
                destination = excluded.destination,
                move_size = excluded.move_size,
                additional_services = excluded.additional_services,
                move_date = excluded.move_date,
                username = excluded.username,
                contact_no = excluded.contact_no,
                email = excluded.email,
                estimated_cost_min = excluded.estimated_cost_min,
                estimated_cost_max = excluded.estimated_cost_max,
                state = excluded.state",
        )
        .bind(chat_id.as_str())
        .bind(details.origin.as_deref())
        .bind(details.destination.as_deref())
        .bind(details.move_size.as_deref())
        .bind(services)
        .bind(details.move_date.as_deref())
        .bind(details.username.as_deref())
        .bind(details.contact_no.as_deref())
        .bind(details.email.as_deref())
        .bind(details.estimated_cost.map(|c| c.min))
        .bind(details.estimated_cost.map(|c| c.max))
        .bind(state.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save move details for {chat_id}"))?;
        Ok(())
    }

    pub async fn insert_call_record(
        &self,
        call_sid: &str,
        phone_number: &str,
    ) -> Result<CallRecordId> {
        let rec = sqlx::query(
            "INSERT INTO call_records (call_sid, phone_number) VALUES (?, ?)
             ON CONFLICT(call_sid) DO UPDATE SET phone_number = excluded.phone_number
             RETURNING id",
        )
        .bind(call_sid)
        .bind(phone_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(CallRecordId(rec.get::<i64, _>(0)))
    }

    pub async fn load_call_record(&self, call_sid: &str) -> Result<Option<StoredCallRecord>> {
        let row = sqlx::query(
            "SELECT id, call_sid, phone_number, created_at FROM call_records WHERE call_sid = ?",
        )
        .bind(call_sid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredCallRecord {
            record_id: CallRecordId(r.get::<i64, _>(0)),
            call_sid: r.get::<String, _>(1),
            phone_number: r.get::<String, _>(2),
            created_at: r.get::<DateTime<Utc>, _>(3),
        }))
    }
}

fn session_from_row(r: &SqliteRow) -> Result<StoredSession> {
    let state = r
        .get::<String, _>(9)
        .parse::<ChatState>()
        .context("corrupt chat session state")?;
    Ok(StoredSession {
        chat_id: ChatId(r.get::<String, _>(0)),
        bot_name: r.get::<String, _>(1),
        username: r.get::<Option<String>, _>(2),
        contact_no: r.get::<Option<String>, _>(3),
        move_date: r.get::<Option<String>, _>(4),
        estimated_cost: cost_range(r.get::<Option<f64>, _>(5), r.get::<Option<f64>, _>(6)),
        confirmed: r.get::<bool, _>(7),
        is_active: r.get::<bool, _>(8),
        state,
        created_at: r.get::<DateTime<Utc>, _>(10),
    })
}

fn cost_range(min: Option<f64>, max: Option<f64>) -> Option<CostRange> {
    match (min, max) {
        (Some(min), Some(max)) => Some(CostRange { min, max }),
        _ => None,
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
