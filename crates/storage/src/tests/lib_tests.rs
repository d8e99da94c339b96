use super::*;

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory_storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("movecall_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn create_session_is_idempotent_per_chat_id() {
    let storage = memory_storage().await;
    let chat_id = ChatId("CA-idempotent".into());

    assert!(storage
        .create_session(&chat_id, "Max", ChatState::Initial)
        .await
        .expect("create"));
    assert!(!storage
        .create_session(&chat_id, "Sam", ChatState::Initial)
        .await
        .expect("create again"));

    let session = storage
        .load_session(&chat_id)
        .await
        .expect("load")
        .expect("session exists");
    assert_eq!(session.bot_name, "Max");
    assert_eq!(session.state, ChatState::Initial);
    assert!(session.is_active);
    assert!(!session.confirmed);
}

#[tokio::test]
async fn save_session_round_trips_mutable_fields() {
    let storage = memory_storage().await;
    let chat_id = ChatId::generate();
    storage
        .create_session(&chat_id, "Max", ChatState::Initial)
        .await
        .expect("create");

    let mut session = storage
        .load_session(&chat_id)
        .await
        .expect("load")
        .expect("session");
    session.username = Some("Dana".into());
    session.estimated_cost = Some(CostRange {
        min: 850.0,
        max: 1150.0,
    });
    session.state = ChatState::AwaitingFinalConfirmation;
    storage.save_session(&session).await.expect("save");

    let reloaded = storage
        .load_session(&chat_id)
        .await
        .expect("load")
        .expect("session");
    assert_eq!(reloaded.username.as_deref(), Some("Dana"));
    assert_eq!(reloaded.estimated_cost, session.estimated_cost);
    assert_eq!(reloaded.state, ChatState::AwaitingFinalConfirmation);
}

#[tokio::test]
async fn save_session_rejects_unknown_chat() {
    let storage = memory_storage().await;
    let session = StoredSession {
        chat_id: ChatId("missing".into()),
        bot_name: "Max".into(),
        username: None,
        contact_no: None,
        move_date: None,
        estimated_cost: None,
        confirmed: false,
        is_active: true,
        state: ChatState::Initial,
        created_at: Utc::now(),
    };
    assert!(storage.save_session(&session).await.is_err());
}

#[tokio::test]
async fn messages_are_listed_in_insertion_order() {
    let storage = memory_storage().await;
    let chat_id = ChatId::generate();
    storage
        .create_session(&chat_id, "Max", ChatState::Initial)
        .await
        .expect("create");

    storage
        .insert_message(&chat_id, Sender::Assistant, "hello")
        .await
        .expect("first");
    storage
        .insert_message(&chat_id, Sender::User, "moving to denver")
        .await
        .expect("second");

    let messages = storage.list_messages(&chat_id).await.expect("list");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::Assistant);
    assert_eq!(messages[1].text, "moving to denver");
    assert!(messages[0].message_id.0 < messages[1].message_id.0);
}

#[tokio::test]
async fn move_details_upsert_keeps_one_row_per_chat() {
    let storage = memory_storage().await;
    let chat_id = ChatId::generate();
    storage
        .create_session(&chat_id, "Max", ChatState::Initial)
        .await
        .expect("create");

    assert!(storage
        .load_move_details(&chat_id)
        .await
        .expect("load")
        .is_none());

    let mut details = MoveDetails {
        origin: Some("austin".into()),
        ..MoveDetails::default()
    };
    storage
        .save_move_details(&chat_id, &details, ChatState::Initial)
        .await
        .expect("insert");

    details.destination = Some("denver".into());
    details.additional_services = vec![AdditionalService::Packing, AdditionalService::Storage];
    storage
        .save_move_details(&chat_id, &details, ChatState::CostEstimated)
        .await
        .expect("update");

    let loaded = storage
        .load_move_details(&chat_id)
        .await
        .expect("load")
        .expect("details");
    assert_eq!(loaded, details);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM move_details WHERE chat_id = ?")
        .bind(chat_id.as_str())
        .fetch_one(storage.pool())
        .await
        .expect("count");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn sweeps_only_sessions_past_the_cutoff() {
    let storage = memory_storage().await;
    let stale = ChatId("stale".into());
    let fresh = ChatId("fresh".into());
    for chat_id in [&stale, &fresh] {
        storage
            .create_session(chat_id, "Max", ChatState::Initial)
            .await
            .expect("create");
    }
    sqlx::query("UPDATE chat_sessions SET created_at = datetime('now', '-48 hours') WHERE chat_id = ?")
        .bind(stale.as_str())
        .execute(storage.pool())
        .await
        .expect("backdate");

    let swept = storage
        .deactivate_sessions_older_than(24)
        .await
        .expect("sweep");
    assert_eq!(swept, 1);

    let stale_session = storage.load_session(&stale).await.expect("load").expect("stale");
    let fresh_session = storage.load_session(&fresh).await.expect("load").expect("fresh");
    assert!(!stale_session.is_active);
    assert!(fresh_session.is_active);

    let swept_again = storage
        .deactivate_sessions_older_than(24)
        .await
        .expect("sweep");
    assert_eq!(swept_again, 0);
}

#[tokio::test]
async fn call_records_are_keyed_by_sid() {
    let storage = memory_storage().await;
    let first = storage
        .insert_call_record("CA123", "+915551234")
        .await
        .expect("insert");
    let again = storage
        .insert_call_record("CA123", "+915551234")
        .await
        .expect("insert again");
    assert_eq!(first, again);

    let record = storage
        .load_call_record("CA123")
        .await
        .expect("load")
        .expect("record");
    assert_eq!(record.phone_number, "+915551234");
    assert!(storage
        .load_call_record("CA404")
        .await
        .expect("load")
        .is_none());
}
