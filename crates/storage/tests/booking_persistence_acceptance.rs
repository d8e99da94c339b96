use shared::domain::{AdditionalService, ChatId, ChatState, CostRange, MoveDetails, Sender};
use storage::Storage;

#[tokio::test]
async fn confirmed_booking_survives_reopening_the_database() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("movecall_booking_acceptance_{suffix}"));
    let database_url = format!(
        "sqlite://{}",
        temp_root
            .join("bookings.db")
            .to_string_lossy()
            .replace('\\', "/")
    );
    let chat_id = ChatId("CA-acceptance".into());

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage
            .create_session(&chat_id, "Max", ChatState::Initial)
            .await
            .expect("session");
        storage
            .insert_message(&chat_id, Sender::User, "2 bedroom from austin to denver")
            .await
            .expect("message");

        let details = MoveDetails {
            origin: Some("austin".into()),
            destination: Some("denver".into()),
            move_size: Some("2 bedroom".into()),
            move_date: Some("2031-05-01".into()),
            additional_services: vec![AdditionalService::Storage],
            username: Some("Dana".into()),
            contact_no: Some("5125550100".into()),
            email: Some("dana@example.org".into()),
            estimated_cost: Some(CostRange {
                min: 1275.0,
                max: 1725.0,
            }),
        };
        storage
            .save_move_details(&chat_id, &details, ChatState::Confirmed)
            .await
            .expect("details");

        let mut session = storage
            .load_session(&chat_id)
            .await
            .expect("load")
            .expect("session");
        session.state = ChatState::Confirmed;
        session.confirmed = true;
        session.is_active = false;
        session.estimated_cost = details.estimated_cost;
        storage.save_session(&session).await.expect("save");
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let session = reopened
        .load_session(&chat_id)
        .await
        .expect("load")
        .expect("session");
    assert!(session.confirmed);
    assert!(!session.is_active);
    assert_eq!(session.state, ChatState::Confirmed);

    let details = reopened
        .load_move_details(&chat_id)
        .await
        .expect("load")
        .expect("details");
    assert_eq!(details.additional_services, vec![AdditionalService::Storage]);
    assert_eq!(reopened.list_messages(&chat_id).await.expect("messages").len(), 1);

    drop(reopened);
    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
