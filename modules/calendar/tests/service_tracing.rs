//! Service operations run under their tracing spans without disturbing results.

mod common;

use chrono::Duration;
use tracing_test::traced_test;
use uuid::Uuid;

use calendar::contract::model::{EventUpdate, Recipient};
use common::{new_event, recurring, Harness};

#[traced_test]
#[tokio::test]
async fn register_user_emits_spans() {
    // Arrange
    let h = Harness::new();

    // Act
    let result = h
        .service()
        .register_user(common::new_user("Grace", "grace@example.com"))
        .await;

    // Assert
    assert!(result.is_ok());
    tracing::info!("registration finished");
    assert!(logs_contain("registration finished"));
}

#[traced_test]
#[tokio::test]
async fn create_and_share_emits_spans() {
    // Arrange
    let h = Harness::new();
    let grace = h.register("Grace", "grace@example.com").await;

    // Act
    let result = h
        .service()
        .create_and_share_event(recurring(new_event(grace.id, Duration::hours(2)), "weekly", 2))
        .await;

    // Assert
    let series = result.unwrap();
    assert_eq!(series.children.len(), 2);
}

#[traced_test]
#[tokio::test]
async fn update_and_delete_emit_spans() {
    // Arrange
    let h = Harness::new();
    let grace = h.register("Grace", "grace@example.com").await;
    let alan = h.register("Alan", "alan@example.com").await;
    let svc = h.service();
    let event = svc
        .create_event(new_event(grace.id, Duration::hours(2)))
        .await
        .unwrap();

    // Act
    let updated = svc
        .update_event(
            event.id,
            EventUpdate {
                title: "Design review".into(),
                description: event.description.clone(),
                start_time: event.start_time,
                end_time: event.end_time,
                location: event.location.clone(),
                reminder: 30,
                is_recurring: false,
                recurrence_frequency: None,
                shared_with: vec![Recipient::Email("alan@example.com".into())],
            },
        )
        .await;
    let deleted = svc.delete_event(event.id).await;

    // Assert
    assert_eq!(updated.unwrap().shared_with, vec![alan.id]);
    assert!(deleted.is_ok());
}

#[traced_test]
#[tokio::test]
async fn dispatcher_tick_emits_spans() {
    // Arrange
    let h = Harness::new();
    h.service()
        .create_notification(Uuid::new_v4(), "Event Reminder", "Soon", common::epoch())
        .await
        .unwrap();

    // Act
    let report = h.module.dispatcher().tick().await;

    // Assert
    assert_eq!(report.unwrap().sent, 1);
}

#[traced_test]
#[tokio::test]
async fn failed_lookup_emits_spans() {
    // Arrange
    let h = Harness::new();

    // Act
    let result = h.service().get_event_by_id(Uuid::new_v4()).await;

    // Assert
    assert!(result.is_err());
}
