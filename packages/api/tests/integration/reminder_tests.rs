//! Device registration, reminder scheduling and dispatch tests.

use std::time::Duration;

use api::config::Settings;
use api::models::{NewReminder, ReminderStatus};
use api::reminders::{
    dispatch_reminder, run_due_reminders, spawn_scheduler, DispatchError, NOTIFICATION_TITLE,
};
use axum::http::{Method, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tokio::sync::watch;
use uuid::Uuid;

use super::common::{TestApp, DEVICE_TOKEN};

async fn register_device(app: &TestApp, cookie: &str) {
    let response = app
        .post("/api/devices", json!({"token": DEVICE_TOKEN}), Some(cookie))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

async fn schedule(app: &TestApp, cookie: &str) -> String {
    let time = (Utc::now() + ChronoDuration::hours(2)).format("%Y-%m-%dT%H:%M");
    let response = app
        .post(
            "/api/reminders",
            json!({"name": "Sam", "medicine": "Sertraline", "time": time.to_string()}),
            Some(cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["id"].as_str().unwrap().to_string()
}

/// Store a reminder that is already due, bypassing the future-time check.
async fn insert_due(app: &TestApp, user_id: Uuid) -> Uuid {
    app.state
        .store
        .create_reminder(NewReminder {
            user_id,
            name: "Sam".into(),
            medicine: "Sertraline".into(),
            remind_at: Utc::now() - ChronoDuration::minutes(1),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_device_token_registration_is_idempotent() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;

    let short = app
        .post("/api/devices", json!({"token": "abc"}), Some(&cookie))
        .await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);

    register_device(&app, &cookie).await;
    register_device(&app, &cookie).await;

    let user_id = app.user_id(&cookie).await;
    let user = app.state.store.get_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.push_tokens, vec![DEVICE_TOKEN.to_string()]);

    let removed = app
        .request(
            Method::DELETE,
            "/api/devices",
            Some(json!({"token": DEVICE_TOKEN})),
            Some(&cookie),
        )
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let user = app.state.store.get_user(user_id).await.unwrap().unwrap();
    assert!(user.push_tokens.is_empty());
}

#[tokio::test]
async fn test_create_reminder_validation_messages() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;

    let missing = app
        .post("/api/reminders", json!({"name": "Sam", "time": "2030-01-01T08:00"}), Some(&cookie))
        .await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.body["message"], "All fields are required");

    let bad_format = app
        .post(
            "/api/reminders",
            json!({"name": "Sam", "medicine": "Aspirin", "time": "8am tomorrow"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(bad_format.body["message"], "Invalid time format! Use YYYY-MM-DDTHH:MM");

    let past = app
        .post(
            "/api/reminders",
            json!({"name": "Sam", "medicine": "Aspirin", "time": "2001-01-01T08:00"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(past.body["message"], "Reminder time must be in the future");
}

#[tokio::test]
async fn test_created_reminder_is_scheduled_and_listed() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    let other = app.register("other@example.org").await;

    let id = schedule(&app, &cookie).await;

    let listed = app.get("/api/reminders", Some(&cookie)).await;
    let reminders = listed.body.as_array().unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0]["status"], "scheduled");
    assert_eq!(reminders[0]["attempts"], 0);

    let uri = format!("/api/reminders/{}", id);
    assert_eq!(app.delete(&uri, Some(&other)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&cookie)).await.status, StatusCode::NO_CONTENT);
    assert!(app
        .get("/api/reminders", Some(&cookie))
        .await
        .body
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_send_delivers_once() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    register_device(&app, &cookie).await;
    let id = schedule(&app, &cookie).await;
    let uri = format!("/api/reminders/{}/send", id);

    let sent = app.post(&uri, json!({}), Some(&cookie)).await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body["status"], "sent");
    // Only failed deliveries count as attempts.
    assert_eq!(sent.body["attempts"], 0);

    let messages = app.push.sent();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].title, NOTIFICATION_TITLE);
    assert_eq!(messages[0].token, DEVICE_TOKEN);
    assert!(messages[0].body.contains("Sam"));
    assert!(messages[0].body.contains("Sertraline"));

    let again = app.post(&uri, json!({}), Some(&cookie)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(app.push.sent().len(), 1);
}

#[tokio::test]
async fn test_send_error_cases() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    let other = app.register("other@example.org").await;

    let missing = app
        .post(&format!("/api/reminders/{}/send", Uuid::new_v4()), json!({}), Some(&cookie))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Document not found");

    let id = schedule(&app, &cookie).await;
    let uri = format!("/api/reminders/{}/send", id);

    let not_owner = app.post(&uri, json!({}), Some(&other)).await;
    assert_eq!(not_owner.status, StatusCode::NOT_FOUND);

    let no_tokens = app.post(&uri, json!({}), Some(&cookie)).await;
    assert_eq!(no_tokens.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_tokens.body["message"], "Invalid user configuration");

    // Short tokens are refused at registration, so plant one directly.
    let user_id = app.user_id(&cookie).await;
    app.state
        .store
        .add_push_token(user_id, "short-token")
        .await
        .unwrap();
    let bad_token = app.post(&uri, json!({}), Some(&cookie)).await;
    assert_eq!(bad_token.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_token.body["message"], "Invalid push token");

    let reminder = app
        .state
        .store
        .get_reminder(id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reminder.attempts, 2);
    assert_eq!(reminder.status, ReminderStatus::Scheduled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_dispatch_sends_once() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    register_device(&app, &cookie).await;
    let id = insert_due(&app, app.user_id(&cookie).await).await;
    app.push.set_delay(Duration::from_millis(100));

    let (a, b) = tokio::join!(
        dispatch_reminder(&app.state, id),
        dispatch_reminder(&app.state, id)
    );

    let (winner, loser) = match (a, b) {
        (Ok(sent), Err(err)) | (Err(err), Ok(sent)) => (sent, err),
        (a, b) => panic!("expected exactly one delivery, got {:?} and {:?}", a, b),
    };
    assert_eq!(winner.status, ReminderStatus::Sent);
    assert!(matches!(
        loser,
        DispatchError::NotScheduled(ReminderStatus::Sending | ReminderStatus::Sent)
    ));
    assert_eq!(app.push.sent().len(), 1);

    let stored = app.state.store.get_reminder(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReminderStatus::Sent);
    assert_eq!(stored.attempts, 0);
}

#[tokio::test]
async fn test_push_failures_exhaust_attempts() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    register_device(&app, &cookie).await;
    let id = schedule(&app, &cookie).await;
    let uri = format!("/api/reminders/{}/send", id);

    app.push.set_failing(true);
    for _ in 0..3 {
        let response = app.post(&uri, json!({}), Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    let reminder = app
        .state
        .store
        .get_reminder(id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reminder.status, ReminderStatus::Failed);
    assert_eq!(reminder.attempts, 3);
    assert!(reminder.last_error.is_some());

    app.push.set_failing(false);
    let response = app.post(&uri, json!({}), Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_run_due_reminders_sends_only_due_ones() {
    let app = TestApp::new();
    let cookie = app.register("sam@example.org").await;
    register_device(&app, &cookie).await;
    let user_id = app.user_id(&cookie).await;

    let due = insert_due(&app, user_id).await;
    let later = schedule(&app, &cookie).await;

    let sent = run_due_reminders(&app.state).await.unwrap();
    assert_eq!(sent, 1);

    let due = app.state.store.get_reminder(due).await.unwrap().unwrap();
    assert_eq!(due.status, ReminderStatus::Sent);
    let later = app
        .state
        .store
        .get_reminder(later.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.status, ReminderStatus::Scheduled);

    assert_eq!(run_due_reminders(&app.state).await.unwrap(), 0);
}

#[tokio::test]
async fn test_scheduler_dispatches_and_stops() {
    let mut settings = Settings::default();
    settings.reminders.poll_interval_secs = 1;
    let app = TestApp::with_settings(settings);
    let cookie = app.register("sam@example.org").await;
    register_device(&app, &cookie).await;
    let due = insert_due(&app, app.user_id(&cookie).await).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = spawn_scheduler(app.state.clone(), shutdown_rx);

    let mut status = ReminderStatus::Scheduled;
    for _ in 0..50 {
        status = app.state.store.get_reminder(due).await.unwrap().unwrap().status;
        if status == ReminderStatus::Sent {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, ReminderStatus::Sent);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler stops on shutdown")
        .unwrap();
}
