//! Forum thread, reply and live event tests.

use api::realtime::ForumEvent;
use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::TestApp;

async fn start_thread(app: &TestApp, cookie: &str, title: &str) -> String {
    let response = app
        .post(
            "/api/forum/threads",
            json!({"title": title, "body": "Anyone else struggling to sleep?"}),
            Some(cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_thread_with_replies_in_order() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;
    let bob = app.register("bob@example.org").await;

    let thread_id = start_thread(&app, &ada, "Sleep").await;
    let replies_uri = format!("/api/forum/threads/{}/replies", thread_id);

    let first = app
        .post(&replies_uri, json!({"body": "Me too"}), Some(&bob))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    let first_id = first.body["id"].as_str().unwrap().to_string();

    // Answering a reply lands in the same thread.
    let nested = app
        .post(
            &format!("/api/forum/threads/{}/replies", first_id),
            json!({"body": "Try the body scan"}),
            Some(&ada),
        )
        .await;
    assert_eq!(nested.status, StatusCode::CREATED);
    assert_eq!(nested.body["parent_id"], thread_id.as_str());

    let thread = app
        .get(&format!("/api/forum/threads/{}", thread_id), None)
        .await;
    assert_eq!(thread.status, StatusCode::OK);
    assert_eq!(thread.body["root"]["title"], "Sleep");
    let replies = thread.body["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["body"], "Me too");
    assert_eq!(replies[1]["body"], "Try the body scan");

    let reply_as_thread = app
        .get(&format!("/api/forum/threads/{}", first_id), None)
        .await;
    assert_eq!(reply_as_thread.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_threads_are_paged_newest_first() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;
    for title in ["one", "two", "three"] {
        start_thread(&app, &ada, title).await;
    }

    let page = app.get("/api/forum/threads?page=1&per_page=2", None).await;
    assert_eq!(page.status, StatusCode::OK);
    let threads = page.body["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0]["title"], "three");

    let second = app.get("/api/forum/threads?page=2&per_page=2", None).await;
    let threads = second.body["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["title"], "one");

    let clamped = app.get("/api/forum/threads?per_page=1000", None).await;
    assert_eq!(clamped.body["per_page"], 100);
}

#[tokio::test]
async fn test_thread_validation() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;

    let untitled = app
        .post("/api/forum/threads", json!({"title": "", "body": "Hi"}), Some(&ada))
        .await;
    assert_eq!(untitled.status, StatusCode::UNPROCESSABLE_ENTITY);

    let huge = app
        .post(
            "/api/forum/threads",
            json!({"title": "Hi", "body": "x".repeat(10_001)}),
            Some(&ada),
        )
        .await;
    assert_eq!(huge.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_only_author_edits_and_deletes() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;
    let bob = app.register("bob@example.org").await;

    let thread_id = start_thread(&app, &ada, "Sleep").await;
    let reply = app
        .post(
            &format!("/api/forum/threads/{}/replies", thread_id),
            json!({"body": "Me too"}),
            Some(&bob),
        )
        .await;
    let reply_id = reply.body["id"].as_str().unwrap().to_string();
    let post_uri = format!("/api/forum/posts/{}", thread_id);

    let forbidden = app
        .put(&post_uri, json!({"body": "Edited by someone else"}), Some(&bob))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let edited = app
        .put(&post_uri, json!({"title": "Sleep help", "body": "Edited"}), Some(&ada))
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["edited"], true);
    assert_eq!(edited.body["title"], "Sleep help");

    assert_eq!(app.delete(&post_uri, Some(&bob)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&post_uri, Some(&ada)).await.status, StatusCode::NO_CONTENT);

    // The replies went with the root.
    let orphan = app
        .put(
            &format!("/api/forum/posts/{}", reply_id),
            json!({"body": "Still here?"}),
            Some(&bob),
        )
        .await;
    assert_eq!(orphan.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_changes_are_broadcast() {
    let app = TestApp::new();
    let mut events = app.state.forum.subscribe();
    let ada = app.register("ada@example.org").await;

    let thread_id = start_thread(&app, &ada, "Sleep").await;
    match events.recv().await.unwrap() {
        ForumEvent::PostCreated { post } => assert_eq!(post.id.to_string(), thread_id),
        other => panic!("unexpected event {:?}", other),
    }

    app.delete(&format!("/api/forum/posts/{}", thread_id), Some(&ada))
        .await;
    match events.recv().await.unwrap() {
        ForumEvent::PostDeleted { id, thread_id: root } => {
            assert_eq!(id, root);
            assert_eq!(id.to_string(), thread_id);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_is_server_sent_events() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .uri("/api/forum/stream")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
