//! Common test utilities for integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api::config::Settings;
use api::db::{MemoryStore, Store};
use api::push::{PushError, PushMessage, PushSender};
use api::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::SessionManagerLayer;
use uuid::Uuid;

/// A push token long enough to pass validation.
pub const DEVICE_TOKEN: &str =
    "fcm-device-token-0123456789abcdefghijklmnopqrstuvwxyz-0123456789";

/// Push sender that records messages and can be told to fail or to stall.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<PushMessage>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every send take `delay` before it completes.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("projects/test/messages/{}", sent.len()))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub location: Option<String>,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub push: Arc<RecordingSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let push = Arc::new(RecordingSender::default());
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(store, push.clone(), settings);
        let router = api::router(state.clone()).layer(
            SessionManagerLayer::new(tower_sessions::MemoryStore::default()).with_secure(false),
        );
        Self {
            router,
            state,
            push,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };

        TestResponse {
            status,
            cookie,
            location,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    pub async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn put(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), cookie).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, None, cookie).await
    }

    /// Register a local account and return its session cookie.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                serde_json::json!({
                    "email": email,
                    "password": "correct horse battery",
                    "name": "Test User",
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.cookie.expect("register sets a session cookie")
    }

    /// Id of the user signed in with `cookie`.
    pub async fn user_id(&self, cookie: &str) -> Uuid {
        let response = self.get("/api/auth/me", Some(cookie)).await;
        response.body["id"].as_str().unwrap().parse().unwrap()
    }
}
