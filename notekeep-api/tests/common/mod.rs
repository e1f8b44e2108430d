//! Common test utilities for integration tests
//!
//! Builds the full router over the local auth provider and the in-memory
//! notes backend, so the tests need no external services.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use notekeep_api::app::{build_router, AppState};
use notekeep_api::config::Config;
use notekeep_shared::auth::local::{LocalAuthConfig, LocalAuthProvider};
use notekeep_shared::notes::memory::MemoryNoteRepository;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "secret123";

/// Test context containing the router and direct handles on its backends
pub struct TestContext {
    pub app: Router,
    pub auth: Arc<LocalAuthProvider>,
    pub notes: Arc<MemoryNoteRepository>,
}

/// A registered, signed-in user
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

fn test_config(require_confirmation: bool) -> Config {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("NOTES_BACKEND", "memory".to_string());
    vars.insert("AUTH_BACKEND", "local".to_string());
    vars.insert("LOCAL_JWT_SECRET", JWT_SECRET.to_string());
    vars.insert(
        "LOCAL_REQUIRE_CONFIRMATION",
        require_confirmation.to_string(),
    );

    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_confirmation(false)
    }

    /// Local provider that holds new accounts until their email is confirmed
    pub fn with_confirmation(require_confirmation: bool) -> Self {
        let mut auth_config = LocalAuthConfig::new(JWT_SECRET);
        auth_config.require_confirmation = require_confirmation;

        let auth = Arc::new(LocalAuthProvider::new(auth_config));
        let notes = Arc::new(MemoryNoteRepository::new());

        let state = AppState::new(
            auth.clone(),
            notes.clone(),
            test_config(require_confirmation),
        );

        Self {
            app: build_router(state),
            auth,
            notes,
        }
    }

    /// Sends a request and decodes the JSON body (`Value::Null` if empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth_header: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(header) = auth_header {
            builder = builder.header("authorization", header);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .call(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Registers `email` and signs it in
    pub async fn user(&self, email: &str) -> TestUser {
        let (status, body) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "name": "Test User", "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        let (status, body) = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email: email.to_string(),
            token: body["session"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
        }
    }

    /// Creates a note through the API and returns its JSON
    pub async fn create_note(&self, user: &TestUser, title: &str, content: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/notes",
                Some(&user.auth_header()),
                Some(json!({ "title": title, "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body["note"].clone()
    }
}
