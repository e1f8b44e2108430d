//! Shared harness for client integration tests
//!
//! Serves the real API router (local auth, in-memory notes) on an ephemeral
//! port and points an [`ApiClient`] at it.

#![allow(dead_code)]

use notekeep_api::app::{build_router, AppState};
use notekeep_api::config::Config;
use notekeep_client::api::ApiClient;
use notekeep_client::commands::{Command, Terminal};
use notekeep_client::session::SessionStore;
use notekeep_client::session_file::SessionFile;
use notekeep_shared::auth::local::{LocalAuthConfig, LocalAuthProvider};
use notekeep_shared::notes::memory::MemoryNoteRepository;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const JWT_SECRET: &str = "client-integration-secret-32-bytes-long";
pub const PASSWORD: &str = "secret123";

pub struct TestServer {
    pub base_url: String,
    pub auth: Arc<LocalAuthProvider>,
    pub notes: Arc<MemoryNoteRepository>,
}

impl TestServer {
    pub async fn start() -> Self {
        let auth = Arc::new(LocalAuthProvider::new(LocalAuthConfig::new(JWT_SECRET)));
        let notes = Arc::new(MemoryNoteRepository::new());

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("NOTES_BACKEND", "memory".to_string());
        vars.insert("AUTH_BACKEND", "local".to_string());
        vars.insert("LOCAL_JWT_SECRET", JWT_SECRET.to_string());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let app = build_router(AppState::new(auth.clone(), notes.clone(), config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base_url: format!("http://{}", addr),
            auth,
            notes,
        }
    }

    pub fn api(&self) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(&self.base_url, Duration::from_secs(5)).expect("api client"))
    }

    /// A terminal that signs in through the API, with its own session file
    pub fn terminal(&self) -> (Terminal, SessionFile) {
        let api = self.api();
        let session_file = SessionFile::new(temp_session_path());
        let terminal = Terminal::new(
            api.clone(),
            SessionStore::new(api),
            Some(session_file.clone()),
        );
        (terminal, session_file)
    }

    /// Another terminal sharing `file`, as a later invocation would
    pub fn terminal_with_file(&self, file: &SessionFile) -> Terminal {
        let api = self.api();
        Terminal::new(api.clone(), SessionStore::new(api), Some(file.clone()))
    }
}

pub fn temp_session_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("notekeep-client-test-{}", Uuid::new_v4()))
        .join("session.json")
}

/// Runs a command with `input` as stdin; returns the command result and stdout
pub async fn run(
    terminal: &Terminal,
    command: Command,
    input: &str,
) -> (Result<(), notekeep_client::api::ClientError>, String) {
    let mut out = Vec::new();
    let result = terminal
        .run(command, &mut input.as_bytes(), &mut out)
        .await;
    (result, String::from_utf8(out).expect("utf-8 output"))
}

pub fn register(name: &str, email: &str) -> Command {
    Command::Register {
        name: name.to_string(),
        email: email.to_string(),
        password: Some(PASSWORD.to_string()),
    }
}

pub fn login(email: &str, password: &str) -> Command {
    Command::Login {
        email: email.to_string(),
        password: Some(password.to_string()),
    }
}
