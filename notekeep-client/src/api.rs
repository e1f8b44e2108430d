//! HTTP client for the notekeep API
//!
//! [`ApiClient`] covers every route the API exposes. Failures come back as
//! [`ClientError`]; an error body from the API (`{error, code, field?}`) is
//! turned back into the same classified [`ServiceError`] the server produced.
//!
//! Besides the notes calls, the client plays two roles for the session
//! store:
//!
//! - an [`AuthProvider`] over `/auth/register` and `/auth/login`, for setups
//!   where the terminal talks only to the API
//! - the [`RegistrationFallback`] used when direct sign-up against the hosted
//!   provider fails transiently

use crate::signup::RegistrationFallback;
use async_trait::async_trait;
use notekeep_shared::auth::AuthProvider;
use notekeep_shared::error::{ErrorKind, ServiceError, ServiceResult};
use notekeep_shared::models::{Note, NoteInput, Session, SignUpOutcome, SignUpRequest, User};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Client-side failure
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API answered with a classified failure
    #[error(transparent)]
    Api(#[from] ServiceError),

    /// The API could not be reached
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than the expected JSON
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The command needs a session and there is none
    #[error("Not signed in. Run `notekeep login` first.")]
    NotSignedIn,

    /// Local file access (session file, imports)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local JSON that does not parse
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Taxonomy kind used to pick the user-visible message
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Api(e) => e.kind,
            ClientError::Http(_) => ErrorKind::NetworkError,
            ClientError::Decode(_) => ErrorKind::ServerError,
            ClientError::NotSignedIn => ErrorKind::Unauthenticated,
            ClientError::Io(_) | ClientError::Json(_) => ErrorKind::Validation,
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api(e) => e,
            ClientError::Http(e) => ServiceError::from_transport(e, ErrorKind::ServerError),
            ClientError::Decode(detail) => ServiceError::server(detail),
            ClientError::NotSignedIn => ServiceError::unauthenticated("Not signed in"),
            ClientError::Io(e) => ServiceError::server(e.to_string()),
            ClientError::Json(e) => ServiceError::server(e.to_string()),
        }
    }
}

/// Error body written by the API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
    #[serde(default)]
    field: Option<String>,
}

/// Rebuilds the classified error from a non-success response
fn decode_failure(status: StatusCode, body: &[u8]) -> ServiceError {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(kind) = ErrorKind::from_code(&parsed.code) {
            return match (kind, parsed.field) {
                (ErrorKind::Validation, Some(field)) => ServiceError::validation(field, parsed.error),
                _ => ServiceError::new(kind, parsed.error),
            };
        }
    }

    let detail = format!("{}: {}", status, String::from_utf8_lossy(body));
    match status {
        StatusCode::UNAUTHORIZED => {
            ServiceError::unauthenticated("Invalid or expired token").with_detail(detail)
        }
        StatusCode::NOT_FOUND => ServiceError::not_found("Not found").with_detail(detail),
        StatusCode::TOO_MANY_REQUESTS => {
            ServiceError::rate_limited("Too many requests. Please wait and try again.")
                .with_detail(detail)
        }
        s if s.is_client_error() => {
            ServiceError::new(ErrorKind::Validation, "The request was rejected").with_detail(detail)
        }
        _ => ServiceError::server(detail),
    }
}

/// Result of `POST /auth/register`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub message: String,
    pub user: User,
    #[serde(default)]
    pub needs_confirmation: Option<bool>,
    #[serde(default)]
    pub session: Option<Session>,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    session: Session,
}

#[derive(Debug, Deserialize)]
struct NoteBody {
    note: Note,
}

#[derive(Debug, Deserialize)]
struct NotesBody {
    notes: Vec<Note>,
}

/// Reachability of one backend, as reported by `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub backend: String,
    pub status: String,
}

/// `GET /health` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub auth: ComponentStatus,
    pub storage: ComponentStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Client for one notekeep API deployment
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:8080`)
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notekeep-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn note_url(&self, id: Uuid) -> String {
        self.url(&format!("/notes/{}", id))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = decode_failure(status, &body);
            debug!(%status, kind = %err.kind, "API request failed");
            return Err(ClientError::Api(err));
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        self.send(self.http.get(self.url("/health"))).await
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &SignUpRequest) -> Result<Registration, ClientError> {
        let body = json!({
            "name": request.name,
            "email": request.email,
            "password": request.password,
        });
        self.send(self.http.post(self.url("/auth/register")).json(&body))
            .await
    }

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = json!({ "email": email, "password": password });
        let login: LoginBody = self
            .send(self.http.post(self.url("/auth/login")).json(&body))
            .await?;
        Ok(login.session)
    }

    /// `GET /notes`, most recently updated first
    pub async fn list_notes(&self, token: &str) -> Result<Vec<Note>, ClientError> {
        let body: NotesBody = self
            .send(self.http.get(self.url("/notes")).bearer_auth(token))
            .await?;
        Ok(body.notes)
    }

    /// `GET /notes/:id`
    pub async fn get_note(&self, token: &str, id: Uuid) -> Result<Note, ClientError> {
        let body: NoteBody = self
            .send(self.http.get(self.note_url(id)).bearer_auth(token))
            .await?;
        Ok(body.note)
    }

    /// `POST /notes`
    pub async fn create_note(&self, token: &str, input: &NoteInput) -> Result<Note, ClientError> {
        let body: NoteBody = self
            .send(self.http.post(self.url("/notes")).bearer_auth(token).json(input))
            .await?;
        Ok(body.note)
    }

    /// `PUT /notes/:id`
    pub async fn update_note(
        &self,
        token: &str,
        id: Uuid,
        input: &NoteInput,
    ) -> Result<Note, ClientError> {
        let body: NoteBody = self
            .send(self.http.put(self.note_url(id)).bearer_auth(token).json(input))
            .await?;
        Ok(body.note)
    }

    /// `DELETE /notes/:id`
    pub async fn delete_note(&self, token: &str, id: Uuid) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .send(self.http.delete(self.note_url(id)).bearer_auth(token))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for ApiClient {
    fn name(&self) -> &str {
        "api"
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ServiceResult<SignUpOutcome> {
        let registration = self.register(request).await?;
        Ok(match registration.session {
            Some(session) => SignUpOutcome::Active(session),
            None => SignUpOutcome::ConfirmationRequired(registration.user),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        Ok(self.login(email, password).await?)
    }

    async fn sign_out(&self, _access_token: &str) -> ServiceResult<()> {
        // The API keeps no sessions; forgetting the token is the sign-out
        Ok(())
    }

    async fn user_for_token(&self, _access_token: &str) -> ServiceResult<User> {
        Err(ServiceError::unauthenticated(
            "The API does not resolve tokens for clients",
        ))
    }

    async fn refresh(&self, _refresh_token: &str) -> ServiceResult<Session> {
        Err(ServiceError::unauthenticated(
            "Session expired. Please log in again.",
        ))
    }

    async fn health_check(&self) -> ServiceResult<()> {
        let report = self.health().await?;
        if report.is_healthy() {
            Ok(())
        } else {
            Err(ServiceError::server(format!(
                "API reports {} (auth {}, storage {})",
                report.status, report.auth.status, report.storage.status
            )))
        }
    }
}

#[async_trait]
impl RegistrationFallback for ApiClient {
    async fn register(&self, request: &SignUpRequest) -> ServiceResult<User> {
        Ok(ApiClient::register(self, request).await?.user)
    }
}
