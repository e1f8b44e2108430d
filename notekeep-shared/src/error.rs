//! Classified errors shared by every notekeep component
//!
//! Anything that crosses a component boundary is a [`ServiceError`]: a fixed
//! [`ErrorKind`], a message that is safe to show to a user, and an optional
//! internal detail that is only ever logged.
//!
//! Provider failures are classified here, once, from the HTTP status and the
//! provider's message text:
//!
//! ```text
//! 429 / "rate limit"                    -> RateLimited
//! "already registered" / "already exists" -> AlreadyExists
//! "invalid login credentials"           -> InvalidCredentials
//! 401 / 403 / "jwt"                     -> Unauthorized
//! 5xx                                   -> ServerError (auth) / StorageError (notes)
//! transport failure                     -> NetworkError
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias used across the shared crate
pub type ServiceResult<T> = Result<T, ServiceError>;

pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
pub const STORAGE_MESSAGE: &str = "Storage error. Please try again later.";
pub const NOTE_NOT_FOUND_MESSAGE: &str = "Note not found";

/// The fixed error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad input, fixable by the user
    Validation,

    /// Missing or invalid bearer token
    Unauthenticated,

    /// Authenticated but not allowed (reported like `NotFound` for notes)
    Unauthorized,

    /// Resource absent or not owned by the caller
    NotFound,

    /// Wrong email or password
    InvalidCredentials,

    /// Email already registered
    AlreadyExists,

    /// Provider throttling
    RateLimited,

    /// Provider-side fault on the auth path
    ServerError,

    /// Provider-side fault on the storage path
    StorageError,

    /// Transport failure reaching the provider
    NetworkError,
}

impl ErrorKind {
    /// Wire code, e.g. `"NOT_FOUND"`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::StorageError => "STORAGE_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
        }
    }

    /// Parses a wire code back into a kind
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "VALIDATION" => ErrorKind::Validation,
            "UNAUTHENTICATED" => ErrorKind::Unauthenticated,
            "UNAUTHORIZED" => ErrorKind::Unauthorized,
            "NOT_FOUND" => ErrorKind::NotFound,
            "INVALID_CREDENTIALS" => ErrorKind::InvalidCredentials,
            "ALREADY_EXISTS" => ErrorKind::AlreadyExists,
            "RATE_LIMITED" => ErrorKind::RateLimited,
            "SERVER_ERROR" => ErrorKind::ServerError,
            "STORAGE_ERROR" => ErrorKind::StorageError,
            "NETWORK_ERROR" => ErrorKind::NetworkError,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the message of this kind may be shown to a user as-is
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            ErrorKind::ServerError | ErrorKind::StorageError | ErrorKind::NetworkError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    /// Taxonomy kind
    pub kind: ErrorKind,

    /// User-safe message
    pub message: String,

    /// Offending input field, for validation failures
    pub field: Option<String>,

    /// Provider-internal detail; logged, never returned to clients
    detail: Option<String>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            detail: None,
        }
    }

    /// Validation failure naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// The single "note not found" failure used for both absence and
    /// ownership mismatch
    pub fn note_not_found() -> Self {
        Self::not_found(NOTE_NOT_FOUND_MESSAGE)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials, "Invalid email or password")
    }

    pub fn already_exists() -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            "An account with this email already exists. Please try logging in instead.",
        )
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn server(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, SERVER_MESSAGE).with_detail(detail)
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageError, STORAGE_MESSAGE).with_detail(detail)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, NETWORK_MESSAGE).with_detail(detail)
    }

    /// Attaches internal detail for server-side logs
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Maps a transport-level `reqwest` failure
    ///
    /// Connection, timeout and request-building failures are `NetworkError`;
    /// anything else (e.g. an undecodable body) is reported as `fallback`.
    pub fn from_transport(err: reqwest::Error, fallback: ErrorKind) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::network(err.to_string())
        } else {
            match fallback {
                ErrorKind::StorageError => Self::storage(err.to_string()),
                _ => Self::server(err.to_string()),
            }
        }
    }
}

/// Which side of the provider produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSurface {
    /// Sign-in, sign-up, token checks
    Auth,

    /// Table access
    Storage,
}

/// Classifies a non-success provider response
///
/// # Arguments
///
/// * `surface` - auth or storage path, which decides the 5xx kind
/// * `status` - HTTP status returned by the provider
/// * `code` - provider error code if any (e.g. PostgREST `PGRST116`)
/// * `message` - provider message text
pub fn classify_provider_failure(
    surface: ProviderSurface,
    status: u16,
    code: Option<&str>,
    message: &str,
) -> ErrorKind {
    let lowered = message.to_lowercase();

    if status == 429 || lowered.contains("rate limit") || lowered.contains("429") {
        return ErrorKind::RateLimited;
    }
    if lowered.contains("already registered") || lowered.contains("already exists") {
        return ErrorKind::AlreadyExists;
    }
    if lowered.contains("invalid login credentials") || code == Some("invalid_credentials") {
        return ErrorKind::InvalidCredentials;
    }
    // "JSON object requested, multiple (or no) rows returned"
    if code == Some("PGRST116") || status == 404 {
        return ErrorKind::NotFound;
    }
    if status == 401 || status == 403 || lowered.contains("jwt") {
        return ErrorKind::Unauthorized;
    }
    if status == 400 || status == 422 {
        return ErrorKind::Validation;
    }

    match surface {
        ProviderSurface::Auth => ErrorKind::ServerError,
        ProviderSurface::Storage => ErrorKind::StorageError,
    }
}
