//! User identity and session types
//!
//! Users are owned entirely by the auth provider. notekeep only ever sees the
//! id, the email and the display name kept in the provider's user metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity as issued by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque provider id
    pub id: Uuid,

    /// Login key, unique per provider
    pub email: String,

    /// Display name from user metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Proof of a successful login
///
/// Serialized to disk by the terminal client so a login survives between
/// invocations. `Debug` never prints the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls
    pub access_token: String,

    /// Token used to obtain a new session
    pub refresh_token: String,

    /// When the access token stops being accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The user this session belongs to
    pub user: User,
}

impl Session {
    /// Whether the access token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Registration input
#[derive(Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// What a successful registration produced
///
/// Whether a session is issued right away is a provider policy: with email
/// confirmation enabled the user must confirm before logging in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and signed in
    Active(Session),

    /// Account created, confirmation email pending
    ConfirmationRequired(User),
}

impl SignUpOutcome {
    pub fn user(&self) -> &User {
        match self {
            SignUpOutcome::Active(session) => &session.user,
            SignUpOutcome::ConfirmationRequired(user) => user,
        }
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(self, SignUpOutcome::ConfirmationRequired(_))
    }
}
