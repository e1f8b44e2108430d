//! Authentication
//!
//! The [`AuthProvider`] trait is the seam between notekeep and whoever issues
//! identities. Two implementations:
//!
//! - [`hosted::HostedAuthProvider`]: the hosted provider's REST auth API
//! - [`local::LocalAuthProvider`]: an in-process provider for development and
//!   tests, built on [`password`] (Argon2id) and [`jwt`] (HS256 tokens)
//!
//! Every method returns a classified [`ServiceError`](crate::error::ServiceError);
//! raw provider errors never leave an implementation.

use crate::error::ServiceResult;
use crate::models::{Session, SignUpOutcome, SignUpRequest, User};
use async_trait::async_trait;
use std::str::FromStr;

pub mod hosted;
pub mod jwt;
pub mod local;
pub mod password;

/// Which identity provider issues sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBackend {
    Hosted,
    Local,
}

impl FromStr for AuthBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hosted" => Ok(AuthBackend::Hosted),
            "local" => Ok(AuthBackend::Local),
            other => Err(format!(
                "Unknown auth backend '{}' (expected hosted or local)",
                other
            )),
        }
    }
}

/// Operations notekeep needs from an identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// Registers a new account
    ///
    /// Returns an active session or a confirmation-required result depending
    /// on the provider's policy.
    ///
    /// # Errors
    ///
    /// `RateLimited`, `AlreadyExists`, `Validation`, `ServerError`,
    /// `NetworkError`
    async fn sign_up(&self, request: &SignUpRequest) -> ServiceResult<SignUpOutcome>;

    /// Exchanges credentials for a session
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `RateLimited`, `ServerError`, `NetworkError`
    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session>;

    /// Revokes the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> ServiceResult<()>;

    /// Resolves a bearer token to its user
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for a missing, malformed, expired or revoked token
    async fn user_for_token(&self, access_token: &str) -> ServiceResult<User>;

    /// Exchanges a refresh token for a new session
    async fn refresh(&self, refresh_token: &str) -> ServiceResult<Session>;

    /// Cheap reachability probe for `/health`
    async fn health_check(&self) -> ServiceResult<()>;
}
