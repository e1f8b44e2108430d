//! Hosted auth provider client
//!
//! Talks to the provider's GoTrue-compatible REST API under `/auth/v1`:
//!
//! ```text
//! POST /auth/v1/signup                         register
//! POST /auth/v1/token?grant_type=password      sign in
//! POST /auth/v1/token?grant_type=refresh_token refresh
//! POST /auth/v1/logout                         sign out
//! GET  /auth/v1/user                           resolve access token
//! GET  /auth/v1/health                         health
//! ```
//!
//! Failures are classified from the status code and whichever of the
//! provider's message fields is present (`msg`, `message`,
//! `error_description`, `error`).

use super::AuthProvider;
use crate::error::{
    classify_provider_failure, ErrorKind, ProviderSurface, ServiceError, ServiceResult,
};
use crate::models::{Session, SignUpOutcome, SignUpRequest, User};
use crate::provider::ProviderConfig;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

const SIGN_UP_RATE_LIMITED: &str =
    "Too many signup attempts. Please wait a few minutes and try again.";
const SIGN_IN_RATE_LIMITED: &str =
    "Too many login attempts. Please wait a few minutes and try again.";

/// User object as returned by the provider
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl ProviderUser {
    fn into_user(self) -> User {
        let name = ["name", "display_name"]
            .iter()
            .find_map(|key| self.user_metadata.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        User {
            id: self.id,
            email: self.email.unwrap_or_default(),
            name,
        }
    }
}

/// Session object as returned by the token and signup endpoints
#[derive(Debug, Deserialize)]
struct ProviderSession {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: ProviderUser,
}

impl ProviderSession {
    fn into_session(self) -> Session {
        let expires_at: Option<DateTime<Utc>> = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into_user(),
        }
    }
}

/// Error body; field names vary between provider versions
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

impl ProviderErrorBody {
    fn text(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

/// Which call failed; decides the user-facing wording
#[derive(Debug, Clone, Copy)]
enum Operation {
    SignUp,
    SignIn,
    Refresh,
    SignOut,
    GetUser,
}

/// Client for the hosted provider's auth API
#[derive(Clone)]
pub struct HostedAuthProvider {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl HostedAuthProvider {
    /// Creates a provider client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.config.base_url(), path)
    }

    /// Converts a non-success response into a classified error
    async fn failure(&self, operation: Operation, response: reqwest::Response) -> ServiceError {
        let status = response.status().as_u16();
        let body: ProviderErrorBody = response.json().await.unwrap_or_default();
        let text = body.text();
        let kind = classify_provider_failure(
            ProviderSurface::Auth,
            status,
            body.error_code.as_deref(),
            &text,
        );

        debug!(?operation, status, %kind, "Auth provider returned an error");
        let detail = format!("{:?} failed with {}: {}", operation, status, text);

        match (kind, operation) {
            (ErrorKind::RateLimited, Operation::SignUp) => {
                ServiceError::rate_limited(SIGN_UP_RATE_LIMITED).with_detail(detail)
            }
            (ErrorKind::RateLimited, _) => {
                ServiceError::rate_limited(SIGN_IN_RATE_LIMITED).with_detail(detail)
            }
            (ErrorKind::AlreadyExists, _) => ServiceError::already_exists().with_detail(detail),
            (ErrorKind::InvalidCredentials, _) => {
                ServiceError::invalid_credentials().with_detail(detail)
            }
            // A token the provider rejects is an authentication failure to us
            (ErrorKind::Unauthorized, _) | (ErrorKind::NotFound, Operation::GetUser) => {
                ServiceError::unauthenticated("Invalid or expired token").with_detail(detail)
            }
            (ErrorKind::Validation, Operation::SignIn) if text.is_empty() => {
                ServiceError::invalid_credentials().with_detail(detail)
            }
            (ErrorKind::Validation, Operation::Refresh) => {
                ServiceError::unauthenticated("Invalid or expired refresh token").with_detail(detail)
            }
            (ErrorKind::Validation, _) => {
                ServiceError::new(ErrorKind::Validation, text).with_detail(detail)
            }
            _ => ServiceError::server(detail),
        }
    }

    async fn token_grant(&self, operation: Operation, grant: &str, body: Value) -> ServiceResult<Session> {
        let response = self
            .http
            .post(self.endpoint("/token"))
            .query(&[("grant_type", grant)])
            .bearer_auth(&self.config.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        if !response.status().is_success() {
            return Err(self.failure(operation, response).await);
        }

        let session: ProviderSession = response
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        Ok(session.into_session())
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn name(&self) -> &str {
        "hosted"
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ServiceResult<SignUpOutcome> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "name": request.name,
                "display_name": request.name,
            }
        });

        let response = self
            .http
            .post(self.endpoint("/signup"))
            .bearer_auth(&self.config.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        if !response.status().is_success() {
            return Err(self.failure(Operation::SignUp, response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        // With auto-confirm the provider answers with a session, otherwise
        // with the bare user object
        if payload.get("access_token").is_some() {
            let session: ProviderSession = serde_json::from_value(payload)
                .map_err(|e| ServiceError::server(format!("Malformed signup session: {}", e)))?;
            Ok(SignUpOutcome::Active(session.into_session()))
        } else {
            let user: ProviderUser = serde_json::from_value(payload)
                .map_err(|e| ServiceError::server(format!("Malformed signup user: {}", e)))?;
            let mut user = user.into_user();
            if user.name.is_none() {
                user.name = Some(request.name.clone());
            }
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        self.token_grant(
            Operation::SignIn,
            "password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        let response = self
            .http
            .post(self.endpoint("/logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        if !response.status().is_success() {
            return Err(self.failure(Operation::SignOut, response).await);
        }
        Ok(())
    }

    async fn user_for_token(&self, access_token: &str) -> ServiceResult<User> {
        if access_token.trim().is_empty() {
            return Err(ServiceError::unauthenticated("Missing access token"));
        }

        let response = self
            .http
            .get(self.endpoint("/user"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        if !response.status().is_success() {
            return Err(self.failure(Operation::GetUser, response).await);
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        Ok(user.into_user())
    }

    async fn refresh(&self, refresh_token: &str) -> ServiceResult<Session> {
        self.token_grant(
            Operation::Refresh,
            "refresh_token",
            json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn health_check(&self) -> ServiceResult<()> {
        let response = self
            .http
            .get(self.endpoint("/health"))
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::ServerError))?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!(status = response.status().as_u16(), "Auth provider health check failed");
            Err(ServiceError::server(format!(
                "Auth health returned {}",
                response.status()
            )))
        }
    }
}
