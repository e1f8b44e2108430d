//! In-process auth provider
//!
//! Stands in for the hosted provider during development and in tests. It keeps
//! accounts in memory and follows the same contract:
//!
//! - Argon2id password hashes ([`super::password`])
//! - HS256 access tokens ([`super::jwt`])
//! - Opaque random refresh tokens, stored only as SHA-256 digests and rotated
//!   on every refresh
//! - Sign-out revokes the access token and every refresh token of the user
//! - Optional email-confirmation policy: sign-up returns
//!   `ConfirmationRequired` and sign-in is refused until [`confirm_email`] runs
//!
//! [`confirm_email`]: LocalAuthProvider::confirm_email

use super::{jwt, password, AuthProvider};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::models::{Session, SignUpOutcome, SignUpRequest, User};
use crate::validation::{is_valid_email, validate_password};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Settings for the local provider
#[derive(Debug, Clone)]
pub struct LocalAuthConfig {
    /// HS256 signing secret, at least 32 bytes
    pub jwt_secret: String,

    /// Whether new accounts must confirm their email before signing in
    pub require_confirmation: bool,

    /// Access token lifetime
    pub access_token_ttl: Duration,
}

impl LocalAuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            require_confirmation: false,
            access_token_ttl: Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_hash: String,
    confirmed: bool,
}

#[derive(Default)]
struct Accounts {
    /// Keyed by lowercased email
    by_email: HashMap<String, Account>,

    /// SHA-256 of refresh token -> user id
    refresh_tokens: HashMap<String, Uuid>,

    /// SHA-256 of revoked access tokens
    revoked_access: HashSet<String>,
}

/// In-memory [`AuthProvider`]
pub struct LocalAuthProvider {
    config: LocalAuthConfig,
    accounts: RwLock<Accounts>,
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn new_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl LocalAuthProvider {
    pub fn new(config: LocalAuthConfig) -> Self {
        Self {
            config,
            accounts: RwLock::new(Accounts::default()),
        }
    }

    /// Marks an account's email as confirmed
    ///
    /// Returns `false` if no account uses `email`.
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.by_email.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Number of registered accounts
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.by_email.len()
    }

    /// Issues a fresh session and records its refresh token
    async fn issue_session(&self, user: &User) -> ServiceResult<Session> {
        let claims = jwt::Claims::for_user(user, self.config.access_token_ttl);
        let access_token = jwt::create_token(&claims, &self.config.jwt_secret)
            .map_err(|e| ServiceError::server(e.to_string()))?;
        let refresh_token = new_refresh_token();

        self.accounts
            .write()
            .await
            .refresh_tokens
            .insert(digest(&refresh_token), user.id);

        Ok(Session {
            access_token,
            refresh_token,
            expires_at: Some(Utc::now() + self.config.access_token_ttl),
            user: user.clone(),
        })
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ServiceResult<SignUpOutcome> {
        if !is_valid_email(&request.email) {
            return Err(ServiceError::validation(
                "email",
                "Please enter a valid email address",
            ));
        }
        validate_password(&request.password)?;

        let key = request.email.to_lowercase();
        if self.accounts.read().await.by_email.contains_key(&key) {
            return Err(ServiceError::already_exists());
        }

        // Argon2 is CPU-bound; keep it off the async workers
        let plaintext = request.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
            .await
            .map_err(|e| ServiceError::server(format!("Hashing task failed: {}", e)))?
            .map_err(|e| ServiceError::server(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            name: Some(request.name.clone()),
        };
        let confirmed = !self.config.require_confirmation;

        {
            let mut accounts = self.accounts.write().await;
            // Re-check under the write lock; two sign-ups may race past the read
            if accounts.by_email.contains_key(&key) {
                return Err(ServiceError::already_exists());
            }
            accounts.by_email.insert(
                key,
                Account {
                    user: user.clone(),
                    password_hash,
                    confirmed,
                },
            );
        }

        info!(user_id = %user.id, confirmed, "Local account registered");

        if confirmed {
            Ok(SignUpOutcome::Active(self.issue_session(&user).await?))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    async fn sign_in(&self, email: &str, password_attempt: &str) -> ServiceResult<Session> {
        let account = self
            .accounts
            .read()
            .await
            .by_email
            .get(&email.to_lowercase())
            .cloned()
            .ok_or_else(ServiceError::invalid_credentials)?;

        let attempt = password_attempt.to_string();
        let hash = account.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || password::verify_password(&attempt, &hash))
            .await
            .map_err(|e| ServiceError::server(format!("Verification task failed: {}", e)))?
            .map_err(|e| ServiceError::server(e.to_string()))?;

        if !valid {
            debug!(email = %email, "Local sign-in rejected");
            return Err(ServiceError::invalid_credentials());
        }
        if !account.confirmed {
            return Err(ServiceError::new(
                ErrorKind::InvalidCredentials,
                "Email not confirmed",
            ));
        }

        self.issue_session(&account.user).await
    }

    async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        let user = self.user_for_token(access_token).await?;

        let mut accounts = self.accounts.write().await;
        accounts.revoked_access.insert(digest(access_token));
        accounts.refresh_tokens.retain(|_, owner| *owner != user.id);

        info!(user_id = %user.id, "Local session revoked");
        Ok(())
    }

    async fn user_for_token(&self, access_token: &str) -> ServiceResult<User> {
        let claims = jwt::validate_token(access_token, &self.config.jwt_secret).map_err(|e| {
            ServiceError::unauthenticated("Invalid or expired token").with_detail(e.to_string())
        })?;

        if self
            .accounts
            .read()
            .await
            .revoked_access
            .contains(&digest(access_token))
        {
            return Err(ServiceError::unauthenticated("Invalid or expired token"));
        }

        Ok(claims.user())
    }

    async fn refresh(&self, refresh_token: &str) -> ServiceResult<Session> {
        let user = {
            let mut accounts = self.accounts.write().await;
            let user_id = accounts
                .refresh_tokens
                .remove(&digest(refresh_token))
                .ok_or_else(|| ServiceError::unauthenticated("Invalid or expired refresh token"))?;

            accounts
                .by_email
                .values()
                .find(|account| account.user.id == user_id)
                .map(|account| account.user.clone())
                .ok_or_else(|| ServiceError::unauthenticated("Account no longer exists"))?
        };

        self.issue_session(&user).await
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "local-test-secret-at-least-32-bytes!!";

    fn provider() -> LocalAuthProvider {
        LocalAuthProvider::new(LocalAuthConfig::new(SECRET))
    }

    fn request(email: &str) -> SignUpRequest {
        SignUpRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_issues_session() {
        let provider = provider();
        let outcome = provider.sign_up(&request("ada@example.com")).await.unwrap();

        let SignUpOutcome::Active(session) = outcome else {
            panic!("expected an active session");
        };
        assert_eq!(session.user.name.as_deref(), Some("Ada"));

        let user = provider.user_for_token(&session.access_token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_case_insensitive() {
        let provider = provider();
        provider.sign_up(&request("ada@example.com")).await.unwrap();

        let err = provider.sign_up(&request("ADA@example.com")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(provider.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let provider = provider();

        let err = provider.sign_up(&request("not-an-email")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut weak = request("ada@example.com");
        weak.password = "123".to_string();
        let err = provider.sign_up(&weak).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let provider = provider();
        provider.sign_up(&request("ada@example.com")).await.unwrap();

        let wrong = provider.sign_in("ada@example.com", "nope-nope").await.unwrap_err();
        let unknown = provider.sign_in("bob@example.com", "secret123").await.unwrap_err();

        assert_eq!(wrong.kind, ErrorKind::InvalidCredentials);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn test_confirmation_policy() {
        let mut config = LocalAuthConfig::new(SECRET);
        config.require_confirmation = true;
        let provider = LocalAuthProvider::new(config);

        let outcome = provider.sign_up(&request("ada@example.com")).await.unwrap();
        assert!(outcome.needs_confirmation());

        let err = provider.sign_in("ada@example.com", "secret123").await.unwrap_err();
        assert_eq!(err.message, "Email not confirmed");

        assert!(provider.confirm_email("ada@example.com").await);
        assert!(provider.sign_in("ada@example.com", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_tokens() {
        let provider = provider();
        provider.sign_up(&request("ada@example.com")).await.unwrap();
        let session = provider.sign_in("ada@example.com", "secret123").await.unwrap();

        provider.sign_out(&session.access_token).await.unwrap();

        let err = provider.user_for_token(&session.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
        let err = provider.refresh(&session.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let provider = provider();
        provider.sign_up(&request("ada@example.com")).await.unwrap();
        let session = provider.sign_in("ada@example.com", "secret123").await.unwrap();

        let renewed = provider.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(renewed.user.id, session.user.id);
        assert_ne!(renewed.refresh_token, session.refresh_token);

        // Old refresh token is single-use
        assert!(provider.refresh(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_token_unauthenticated() {
        let err = provider().user_for_token("garbage").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }
}
