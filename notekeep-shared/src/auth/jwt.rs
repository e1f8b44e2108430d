//! Access tokens issued by the local auth provider
//!
//! Tokens are HS256-signed JWTs shaped like the hosted provider's: the subject
//! is the user id, `role` is `authenticated`, and the email rides along so the
//! token alone resolves to a [`User`].
//!
//! # Example
//!
//! ```
//! use notekeep_shared::auth::jwt::{create_token, validate_token, Claims};
//! use notekeep_shared::models::User;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let user = User { id: Uuid::new_v4(), email: "ada@example.com".into(), name: None };
//! let claims = Claims::for_user(&user, chrono::Duration::hours(1));
//! let token = create_token(&claims, "a-secret-key-of-at-least-32-bytes!")?;
//!
//! let validated = validate_token(&token, "a-secret-key-of-at-least-32-bytes!")?;
//! assert_eq!(validated.sub, user.id);
//! # Ok(())
//! # }
//! ```

use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer stamped on every local token
pub const ISSUER: &str = "notekeep-local";

/// Role claim the row-level policies expect
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Always [`AUTHENTICATED_ROLE`]
    pub role: String,

    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Claims for `user`, valid for `expires_in`
    pub fn for_user(user: &User, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: AUTHENTICATED_ROLE.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// The identity carried by the token
    pub fn user(&self) -> User {
        User {
            id: self.sub,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Signs `claims` with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, expiry, not-before and issuer
///
/// # Errors
///
/// - `JwtError::Expired` once `exp` has passed
/// - `JwtError::ValidationError` for anything else
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    if token_data.claims.role != AUTHENTICATED_ROLE {
        return Err(JwtError::ValidationError(format!(
            "Unexpected role: {}",
            token_data.claims.role
        )));
    }

    Ok(token_data.claims)
}
