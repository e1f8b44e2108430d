/// Authentication endpoints
///
/// Thin wrappers over the configured auth provider:
///
/// - `POST /auth/register` - create an account
/// - `POST /auth/login` - exchange credentials for a session
///
/// The terminal client calls `/auth/register` as its fallback when direct
/// sign-up against the provider fails transiently.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use notekeep_shared::models::{Session, SignUpOutcome, SignUpRequest, User};
use notekeep_shared::validation::validate_email;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Register request
///
/// Fields default to empty so a missing field reports as a validation
/// failure naming it rather than a deserialization error.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name, email, and password are required"))]
    pub name: String,

    #[serde(default)]
    #[validate(
        length(min = 1, message = "Name, email, and password are required"),
        custom(function = "validate_email")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,

    pub user: User,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_confirmation: Option<bool>,

    /// Issued when the provider signs new accounts in immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,

    pub user: User,

    pub session: Session,
}

/// Registers a new account
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// { "name": "Ada", "email": "ada@example.com", "password": "secret123" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "message": "Account created! Please check your email to confirm your account.",
///   "user": { "id": "uuid", "email": "ada@example.com", "name": "Ada" },
///   "needsConfirmation": true
/// }
/// ```
///
/// # Errors
///
/// - `400 VALIDATION`: missing field, malformed email, short password
/// - `400 ALREADY_EXISTS`: email already registered
/// - `429 RATE_LIMITED`: provider throttling
/// - `500`: provider failure
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| ApiError::from_validation(e, &["name", "email", "password"]))?;

    let outcome = state
        .auth
        .sign_up(&SignUpRequest {
            name: req.name.clone(),
            email: req.email.clone(),
            password: req.password,
        })
        .await?;

    let mut user = outcome.user().clone();
    if user.name.is_none() {
        user.name = Some(req.name);
    }
    info!(user_id = %user.id, confirmation = outcome.needs_confirmation(), "Account registered");

    let response = match outcome {
        SignUpOutcome::ConfirmationRequired(_) => RegisterResponse {
            message: "Account created! Please check your email to confirm your account."
                .to_string(),
            user,
            needs_confirmation: Some(true),
            session: None,
        },
        SignUpOutcome::Active(session) => RegisterResponse {
            message: "Account created successfully!".to_string(),
            user,
            needs_confirmation: None,
            session: Some(session),
        },
    };

    Ok(Json(response))
}

/// Signs in with email and password
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// { "email": "ada@example.com", "password": "secret123" }
/// ```
///
/// # Errors
///
/// - `400 VALIDATION`: missing field
/// - `401 INVALID_CREDENTIALS`: wrong email or password
/// - `429 RATE_LIMITED`: provider throttling
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| ApiError::from_validation(e, &["email", "password"]))?;

    let session = state.auth.sign_in(&req.email, &req.password).await?;
    info!(user_id = %session.user.id, "Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: session.user.clone(),
        session,
    }))
}
