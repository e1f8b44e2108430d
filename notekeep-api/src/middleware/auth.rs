/// Bearer-token authentication
///
/// Resolves `Authorization: Bearer <token>` through the configured
/// [`AuthProvider`](notekeep_shared::auth::AuthProvider) and stores the result
/// as an [`AuthContext`] request extension. Handlers behind this layer take
/// `Extension<AuthContext>`; the acting identity never comes from a body.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use notekeep_shared::models::User;
use notekeep_shared::notes::Actor;
use tracing::debug;

/// Identity of the caller for one request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,

    /// Scope passed to every repository call
    pub actor: Actor,
}

/// Extracts the token from an `Authorization` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Middleware rejecting requests without a valid bearer token
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("No authorization header"))?;

    let token = bearer_token(header)
        .ok_or_else(|| ApiError::unauthenticated("Invalid or expired token"))?
        .to_string();

    let user = state.auth.user_for_token(&token).await?;
    debug!(user_id = %user.id, "Request authenticated");

    let actor = Actor::new(user.id, token);
    req.extensions_mut().insert(AuthContext { user, actor });

    Ok(next.run(req).await)
}
