//! Sign-up fallback
//!
//! Direct registration against the auth provider occasionally fails for
//! reasons that have nothing to do with the user's input (throttling,
//! provider outages, flaky networks). When that happens the session store
//! registers through the notekeep API's `POST /auth/register` instead and
//! then signs in. Which failures qualify is a fixed table:
//!
//! | direct sign-up failure                         | action                 |
//! |------------------------------------------------|------------------------|
//! | `RATE_LIMITED`, `SERVER_ERROR`, `NETWORK_ERROR` | register, then sign in |
//! | anything else                                  | report the failure     |

use async_trait::async_trait;
use notekeep_shared::error::{ErrorKind, ServiceResult};
use notekeep_shared::models::{SignUpRequest, User};

/// What to do after a direct sign-up failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    /// Register through the fallback route, then sign in
    RegisterThenSignIn,

    /// Return the direct failure unchanged
    Fail,
}

impl FallbackAction {
    /// Looks up the action for a direct sign-up failure
    ///
    /// # Example
    ///
    /// ```
    /// use notekeep_client::signup::FallbackAction;
    /// use notekeep_shared::error::ErrorKind;
    ///
    /// assert_eq!(
    ///     FallbackAction::for_kind(ErrorKind::RateLimited),
    ///     FallbackAction::RegisterThenSignIn
    /// );
    /// assert_eq!(FallbackAction::for_kind(ErrorKind::AlreadyExists), FallbackAction::Fail);
    /// ```
    pub fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::RateLimited | ErrorKind::ServerError | ErrorKind::NetworkError => {
                FallbackAction::RegisterThenSignIn
            }
            _ => FallbackAction::Fail,
        }
    }
}

/// Secondary registration path
///
/// Implemented by [`ApiClient`](crate::api::ApiClient) over
/// `POST /auth/register`.
#[async_trait]
pub trait RegistrationFallback: Send + Sync {
    /// Creates the account and returns its user
    ///
    /// # Errors
    ///
    /// The route's classified failure
    async fn register(&self, request: &SignUpRequest) -> ServiceResult<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        let retried = [
            ErrorKind::RateLimited,
            ErrorKind::ServerError,
            ErrorKind::NetworkError,
        ];
        for kind in retried {
            assert_eq!(
                FallbackAction::for_kind(kind),
                FallbackAction::RegisterThenSignIn,
                "{}",
                kind
            );
        }

        let reported = [
            ErrorKind::AlreadyExists,
            ErrorKind::Validation,
            ErrorKind::InvalidCredentials,
            ErrorKind::StorageError,
            ErrorKind::Unauthenticated,
            ErrorKind::Unauthorized,
            ErrorKind::NotFound,
        ];
        for kind in reported {
            assert_eq!(FallbackAction::for_kind(kind), FallbackAction::Fail, "{}", kind);
        }
    }
}
