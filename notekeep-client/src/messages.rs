//! User-visible error text
//!
//! Input and account problems are shown as the server worded them. Faults on
//! the provider side or the network never leak detail; they collapse to one
//! generic line.

use crate::api::ClientError;
use notekeep_shared::error::{ErrorKind, ServiceError};

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Text for a classified failure
pub fn render(kind: ErrorKind, message: &str) -> String {
    match kind {
        ErrorKind::Validation
        | ErrorKind::RateLimited
        | ErrorKind::AlreadyExists
        | ErrorKind::InvalidCredentials
        | ErrorKind::NotFound
        | ErrorKind::Unauthenticated
        | ErrorKind::Unauthorized => message.to_string(),
        ErrorKind::ServerError | ErrorKind::StorageError | ErrorKind::NetworkError => {
            GENERIC_FAILURE.to_string()
        }
    }
}

pub fn for_service_error(err: &ServiceError) -> String {
    render(err.kind, &err.message)
}

pub fn for_client_error(err: &ClientError) -> String {
    match err {
        ClientError::Api(e) => for_service_error(e),
        other => render(other.kind(), &other.to_string()),
    }
}
