/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Classified
/// [`ServiceError`]s from the auth provider and note repository convert with
/// `?`; the response status follows the error kind:
///
/// ```text
/// VALIDATION, ALREADY_EXISTS                          -> 400
/// UNAUTHENTICATED, UNAUTHORIZED, INVALID_CREDENTIALS  -> 401
/// NOT_FOUND                                           -> 404
/// RATE_LIMITED                                        -> 429
/// SERVER_ERROR, STORAGE_ERROR, NETWORK_ERROR          -> 500
/// ```
///
/// The body is always `{ "error": <message>, "code": <KIND> }` plus `field`
/// for validation failures. Internal detail is logged, never returned.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notekeep_shared::error::{ErrorKind, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed field validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Request body is not the JSON the route expects (400)
    MalformedBody(String),

    /// Classified failure from the auth provider or the repository
    Service(ServiceError),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Taxonomy kind, e.g. `NOT_FOUND`
    pub code: ErrorKind,

    /// Offending field for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Every failed field when more than one did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::AlreadyExists => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated | ErrorKind::Unauthorized | ErrorKind::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::ServerError | ErrorKind::StorageError | ErrorKind::NetworkError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    /// Shorthand for a 401 with the given message
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Service(ServiceError::unauthenticated(message))
    }

    /// Collects `validator` failures, ordered by `field_order`
    ///
    /// The first entry becomes the response's `error` and `field`.
    pub fn from_validation(errors: ValidationErrors, field_order: &[&str]) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();

        details.sort_by_key(|detail| {
            field_order
                .iter()
                .position(|f| *f == detail.field)
                .unwrap_or(field_order.len())
        });

        ApiError::ValidationError(details)
    }

    /// Kind reported for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ValidationError(_) | ApiError::MalformedBody(_) => ErrorKind::Validation,
            ApiError::Service(err) => err.kind,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::MalformedBody(msg) => write!(f, "Malformed body: {}", msg),
            ApiError::Service(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());

        let body = match self {
            ApiError::ValidationError(mut errors) => {
                let first = if errors.is_empty() {
                    ValidationErrorDetail {
                        field: String::new(),
                        message: "Request validation failed".to_string(),
                    }
                } else {
                    errors[0].clone()
                };
                let details = if errors.len() > 1 {
                    Some(std::mem::take(&mut errors))
                } else {
                    None
                };

                ErrorResponse {
                    error: first.message,
                    code: ErrorKind::Validation,
                    field: Some(first.field).filter(|f| !f.is_empty()),
                    details,
                }
            }
            ApiError::MalformedBody(msg) => {
                tracing::debug!("Rejected request body: {}", msg);
                ErrorResponse {
                    error: "Request body must be valid JSON".to_string(),
                    code: ErrorKind::Validation,
                    field: None,
                    details: None,
                }
            }
            ApiError::Service(err) => {
                if status.is_server_error() {
                    tracing::error!(
                        code = %err.kind,
                        detail = err.detail().unwrap_or("-"),
                        "Request failed"
                    );
                } else if let Some(detail) = err.detail() {
                    tracing::debug!(code = %err.kind, detail, "Request rejected");
                }

                ErrorResponse {
                    error: err.message,
                    code: err.kind,
                    field: err.field,
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
        #[validate(length(min = 1, message = "Content is required"))]
        content: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::AlreadyExists), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_for(ErrorKind::NetworkError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_order() {
        let sample = Sample {
            title: String::new(),
            content: String::new(),
        };
        let err = ApiError::from_validation(sample.validate().unwrap_err(), &["title", "content"]);

        let ApiError::ValidationError(details) = err else {
            panic!("expected validation error");
        };
        assert_eq!(details[0].field, "title");
        assert_eq!(details[1].field, "content");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::from(ServiceError::note_not_found());
        assert_eq!(err.to_string(), "NOT_FOUND: Note not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_internal_detail_not_in_response() {
        let response = ApiError::from(ServiceError::storage("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
