//! Input rules shared by the route layer, the providers and the client
//!
//! - Email: `local@domain.tld`, no whitespace, exactly one `@`
//! - Password: at least [`MIN_PASSWORD_LENGTH`] characters
//! - Note title: non-blank, at most [`MAX_TITLE_LENGTH`] characters
//! - Note content: non-blank

use crate::error::{ServiceError, ServiceResult};
use std::borrow::Cow;
use validator::ValidationError;

/// Minimum password length accepted by the registration route
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Matches the `VARCHAR(500)` title column
pub const MAX_TITLE_LENGTH: usize = 500;

/// Checks the simple `local@domain.tld` shape
///
/// # Example
///
/// ```
/// use notekeep_shared::validation::is_valid_email;
///
/// assert!(is_valid_email("ada@example.com"));
/// assert!(!is_valid_email("ada@example"));
/// assert!(!is_valid_email("ada lovelace@example.com"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // A dot with at least one character on either side
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// `validator` hook for `#[validate(custom(function = ...))]`
///
/// An empty value passes; pair it with `length(min = 1)` for presence.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || is_valid_email(email) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some(Cow::Borrowed("Please enter a valid email address"));
        Err(err)
    }
}

/// Checks the minimum password length
pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(
            "password",
            format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        ));
    }
    Ok(())
}

/// Checks a note's title and content before they reach storage
pub fn validate_note_fields(title: &str, content: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::validation("title", "Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ServiceError::validation(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LENGTH),
        ));
    }
    if content.trim().is_empty() {
        return Err(ServiceError::validation("content", "Content is required"));
    }
    Ok(())
}
