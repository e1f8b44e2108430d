//! Data models
//!
//! - `note`: the persisted `Note` and its input shape
//! - `user`: provider-owned identity, sessions and sign-up outcomes

pub mod note;
pub mod user;

pub use note::{Note, NoteInput};
pub use user::{Session, SignUpOutcome, SignUpRequest, User};
