//! Note model
//!
//! The only entity notekeep persists. Rows live in the provider's `notes`
//! table and are restricted to their owner by row-level security.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE notes (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL REFERENCES auth.users(id) ON DELETE CASCADE,
//!     title VARCHAR(500) NOT NULL,
//!     content TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    /// Provider-generated id, immutable
    pub id: Uuid,

    /// Owning user, set once at creation
    pub user_id: Uuid,

    pub title: String,

    pub content: String,

    /// Set at creation, immutable
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful update
    pub updated_at: DateTime<Utc>,
}

/// Title and content as written by a user
///
/// Used for both creation and full replacement on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

impl NoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Case-insensitive substring match on title or content
///
/// This is the dashboard's search: it filters an already-fetched list and never
/// queries storage.
pub fn matches_search(note: &Note, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(&term) || note.content.to_lowercase().contains(&term)
}

/// Sorts notes newest-edit first, the order every listing uses
pub fn sort_by_recent_update(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
