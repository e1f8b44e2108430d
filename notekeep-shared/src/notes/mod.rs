//! Note repository
//!
//! Scoped CRUD over the `notes` table. Every call runs on behalf of an
//! [`Actor`] resolved from the caller's session, and every query filters on the
//! actor's user id in addition to whatever row-level security the storage
//! enforces. A note owned by someone else is reported exactly like a missing
//! one: [`ErrorKind::NotFound`](crate::error::ErrorKind::NotFound).
//!
//! Backends:
//!
//! - [`rest::RestNoteRepository`]: the hosted REST gateway
//! - [`postgres::PgNoteRepository`]: a direct `sqlx` connection with the
//!   request claims set per transaction
//! - [`memory::MemoryNoteRepository`]: in-process, for development and tests

use crate::error::ServiceResult;
use crate::models::{Note, NoteInput};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod rest;

/// Identity a repository call runs on behalf of
#[derive(Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,

    /// Bearer token forwarded to storage that enforces row-level security
    pub access_token: String,
}

impl Actor {
    pub fn new(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Storage backend choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesBackend {
    Rest,
    Postgres,
    Memory,
}

impl FromStr for NotesBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" => Ok(NotesBackend::Rest),
            "postgres" | "postgresql" => Ok(NotesBackend::Postgres),
            "memory" => Ok(NotesBackend::Memory),
            other => Err(format!(
                "Unknown notes backend '{}' (expected rest, postgres or memory)",
                other
            )),
        }
    }
}

/// Owner-scoped note storage
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// All of the actor's notes, most recently updated first
    async fn list_by_user(&self, actor: &Actor) -> ServiceResult<Vec<Note>>;

    /// One note owned by the actor
    ///
    /// # Errors
    ///
    /// `NotFound` if the note does not exist or belongs to someone else
    async fn get_by_id(&self, actor: &Actor, id: Uuid) -> ServiceResult<Note>;

    /// Persists a new note owned by the actor
    ///
    /// The returned note has a fresh id and `created_at == updated_at`.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank title or content, or an over-long title
    async fn create(&self, actor: &Actor, input: &NoteInput) -> ServiceResult<Note>;

    /// Replaces title and content of an owned note
    ///
    /// `updated_at` moves strictly forward.
    async fn update(&self, actor: &Actor, id: Uuid, input: &NoteInput) -> ServiceResult<Note>;

    /// Hard-deletes an owned note
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing was deleted, including a repeated delete
    async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()>;

    /// Cheap reachability probe for `/health`
    async fn health_check(&self) -> ServiceResult<()>;
}
