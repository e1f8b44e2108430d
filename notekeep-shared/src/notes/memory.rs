//! In-process note storage
//!
//! Same contract as the database backends: owner scoping, newest-first
//! listing, strictly increasing `updated_at`. Nothing survives a restart.

use super::{Actor, NoteRepository};
use crate::error::{ServiceError, ServiceResult};
use crate::models::note::sort_by_recent_update;
use crate::models::{Note, NoteInput};
use crate::validation::validate_note_fields;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryNoteRepository {
    notes: RwLock<HashMap<Uuid, Note>>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total notes across all users
    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }
}

/// A timestamp after `previous`, even when the clock has not moved
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_by_user(&self, actor: &Actor) -> ServiceResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .read()
            .await
            .values()
            .filter(|note| note.user_id == actor.user_id)
            .cloned()
            .collect();

        sort_by_recent_update(&mut notes);
        Ok(notes)
    }

    async fn get_by_id(&self, actor: &Actor, id: Uuid) -> ServiceResult<Note> {
        self.notes
            .read()
            .await
            .get(&id)
            .filter(|note| note.user_id == actor.user_id)
            .cloned()
            .ok_or_else(ServiceError::note_not_found)
    }

    async fn create(&self, actor: &Actor, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            title: input.title.clone(),
            content: input.content.clone(),
            created_at: now,
            updated_at: now,
        };

        self.notes.write().await.insert(note.id, note.clone());
        debug!(note_id = %note.id, user_id = %actor.user_id, "Note created");
        Ok(note)
    }

    async fn update(&self, actor: &Actor, id: Uuid, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        let mut notes = self.notes.write().await;
        let note = notes
            .get_mut(&id)
            .filter(|note| note.user_id == actor.user_id)
            .ok_or_else(ServiceError::note_not_found)?;

        note.title = input.title.clone();
        note.content = input.content.clone();
        note.updated_at = next_timestamp(note.updated_at);

        debug!(note_id = %id, user_id = %actor.user_id, "Note updated");
        Ok(note.clone())
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let mut notes = self.notes.write().await;
        match notes.get(&id) {
            Some(note) if note.user_id == actor.user_id => {
                notes.remove(&id);
                debug!(note_id = %id, user_id = %actor.user_id, "Note deleted");
                Ok(())
            }
            _ => Err(ServiceError::note_not_found()),
        }
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(())
    }
}
