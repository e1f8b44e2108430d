//! Notes over a direct Postgres connection
//!
//! Each operation runs in its own transaction that first installs the actor
//! as the request identity:
//!
//! ```sql
//! SELECT set_config('request.jwt.claims', '{"sub":"<user id>","role":"authenticated"}', true);
//! SET LOCAL ROLE authenticated;
//! ```
//!
//! so the table's row-level policies (`auth.uid() = user_id`) apply exactly as
//! they do behind the REST gateway. Queries still filter on `user_id`.

use super::{Actor, NoteRepository};
use crate::db::pool::health_check;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Note, NoteInput};
use crate::validation::validate_note_fields;
use async_trait::async_trait;
use serde_json::json;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use tracing::{debug, error};
use uuid::Uuid;

/// Note repository backed by a `sqlx` pool
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

/// Maps a database failure onto the taxonomy
fn storage_error(err: sqlx::Error) -> ServiceError {
    match err {
        sqlx::Error::RowNotFound => ServiceError::note_not_found(),
        sqlx::Error::Io(e) => ServiceError::network(e.to_string()),
        sqlx::Error::PoolTimedOut => ServiceError::network("Database pool timed out"),
        other => {
            error!(error = %other, "Notes query failed");
            ServiceError::storage(other.to_string())
        }
    }
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a transaction acting as `actor`
    async fn begin_as(&self, actor: &Actor) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let claims = json!({
            "sub": actor.user_id,
            "role": "authenticated",
        })
        .to_string();

        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(claims)
            .execute(&mut *tx)
            .await?;

        sqlx::query("SET LOCAL ROLE authenticated")
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn list_by_user(&self, actor: &Actor) -> ServiceResult<Vec<Note>> {
        let mut tx = self.begin_as(actor).await.map_err(storage_error)?;

        let notes = sqlx::query_as::<_, Note>(
            "SELECT id, user_id, title, content, created_at, updated_at
             FROM notes
             WHERE user_id = $1
             ORDER BY updated_at DESC",
        )
        .bind(actor.user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(notes)
    }

    async fn get_by_id(&self, actor: &Actor, id: Uuid) -> ServiceResult<Note> {
        let mut tx = self.begin_as(actor).await.map_err(storage_error)?;

        let note = sqlx::query_as::<_, Note>(
            "SELECT id, user_id, title, content, created_at, updated_at
             FROM notes
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(actor.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        note.ok_or_else(ServiceError::note_not_found)
    }

    async fn create(&self, actor: &Actor, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        let mut tx = self.begin_as(actor).await.map_err(storage_error)?;

        // One clock reading for both columns
        let note = sqlx::query_as::<_, Note>(
            "INSERT INTO notes (user_id, title, content, created_at, updated_at)
             VALUES ($1, $2, $3, NOW(), NOW())
             RETURNING id, user_id, title, content, created_at, updated_at",
        )
        .bind(actor.user_id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        debug!(note_id = %note.id, user_id = %actor.user_id, "Note created");
        Ok(note)
    }

    async fn update(&self, actor: &Actor, id: Uuid, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        let mut tx = self.begin_as(actor).await.map_err(storage_error)?;

        // updated_at is moved forward by the update_notes_updated_at trigger
        let note = sqlx::query_as::<_, Note>(
            "UPDATE notes
             SET title = $3, content = $4
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, title, content, created_at, updated_at",
        )
        .bind(id)
        .bind(actor.user_id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        let note = note.ok_or_else(ServiceError::note_not_found)?;
        debug!(note_id = %id, user_id = %actor.user_id, "Note updated");
        Ok(note)
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let mut tx = self.begin_as(actor).await.map_err(storage_error)?;

        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(actor.user_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::note_not_found());
        }

        debug!(note_id = %id, user_id = %actor.user_id, "Note deleted");
        Ok(())
    }

    async fn health_check(&self) -> ServiceResult<()> {
        health_check(&self.pool).await.map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_row_not_found_is_note_not_found() {
        let err = storage_error(sqlx::Error::RowNotFound);
        assert_eq!(err, ServiceError::note_not_found());
    }

    #[test]
    fn test_pool_timeout_is_network() {
        assert_eq!(storage_error(sqlx::Error::PoolTimedOut).kind, ErrorKind::NetworkError);
    }

    #[test]
    fn test_other_errors_hide_detail() {
        let err = storage_error(sqlx::Error::Protocol("bad frame".into()));
        assert_eq!(err.kind, ErrorKind::StorageError);
        assert!(!err.message.contains("bad frame"));
        assert!(err.detail().unwrap_or_default().contains("bad frame"));
    }
}
