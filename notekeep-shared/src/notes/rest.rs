//! Notes over the hosted REST gateway
//!
//! PostgREST-compatible endpoint at `/rest/v1/notes`. Requests carry the
//! actor's access token, so the provider evaluates row-level security as that
//! user; every filter also pins `user_id` to the actor.
//!
//! Single-row calls ask for `application/vnd.pgrst.object+json`. When no row
//! matches the gateway answers `406` with code `PGRST116`, which becomes
//! `NotFound`.

use super::{Actor, NoteRepository};
use crate::error::{
    classify_provider_failure, ErrorKind, ProviderSurface, ServiceError, ServiceResult,
};
use crate::models::note::sort_by_recent_update;
use crate::models::{Note, NoteInput};
use crate::provider::ProviderConfig;
use crate::validation::validate_note_fields;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST error body
#[derive(Debug, Default, Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Note repository backed by the hosted REST gateway
#[derive(Clone)]
pub struct RestNoteRepository {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl RestNoteRepository {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/notes", self.config.base_url())
    }

    /// `id=eq.<id>&user_id=eq.<owner>`
    fn scoped(&self, builder: RequestBuilder, actor: &Actor, id: Uuid) -> RequestBuilder {
        builder
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", actor.user_id)),
            ])
            .bearer_auth(&actor.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> ServiceResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::StorageError))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(failure(response).await)
        }
    }

    async fn single(&self, builder: RequestBuilder) -> ServiceResult<Note> {
        let response = self.send(builder.header(ACCEPT, SINGLE_OBJECT)).await?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::StorageError))
    }
}

/// Converts a non-success gateway response into a classified error
async fn failure(response: reqwest::Response) -> ServiceError {
    let status = response.status().as_u16();
    let body: GatewayError = response.json().await.unwrap_or_default();
    let message = body.message.clone().unwrap_or_default();
    let kind = classify_provider_failure(
        ProviderSurface::Storage,
        status,
        body.code.as_deref(),
        &message,
    );

    let detail = format!(
        "notes gateway {}: {} {} ({})",
        status,
        body.code.as_deref().unwrap_or("-"),
        message,
        body.details.as_deref().unwrap_or("")
    );

    match kind {
        ErrorKind::NotFound => ServiceError::note_not_found().with_detail(detail),
        ErrorKind::Unauthorized => {
            ServiceError::new(ErrorKind::Unauthorized, "Not authorized").with_detail(detail)
        }
        ErrorKind::Validation => {
            ServiceError::new(ErrorKind::Validation, "Invalid note data").with_detail(detail)
        }
        _ => {
            error!(status, detail = %detail, "Notes gateway request failed");
            ServiceError::storage(detail)
        }
    }
}

#[async_trait]
impl NoteRepository for RestNoteRepository {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list_by_user(&self, actor: &Actor) -> ServiceResult<Vec<Note>> {
        let request = self
            .http
            .get(self.table_url())
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", actor.user_id)),
                ("order", "updated_at.desc".to_string()),
            ])
            .bearer_auth(&actor.access_token);

        let mut notes: Vec<Note> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::StorageError))?;

        sort_by_recent_update(&mut notes);
        debug!(user_id = %actor.user_id, count = notes.len(), "Listed notes");
        Ok(notes)
    }

    async fn get_by_id(&self, actor: &Actor, id: Uuid) -> ServiceResult<Note> {
        let request = self
            .scoped(self.http.get(self.table_url()), actor, id)
            .query(&[("select", "*")]);
        self.single(request).await
    }

    async fn create(&self, actor: &Actor, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        let request = self
            .http
            .post(self.table_url())
            .bearer_auth(&actor.access_token)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({
                "user_id": actor.user_id,
                "title": input.title,
                "content": input.content,
            }));

        let note = self.single(request).await?;
        debug!(note_id = %note.id, user_id = %actor.user_id, "Note created");
        Ok(note)
    }

    async fn update(&self, actor: &Actor, id: Uuid, input: &NoteInput) -> ServiceResult<Note> {
        validate_note_fields(&input.title, &input.content)?;

        // updated_at is refreshed by the table trigger
        let request = self
            .scoped(self.http.patch(self.table_url()), actor, id)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({
                "title": input.title,
                "content": input.content,
            }));

        let note = self.single(request).await?;
        debug!(note_id = %id, user_id = %actor.user_id, "Note updated");
        Ok(note)
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let request = self
            .scoped(self.http.delete(self.table_url()), actor, id)
            .header("Prefer", RETURN_REPRESENTATION);

        let deleted: Vec<Note> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::from_transport(e, ErrorKind::StorageError))?;

        if deleted.is_empty() {
            return Err(ServiceError::note_not_found());
        }

        debug!(note_id = %id, user_id = %actor.user_id, "Note deleted");
        Ok(())
    }

    async fn health_check(&self) -> ServiceResult<()> {
        // Anonymous callers see zero rows under row-level security, but the
        // request still proves the table is reachable
        let request = self
            .http
            .get(self.table_url())
            .query(&[("select", "id"), ("limit", "0")])
            .bearer_auth(&self.config.anon_key);

        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RestNoteRepository {
        RestNoteRepository::new(ProviderConfig::new("https://demo.example.co/", "anon")).unwrap()
    }

    #[test]
    fn test_table_url() {
        assert_eq!(repo().table_url(), "https://demo.example.co/rest/v1/notes");
    }

    #[test]
    fn test_scoped_query_pins_owner() {
        let repo = repo();
        let actor = Actor::new(Uuid::new_v4(), "user-token");
        let id = Uuid::new_v4();

        let request = repo
            .scoped(repo.http.get(repo.table_url()), &actor, id)
            .build()
            .unwrap();

        let query = request.url().query().unwrap_or_default().to_string();
        assert!(query.contains(&format!("id=eq.{}", id)));
        assert!(query.contains(&format!("user_id=eq.{}", actor.user_id)));
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer user-token"
        );
    }

    #[tokio::test]
    async fn test_create_validates_before_network() {
        // Unroutable: a request would fail with NetworkError, not Validation
        let mut config = ProviderConfig::new("http://127.0.0.1:9", "anon");
        config.timeout_seconds = 1;
        let repo = RestNoteRepository::new(config).unwrap();
        let actor = Actor::new(Uuid::new_v4(), "t");

        let err = repo.create(&actor, &NoteInput::new(" ", "c")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = repo.list_by_user(&actor).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkError);
    }
}
