/// Session store and API client against a live API
mod common;

use common::{TestServer, PASSWORD};
use notekeep_client::session::{SessionStore, SignUpResult};
use notekeep_shared::auth::hosted::HostedAuthProvider;
use notekeep_shared::error::ErrorKind;
use notekeep_shared::models::NoteInput;
use notekeep_shared::provider::ProviderConfig;
use std::sync::Arc;

/// A hosted provider nothing listens for
fn unreachable_provider() -> Arc<HostedAuthProvider> {
    let mut config = ProviderConfig::new("http://127.0.0.1:1", "anon-key");
    config.timeout_seconds = 2;
    Arc::new(HostedAuthProvider::new(config).unwrap())
}

#[tokio::test]
async fn test_sign_up_through_api() {
    let server = TestServer::start().await;
    let store = SessionStore::new(server.api());

    let result = store.sign_up("Ada", "ada@example.com", PASSWORD).await.unwrap();

    assert!(matches!(result, SignUpResult::SignedIn(_)));
    assert_eq!(result.user().name.as_deref(), Some("Ada"));
    assert_eq!(server.auth.account_count().await, 1);
}

#[tokio::test]
async fn test_unreachable_provider_falls_back_to_register_route() {
    let server = TestServer::start().await;
    let store = SessionStore::new(unreachable_provider()).with_fallback(server.api());

    let result = store.sign_up("Ada", "ada@example.com", PASSWORD).await.unwrap();

    // Registered through the API; the follow-up sign-in still hits the
    // unreachable provider
    assert!(result.needs_login());
    assert_eq!(result.user().email, "ada@example.com");
    assert_eq!(server.auth.account_count().await, 1);
    assert!(store.current_user().await.is_none());
}

#[tokio::test]
async fn test_fallback_failure_is_returned() {
    let server = TestServer::start().await;
    server
        .api()
        .register(&notekeep_shared::models::SignUpRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let store = SessionStore::new(unreachable_provider()).with_fallback(server.api());
    let err = store
        .sign_up("Ada", "ada@example.com", PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_unreachable_provider_without_fallback() {
    let store = SessionStore::new(unreachable_provider());

    let err = store
        .sign_up("Ada", "ada@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
}

#[tokio::test]
async fn test_api_client_notes_round_trip() {
    let server = TestServer::start().await;
    let api = server.api();
    let store = SessionStore::new(api.clone());
    store.sign_up("Ada", "ada@example.com", PASSWORD).await.unwrap();
    let token = store.access_token().await.unwrap();

    let created = api
        .create_note(&token, &NoteInput::new("Groceries", "Milk"))
        .await
        .unwrap();
    assert_eq!(created.created_at, created.updated_at);

    let updated = api
        .update_note(&token, created.id, &NoteInput::new("Groceries", "Milk, eggs"))
        .await
        .unwrap();
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(api.get_note(&token, created.id).await.unwrap(), updated);

    let err = api
        .update_note(&token, created.id, &NoteInput::new("", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    api.delete_note(&token, created.id).await.unwrap();
    let err = api.delete_note(&token, created.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(api.list_notes(&token).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_token_is_unauthenticated() {
    let server = TestServer::start().await;

    let err = server.api().list_notes("not-a-token").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn test_health_report() {
    let server = TestServer::start().await;

    let report = server.api().health().await.unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.auth.backend, "local");
    assert_eq!(report.storage.backend, "memory");
}
