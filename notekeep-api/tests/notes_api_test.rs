/// Integration tests for the notes endpoints
///
/// Covers the ownership, ordering and timestamp guarantees end-to-end.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::TestContext;
use serde_json::{json, Value};

fn timestamp(note: &Value, field: &str) -> DateTime<Utc> {
    note[field].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_notes_require_bearer_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/notes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert_eq!(body["error"], "No authorization header");

    let (status, body) = ctx
        .send("GET", "/notes", Some("Bearer not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, _) = ctx.send("GET", "/notes", Some("Basic abc"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_then_get() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    let note = ctx.create_note(&ada, "Groceries", "Milk, eggs").await;
    assert_eq!(note["user_id"], ada.id.to_string());
    assert_eq!(timestamp(&note, "created_at"), timestamp(&note, "updated_at"));

    let uri = format!("/notes/{}", note["id"].as_str().unwrap());
    let (status, body) = ctx.send("GET", &uri, Some(&ada.auth_header()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["title"], "Groceries");
    assert_eq!(body["note"]["content"], "Milk, eggs");
    assert_eq!(body["note"]["id"], note["id"]);
}

#[tokio::test]
async fn test_create_validation() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let auth = ada.auth_header();

    let (status, body) = ctx
        .send("POST", "/notes", Some(&auth), Some(json!({ "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
    assert_eq!(body["field"], "title");

    let (status, body) = ctx
        .send(
            "POST",
            "/notes",
            Some(&auth),
            Some(json!({ "title": "t", "content": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "content");

    let (status, _) = ctx
        .send(
            "POST",
            "/notes",
            Some(&auth),
            Some(json!({ "title": "x".repeat(501), "content": "c" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(ctx.notes.is_empty().await);
}

#[tokio::test]
async fn test_update_refreshes_updated_at() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let note = ctx.create_note(&ada, "Groceries", "Milk").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());

    let (status, body) = ctx
        .send(
            "PUT",
            &uri,
            Some(&ada.auth_header()),
            Some(json!({ "title": "Groceries", "content": "Milk, eggs, bread" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = ctx.send("GET", &uri, Some(&ada.auth_header()), None).await;
    let fetched = &fetched["note"];

    assert_eq!(fetched["content"], "Milk, eggs, bread");
    assert_eq!(fetched, &body["note"]);
    assert!(timestamp(fetched, "updated_at") > timestamp(&note, "updated_at"));
    assert_eq!(timestamp(fetched, "created_at"), timestamp(&note, "created_at"));
}

#[tokio::test]
async fn test_update_with_empty_title_leaves_note_unchanged() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let note = ctx.create_note(&ada, "Groceries", "Milk").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());

    let (status, body) = ctx
        .send(
            "PUT",
            &uri,
            Some(&ada.auth_header()),
            Some(json!({ "title": "", "content": "changed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "title");

    let (_, fetched) = ctx.send("GET", &uri, Some(&ada.auth_header()), None).await;
    assert_eq!(fetched["note"], note);
}

#[tokio::test]
async fn test_delete_then_get_and_delete_again() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let note = ctx.create_note(&ada, "Groceries", "Milk").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());
    let auth = ada.auth_header();

    let (status, body) = ctx.send("DELETE", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted successfully");

    let (status, body) = ctx.send("GET", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = ctx.send("DELETE", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_sorted_by_recent_update() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let auth = ada.auth_header();

    let first = ctx.create_note(&ada, "first", "a").await;
    let second = ctx.create_note(&ada, "second", "b").await;
    let third = ctx.create_note(&ada, "third", "c").await;

    // Editing the oldest moves it to the top
    let uri = format!("/notes/{}", first["id"].as_str().unwrap());
    ctx.send(
        "PUT",
        &uri,
        Some(&auth),
        Some(json!({ "title": "first", "content": "edited" })),
    )
    .await;

    let (status, body) = ctx.send("GET", "/notes", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);

    let notes = body["notes"].as_array().unwrap();
    let ids: Vec<&Value> = notes.iter().map(|n| &n["id"]).collect();
    assert_eq!(ids, vec![&first["id"], &third["id"], &second["id"]]);

    let stamps: Vec<DateTime<Utc>> = notes.iter().map(|n| timestamp(n, "updated_at")).collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_empty_list() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    let (status, body) = ctx.send("GET", "/notes", Some(&ada.auth_header()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "notes": [] }));
}

#[tokio::test]
async fn test_groceries_are_private_to_their_owner() {
    let ctx = TestContext::new();
    let u1 = ctx.user("u1@example.com").await;
    let u2 = ctx.user("u2@example.com").await;

    let note = ctx.create_note(&u1, "Groceries", "Milk, eggs").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());
    let u2_auth = u2.auth_header();

    let (_, body) = ctx.send("GET", "/notes", Some(&u2_auth), None).await;
    assert_eq!(body["notes"], json!([]));

    let (status, body) = ctx.send("GET", &uri, Some(&u2_auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");

    let (status, _) = ctx
        .send(
            "PUT",
            &uri,
            Some(&u2_auth),
            Some(json!({ "title": "Hacked", "content": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send("DELETE", &uri, Some(&u2_auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still intact for its owner
    let (status, body) = ctx.send("GET", &uri, Some(&u1.auth_header()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"], note);

    let (_, body) = ctx.send("GET", "/notes", Some(&u1.auth_header()), None).await;
    assert_eq!(body["notes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    let (status, body) = ctx
        .send("GET", "/notes/not-a-uuid", Some(&ada.auth_header()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let ctx = TestContext::new();

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
}
