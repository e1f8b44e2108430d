/// End-to-end tests of the terminal commands against a live API
mod common;

use common::{login, register, run, TestServer, PASSWORD};
use notekeep_client::api::ClientError;
use notekeep_client::commands::{Command, NotesCommand};
use notekeep_shared::error::ErrorKind;

fn create(title: &str, content: &str) -> Command {
    Command::Notes(NotesCommand::Create {
        title: title.to_string(),
        content: content.to_string(),
    })
}

fn list(search: Option<&str>) -> Command {
    Command::Notes(NotesCommand::List {
        search: search.map(str::to_string),
    })
}

fn show(id: &str) -> Command {
    Command::Notes(NotesCommand::Show { id: id.to_string() })
}

/// Id printed by `notes create`
fn created_id(output: &str) -> String {
    output
        .trim()
        .trim_start_matches("Created note ")
        .trim_end_matches('.')
        .to_string()
}

#[tokio::test]
async fn test_register_persists_session_across_runs() {
    let server = TestServer::start().await;
    let (terminal, file) = server.terminal();
    terminal.start().await.unwrap();

    let (result, out) = run(&terminal, register("Ada", "ada@example.com"), "").await;
    result.unwrap();
    assert_eq!(out, "Account created! Signed in as ada@example.com.\n");
    assert!(file.load().await.unwrap().is_some());

    // A later invocation picks the session up from disk
    let next = server.terminal_with_file(&file);
    next.start().await.unwrap();
    let (result, out) = run(&next, Command::Whoami, "").await;
    result.unwrap();
    assert_eq!(out, "Ada <ada@example.com>\n");
}

#[tokio::test]
async fn test_login_prompts_for_password() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();
    run(&terminal, Command::Logout, "").await.0.unwrap();

    let command = Command::Login {
        email: "ada@example.com".to_string(),
        password: None,
    };
    let (result, out) = run(&terminal, command, &format!("{}\n", PASSWORD)).await;

    result.unwrap();
    assert_eq!(out, "Password: Signed in as ada@example.com.\n");
}

#[tokio::test]
async fn test_wrong_password_stays_signed_out() {
    let server = TestServer::start().await;
    let (terminal, file) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();
    run(&terminal, Command::Logout, "").await.0.unwrap();

    let (result, _) = run(&terminal, login("ada@example.com", "wrong-password"), "").await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(
        notekeep_client::messages::for_client_error(&err),
        "Invalid email or password"
    );
    assert!(terminal.store().current_user().await.is_none());
    assert!(file.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_registration() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let (result, _) = run(&terminal, register("Ada", "ada@example.com"), "").await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_notes_need_a_session() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    terminal.start().await.unwrap();

    let (result, _) = run(&terminal, list(None), "").await;
    assert!(matches!(result, Err(ClientError::NotSignedIn)));
}

#[tokio::test]
async fn test_note_lifecycle() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let (_, out) = run(&terminal, list(None), "").await;
    assert_eq!(out, "No notes yet. Create your first note!\n");

    let (result, out) = run(&terminal, create("Groceries", "Milk, eggs"), "").await;
    result.unwrap();
    let id = created_id(&out);
    run(&terminal, create("Books", "Dune"), "").await.0.unwrap();

    // Search filters client-side
    let (_, out) = run(&terminal, list(Some("MILK")), "").await;
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("Groceries"));

    let (_, out) = run(&terminal, list(Some("bread")), "").await;
    assert_eq!(out, "No notes found matching your search.\n");

    // Show by unique prefix
    let (result, out) = run(&terminal, show(&id[..8]), "").await;
    result.unwrap();
    assert!(out.starts_with("Groceries\n"));
    assert!(out.contains(&format!("id:      {}", id)));
    assert!(out.trim_end().ends_with("Milk, eggs"));

    // Edit keeps the title when only content is given
    let edit = Command::Notes(NotesCommand::Edit {
        id: id.clone(),
        title: None,
        content: Some("Milk, eggs, bread".to_string()),
    });
    run(&terminal, edit, "").await.0.unwrap();
    let (_, out) = run(&terminal, show(&id), "").await;
    assert!(out.starts_with("Groceries\n"));
    assert!(out.contains("Milk, eggs, bread"));

    // The edited note now lists first
    let (_, out) = run(&terminal, list(None), "").await;
    assert!(out.lines().next().unwrap().ends_with("Groceries"));

    // Declining the prompt keeps the note
    let delete = |yes| {
        Command::Notes(NotesCommand::Delete {
            id: id.clone(),
            yes,
        })
    };
    let (result, out) = run(&terminal, delete(false), "n\n").await;
    result.unwrap();
    assert!(out.ends_with("Cancelled.\n"));
    assert_eq!(server.notes.len().await, 2);

    let (result, _) = run(&terminal, delete(false), "y\n").await;
    result.unwrap();
    assert_eq!(server.notes.len().await, 1);

    let (result, _) = run(&terminal, show(&id), "").await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_create_validation_is_shown_verbatim() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let (result, _) = run(&terminal, create("   ", "content"), "").await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        notekeep_client::messages::for_client_error(&err),
        "Title is required"
    );
}

#[tokio::test]
async fn test_groceries_are_private() {
    let server = TestServer::start().await;

    let (u1, _) = server.terminal();
    run(&u1, register("U1", "u1@example.com"), "").await.0.unwrap();
    let (_, out) = run(&u1, create("Groceries", "Milk, eggs"), "").await;
    let id = created_id(&out);

    let (u2, _) = server.terminal();
    run(&u2, register("U2", "u2@example.com"), "").await.0.unwrap();

    let (_, out) = run(&u2, list(None), "").await;
    assert_eq!(out, "No notes yet. Create your first note!\n");

    let (result, _) = run(&u2, show(&id), "").await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);

    let delete = Command::Notes(NotesCommand::Delete {
        id: id.clone(),
        yes: true,
    });
    let (result, _) = run(&u2, delete, "").await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);

    let (result, out) = run(&u1, show(&id), "").await;
    result.unwrap();
    assert!(out.starts_with("Groceries\n"));
}

#[tokio::test]
async fn test_import_reports_failures() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let path = common::temp_session_path().with_file_name("notes.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"[
            {"id": "legacy-1", "title": "Groceries", "content": "Milk"},
            {"title": "", "content": "orphan"},
            {"title": "Books", "content": "Dune", "userId": "legacy-user"}
        ]"#,
    )
    .unwrap();

    let (result, out) = run(&terminal, Command::Import { file: path }, "").await;
    result.unwrap();

    assert!(out.contains("Skipped note 2 (\"\"): Title is required"));
    assert!(out.ends_with("Imported 2 of 3 notes.\n"));
    assert_eq!(server.notes.len().await, 2);
}

#[tokio::test]
async fn test_import_rejects_malformed_file() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let path = common::temp_session_path().with_file_name("broken.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

    let (result, _) = run(&terminal, Command::Import { file: path }, "").await;
    assert!(matches!(result, Err(ClientError::Json(_))));
}

#[tokio::test]
async fn test_logout_clears_saved_session() {
    let server = TestServer::start().await;
    let (terminal, file) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let (result, out) = run(&terminal, Command::Logout, "").await;
    result.unwrap();
    assert_eq!(out, "Signed out.\n");
    assert!(file.load().await.unwrap().is_none());

    let (_, out) = run(&terminal, Command::Whoami, "").await;
    assert_eq!(out, "Not signed in.\n");
}

#[tokio::test]
async fn test_diagnose() {
    let server = TestServer::start().await;
    let (terminal, _) = server.terminal();
    run(&terminal, register("Ada", "ada@example.com"), "").await.0.unwrap();

    let (result, out) = run(&terminal, Command::Diagnose, "").await;
    result.unwrap();

    assert!(out.contains(&format!("API URL:       {}", server.base_url)));
    assert!(out.contains("Auth provider: api"));
    assert!(out.contains("API:           healthy"));
    assert!(out.contains("auth local reachable, storage memory reachable"));
    assert!(out.contains("signed in as ada@example.com"));
}
