/// Terminal commands
///
/// The presentation layer: every command reads its input, calls the session
/// store or the notes API, and prints a result. No business rules live here;
/// validation and ownership are the server's.
///
/// # Commands
///
/// ```text
/// notekeep register --name <NAME> --email <EMAIL> [--password <PW>]
/// notekeep login --email <EMAIL> [--password <PW>]
/// notekeep logout
/// notekeep whoami
/// notekeep notes list [--search <TERM>]
/// notekeep notes show <ID>
/// notekeep notes create --title <T> --content <C>
/// notekeep notes edit <ID> [--title <T>] [--content <C>]
/// notekeep notes delete <ID> [--yes]
/// notekeep diagnose
/// notekeep import <FILE.json>
/// ```
///
/// Note ids may be abbreviated to any unique prefix of at least
/// [`MIN_ID_PREFIX`] characters, as printed by `notes list`.
use crate::api::{ApiClient, ClientError};
use crate::session::{SessionEvent, SessionStore, SignUpResult, Subscription};
use crate::session_file::SessionFile;
use crate::settings::{AuthMode, Settings};
use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use notekeep_shared::auth::hosted::HostedAuthProvider;
use notekeep_shared::error::ServiceError;
use notekeep_shared::models::note::matches_search;
use notekeep_shared::models::{Note, NoteInput};
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Shortest accepted id abbreviation
pub const MIN_ID_PREFIX: usize = 4;

/// Characters of the id shown by `notes list`
const SHORT_ID: usize = 8;

/// Creates in flight at once during `import`
const IMPORT_CONCURRENCY: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "notekeep", version, about = "Terminal client for notekeep")]
pub struct Cli {
    /// Config file (default: <config dir>/notekeep/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long, env = "NOTEKEEP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long, env = "NOTEKEEP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Work with notes
    #[command(subcommand)]
    Notes(NotesCommand),

    /// Check configuration, API reachability and the session
    Diagnose,

    /// Create notes from a JSON array of `{title, content}` objects
    Import { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum NotesCommand {
    /// List notes, most recently edited first
    List {
        /// Case-insensitive filter on title and content
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print one note
    Show { id: String },

    /// Create a note
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,
    },

    /// Replace a note's title and/or content
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,
    },

    /// Delete a note
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// One entry of an import file; extra fields are ignored
#[derive(Debug, Deserialize)]
struct ImportedNote {
    #[serde(default)]
    title: String,

    #[serde(default)]
    content: String,
}

/// Command runner bound to one API and one session store
pub struct Terminal {
    api: Arc<ApiClient>,
    store: SessionStore,
    session_file: Option<SessionFile>,
    _transitions: Subscription,
}

impl Terminal {
    /// Must be called from within a Tokio runtime
    pub fn new(api: Arc<ApiClient>, store: SessionStore, session_file: Option<SessionFile>) -> Self {
        let transitions = store.subscribe(|event: SessionEvent| match event {
            SessionEvent::SignedIn(user) => debug!(user_id = %user.id, "Session: signed in"),
            SessionEvent::SignedOut => debug!("Session: signed out"),
            SessionEvent::TokenRefreshed(user) => debug!(user_id = %user.id, "Session: refreshed"),
            SessionEvent::InitialSession(user) => {
                debug!(restored = user.is_some(), "Session: initialised")
            }
        });

        Self {
            api,
            store,
            session_file,
            _transitions: transitions,
        }
    }

    /// Wires the API client and auth provider selected by `settings`
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api = Arc::new(
            ApiClient::new(&settings.api_url, settings.timeout())
                .context("Failed to build the API client")?,
        );

        let store = match settings.auth {
            AuthMode::Api => SessionStore::new(api.clone()),
            AuthMode::Hosted => {
                let provider = settings.provider_config().context(
                    "auth = \"hosted\" needs provider_url and provider_anon_key \
                     (NOTEKEEP_PROVIDER_URL / NOTEKEEP_PROVIDER_ANON_KEY)",
                )?;
                let hosted =
                    HostedAuthProvider::new(provider).context("Failed to build the auth client")?;
                SessionStore::new(Arc::new(hosted)).with_fallback(api.clone())
            }
        };

        let session_file = settings.session_path().map(SessionFile::new);
        Ok(Self::new(api, store, session_file))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Restores the saved session, refreshing it if it expired
    ///
    /// A corrupt session file is discarded.
    pub async fn start(&self) -> Result<(), ClientError> {
        let persisted = match &self.session_file {
            Some(file) => match file.load().await {
                Ok(session) => session,
                Err(e) => {
                    debug!(error = %e, "Discarding unreadable session file");
                    file.clear().await?;
                    None
                }
            },
            None => None,
        };

        // Rewrite after init: the session may have been refreshed or dropped
        let had_session = persisted.is_some();
        self.store.init(persisted).await;
        if had_session {
            self.persist().await?;
        }
        Ok(())
    }

    /// Stops listeners
    pub fn finish(&self) {
        self.store.shutdown();
    }

    /// Writes the current session (or its absence) to the session file
    async fn persist(&self) -> Result<(), ClientError> {
        let Some(file) = &self.session_file else {
            return Ok(());
        };
        match self.store.session().await {
            Some(session) => file.save(&session).await,
            None => file.clear().await,
        }
    }

    async fn token(&self) -> Result<String, ClientError> {
        self.store.access_token().await.ok_or(ClientError::NotSignedIn)
    }

    /// Runs one command
    ///
    /// Prompts read from `input`; all output goes to `out`.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        command: Command,
        input: &mut R,
        out: &mut W,
    ) -> Result<(), ClientError> {
        match command {
            Command::Register {
                name,
                email,
                password,
            } => {
                let password = password_or_prompt(password, input, out)?;
                self.register(&name, &email, &password, out).await
            }
            Command::Login { email, password } => {
                let password = password_or_prompt(password, input, out)?;
                self.login(&email, &password, out).await
            }
            Command::Logout => self.logout(out).await,
            Command::Whoami => self.whoami(out).await,
            Command::Notes(notes) => self.notes(notes, input, out).await,
            Command::Diagnose => self.diagnose(out).await,
            Command::Import { file } => self.import(&file, out).await,
        }
    }

    async fn register<W: Write>(
        &self,
        name: &str,
        email: &str,
        password: &str,
        out: &mut W,
    ) -> Result<(), ClientError> {
        let result = self.store.sign_up(name, email, password).await?;
        self.persist().await?;

        match result {
            SignUpResult::SignedIn(user) => {
                writeln!(out, "Account created! Signed in as {}.", user.email)?;
            }
            SignUpResult::ConfirmationRequired(_) => {
                writeln!(
                    out,
                    "Please check your email to confirm your account before logging in."
                )?;
            }
            SignUpResult::NeedsLogin(_) => {
                writeln!(
                    out,
                    "Account created successfully! Please log in to continue."
                )?;
            }
        }
        Ok(())
    }

    async fn login<W: Write>(
        &self,
        email: &str,
        password: &str,
        out: &mut W,
    ) -> Result<(), ClientError> {
        let user = self.store.sign_in(email, password).await?;
        self.persist().await?;

        writeln!(out, "Signed in as {}.", user.email)?;
        Ok(())
    }

    async fn logout<W: Write>(&self, out: &mut W) -> Result<(), ClientError> {
        if self.store.current_user().await.is_none() {
            writeln!(out, "Not signed in.")?;
            return Ok(());
        }

        self.store.sign_out().await;
        self.persist().await?;
        writeln!(out, "Signed out.")?;
        Ok(())
    }

    async fn whoami<W: Write>(&self, out: &mut W) -> Result<(), ClientError> {
        match self.store.current_user().await {
            Some(user) => match &user.name {
                Some(name) => writeln!(out, "{} <{}>", name, user.email)?,
                None => writeln!(out, "{}", user.email)?,
            },
            None => writeln!(out, "Not signed in.")?,
        }
        Ok(())
    }

    async fn notes<R: BufRead, W: Write>(
        &self,
        command: NotesCommand,
        input: &mut R,
        out: &mut W,
    ) -> Result<(), ClientError> {
        let token = self.token().await?;

        match command {
            NotesCommand::List { search } => {
                let notes = self.api.list_notes(&token).await?;
                let term = search.unwrap_or_default();
                let shown: Vec<&Note> = notes.iter().filter(|n| matches_search(n, &term)).collect();

                if shown.is_empty() {
                    if term.trim().is_empty() {
                        writeln!(out, "No notes yet. Create your first note!")?;
                    } else {
                        writeln!(out, "No notes found matching your search.")?;
                    }
                }
                for note in shown {
                    write_summary(note, out)?;
                }
            }
            NotesCommand::Show { id } => {
                let id = self.resolve_id(&token, &id).await?;
                let note = self.api.get_note(&token, id).await?;
                write_note(&note, out)?;
            }
            NotesCommand::Create { title, content } => {
                let note = self
                    .api
                    .create_note(&token, &NoteInput::new(title, content))
                    .await?;
                writeln!(out, "Created note {}.", note.id)?;
            }
            NotesCommand::Edit { id, title, content } => {
                let id = self.resolve_id(&token, &id).await?;
                let current = self.api.get_note(&token, id).await?;
                let input = NoteInput::new(
                    title.unwrap_or(current.title),
                    content.unwrap_or(current.content),
                );

                let note = self.api.update_note(&token, id, &input).await?;
                writeln!(out, "Updated note {}.", note.id)?;
            }
            NotesCommand::Delete { id, yes } => {
                let id = self.resolve_id(&token, &id).await?;
                if !yes && !confirm("Are you sure you want to delete this note?", input, out)? {
                    writeln!(out, "Cancelled.")?;
                    return Ok(());
                }

                self.api.delete_note(&token, id).await?;
                writeln!(out, "Deleted note {}.", id)?;
            }
        }
        Ok(())
    }

    /// Full id, or a unique prefix of one of the user's notes
    async fn resolve_id(&self, token: &str, raw: &str) -> Result<Uuid, ClientError> {
        let raw = raw.trim().to_lowercase();
        if let Ok(id) = Uuid::parse_str(&raw) {
            return Ok(id);
        }
        if raw.chars().count() < MIN_ID_PREFIX {
            return Err(ServiceError::note_not_found().into());
        }

        let notes = self.api.list_notes(token).await?;
        let mut matches = notes
            .iter()
            .filter(|n| n.id.to_string().starts_with(&raw))
            .map(|n| n.id);

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(ServiceError::note_not_found().into()),
            (Some(_), Some(_)) => Err(ServiceError::validation(
                "id",
                format!("Note id '{}' is ambiguous; use more characters", raw),
            )
            .into()),
        }
    }

    async fn diagnose<W: Write>(&self, out: &mut W) -> Result<(), ClientError> {
        writeln!(out, "API URL:       {}", self.api.base_url())?;
        writeln!(out, "Auth provider: {}", self.store.provider_name())?;
        if let Some(file) = &self.session_file {
            writeln!(out, "Session file:  {}", file.path().display())?;
        }

        match self.api.health().await {
            Ok(report) => writeln!(
                out,
                "API:           {} (v{}; auth {} {}, storage {} {})",
                report.status,
                report.version,
                report.auth.backend,
                report.auth.status,
                report.storage.backend,
                report.storage.status
            )?,
            Err(e) => writeln!(out, "API:           unreachable ({})", e)?,
        }

        match self.store.current_user().await {
            Some(user) => writeln!(out, "Session:       signed in as {}", user.email)?,
            None => writeln!(out, "Session:       none (log in to create one)")?,
        }
        Ok(())
    }

    async fn import<W: Write>(&self, path: &Path, out: &mut W) -> Result<(), ClientError> {
        let token = self.token().await?;
        let raw = tokio::fs::read(path).await?;
        let entries: Vec<ImportedNote> = serde_json::from_slice(&raw)?;

        let total = entries.len();
        let token = token.as_str();

        // Results come back in file order
        let results: Vec<(NoteInput, Result<Note, ClientError>)> = stream::iter(entries)
            .map(|entry| async move {
                let input = NoteInput::new(entry.title, entry.content);
                let result = self.api.create_note(token, &input).await;
                (input, result)
            })
            .buffered(IMPORT_CONCURRENCY)
            .collect()
            .await;

        let mut imported = 0;
        for (index, (input, result)) in results.into_iter().enumerate() {
            match result {
                Ok(_) => imported += 1,
                Err(e) => writeln!(
                    out,
                    "Skipped note {} ({:?}): {}",
                    index + 1,
                    input.title,
                    crate::messages::for_client_error(&e)
                )?,
            }
        }

        writeln!(out, "Imported {} of {} notes.", imported, total)?;
        Ok(())
    }
}

fn write_summary<W: Write>(note: &Note, out: &mut W) -> std::io::Result<()> {
    let id = note.id.to_string();
    writeln!(
        out,
        "{}  {}  {}",
        &id[..SHORT_ID],
        note.updated_at.format("%Y-%m-%d %H:%M"),
        note.title
    )
}

fn write_note<W: Write>(note: &Note, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", note.title)?;
    writeln!(out, "id:      {}", note.id)?;
    writeln!(out, "created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "updated: {}", note.updated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out)?;
    writeln!(out, "{}", note.content)
}

fn prompt<R: BufRead, W: Write>(label: &str, input: &mut R, out: &mut W) -> std::io::Result<String> {
    write!(out, "{}", label)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn password_or_prompt<R: BufRead, W: Write>(
    password: Option<String>,
    input: &mut R,
    out: &mut W,
) -> std::io::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt("Password: ", input, out),
    }
}

fn confirm<R: BufRead, W: Write>(question: &str, input: &mut R, out: &mut W) -> std::io::Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", question), input, out)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
