/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use notekeep_api::{app::AppState, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::from_config(config).await?;
/// let app = notekeep_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_bearer, security::SecurityHeadersLayer},
};
use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use notekeep_shared::auth::{
    hosted::HostedAuthProvider,
    local::{LocalAuthConfig, LocalAuthProvider},
    AuthBackend, AuthProvider,
};
use notekeep_shared::db::pool::{create_pool, DatabaseConfig};
use notekeep_shared::notes::{
    memory::MemoryNoteRepository, postgres::PgNoteRepository, rest::RestNoteRepository,
    NoteRepository, NotesBackend,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Shared application state
///
/// Cloned into every handler; the providers sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Identity provider
    pub auth: Arc<dyn AuthProvider>,

    /// Note storage
    pub notes: Arc<dyn NoteRepository>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        notes: Arc<dyn NoteRepository>,
        config: Config,
    ) -> Self {
        Self {
            auth,
            notes,
            config: Arc::new(config),
        }
    }

    /// Builds the providers the configuration selects
    ///
    /// # Errors
    ///
    /// Returns an error if a required section is missing, an HTTP client
    /// cannot be built, or the database is unreachable
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let auth: Arc<dyn AuthProvider> = match config.auth_backend {
            AuthBackend::Hosted => {
                let provider = config
                    .provider
                    .clone()
                    .context("hosted auth requires provider settings")?;
                Arc::new(HostedAuthProvider::new(provider)?)
            }
            AuthBackend::Local => {
                let settings = config
                    .local_auth
                    .clone()
                    .context("local auth requires LOCAL_JWT_SECRET")?;
                let mut local = LocalAuthConfig::new(settings.jwt_secret);
                local.require_confirmation = settings.require_confirmation;
                Arc::new(LocalAuthProvider::new(local))
            }
        };

        let notes: Arc<dyn NoteRepository> = match config.notes_backend {
            NotesBackend::Rest => {
                let provider = config
                    .provider
                    .clone()
                    .context("rest notes backend requires provider settings")?;
                Arc::new(RestNoteRepository::new(provider)?)
            }
            NotesBackend::Postgres => {
                let database = config
                    .database
                    .clone()
                    .context("postgres notes backend requires DATABASE_URL")?;
                let pool = create_pool(DatabaseConfig {
                    url: database.url,
                    max_connections: database.max_connections,
                    ..Default::default()
                })
                .await
                .context("Failed to connect to the notes database")?;
                Arc::new(PgNoteRepository::new(pool))
            }
            NotesBackend::Memory => Arc::new(MemoryNoteRepository::new()),
        };

        info!(
            auth = auth.name(),
            notes = notes.name(),
            "Providers initialised"
        );

        Ok(Self::new(auth, notes, config))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health             # Provider reachability (public)
/// ├── /auth/                   # Public
/// │   ├── POST /register
/// │   └── POST /login
/// └── /notes/                  # Bearer token required
///     ├── GET    /             # List
///     ├── POST   /             # Create
///     ├── GET    /:id          # Read
///     ├── PUT    /:id          # Update
///     └── DELETE /:id          # Delete
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS
/// 3. Logging (tower-http TraceLayer)
/// 4. Bearer authentication (notes routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let note_routes = Router::new()
        .route(
            "/",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/:id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/notes", note_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
