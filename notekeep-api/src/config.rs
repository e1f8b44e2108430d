/// Configuration management for the API server
///
/// Loaded from environment variables (a `.env` file is honoured) into typed
/// structs. Backend selection decides which of the remaining variables are
/// required.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default `*`)
/// - `API_PRODUCTION`: enables HSTS (default `false`)
/// - `NOTES_BACKEND`: `rest` | `postgres` | `memory` (default `rest`)
/// - `AUTH_BACKEND`: `hosted` | `local` (default `hosted`)
/// - `NOTEKEEP_PROVIDER_URL` / `NOTEKEEP_PROVIDER_ANON_KEY`: hosted project,
///   required by the `rest` and `hosted` backends
/// - `PROVIDER_TIMEOUT_SECS`: provider request timeout (default 15)
/// - `DATABASE_URL` / `DATABASE_MAX_CONNECTIONS`: required by `postgres`
/// - `LOCAL_JWT_SECRET`: required by `local`, at least 32 characters
/// - `LOCAL_REQUIRE_CONFIRMATION`: local sign-ups start unconfirmed
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use notekeep_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use notekeep_shared::auth::AuthBackend;
use notekeep_shared::notes::NotesBackend;
use notekeep_shared::provider::ProviderConfig;
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    pub notes_backend: NotesBackend,

    pub auth_backend: AuthBackend,

    /// Present when a hosted backend is selected
    pub provider: Option<ProviderConfig>,

    /// Present when `NOTES_BACKEND=postgres` (or `DATABASE_URL` is set)
    pub database: Option<DatabaseConfig>,

    /// Present when `AUTH_BACKEND=local`
    pub local_auth: Option<LocalAuthSettings>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode adds `Strict-Transport-Security`
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

/// Local auth provider configuration
#[derive(Clone)]
pub struct LocalAuthSettings {
    /// HS256 secret; keep it out of logs
    pub jwt_secret: String,

    pub require_confirmation: bool,
}

impl std::fmt::Debug for LocalAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("require_confirmation", &self.require_confirmation)
            .finish()
    }
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A variable the selected backends need is missing
    /// - A variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api = ApiConfig {
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("API_PORT"), 8080u16, "API_PORT")?,
            cors_origins: var("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            production: parse_bool(var("API_PRODUCTION")),
        };

        let notes_backend: NotesBackend =
            parse_or(var("NOTES_BACKEND"), NotesBackend::Rest, "NOTES_BACKEND")?;
        let auth_backend: AuthBackend =
            parse_or(var("AUTH_BACKEND"), AuthBackend::Hosted, "AUTH_BACKEND")?;

        let needs_provider =
            notes_backend == NotesBackend::Rest || auth_backend == AuthBackend::Hosted;
        let provider = match (var("NOTEKEEP_PROVIDER_URL"), var("NOTEKEEP_PROVIDER_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                let mut provider = ProviderConfig::new(url, anon_key);
                provider.timeout_seconds =
                    parse_or(var("PROVIDER_TIMEOUT_SECS"), 15u64, "PROVIDER_TIMEOUT_SECS")?;
                Some(provider)
            }
            _ if needs_provider => anyhow::bail!(
                "NOTEKEEP_PROVIDER_URL and NOTEKEEP_PROVIDER_ANON_KEY are required for \
                 NOTES_BACKEND=rest or AUTH_BACKEND=hosted"
            ),
            _ => None,
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    var("DATABASE_MAX_CONNECTIONS"),
                    10u32,
                    "DATABASE_MAX_CONNECTIONS",
                )?,
            }),
            None if notes_backend == NotesBackend::Postgres => {
                anyhow::bail!("DATABASE_URL environment variable is required for NOTES_BACKEND=postgres")
            }
            None => None,
        };

        let local_auth = if auth_backend == AuthBackend::Local {
            let jwt_secret = var("LOCAL_JWT_SECRET")
                .context("LOCAL_JWT_SECRET environment variable is required for AUTH_BACKEND=local")?;
            if jwt_secret.len() < 32 {
                anyhow::bail!("LOCAL_JWT_SECRET must be at least 32 characters long");
            }
            Some(LocalAuthSettings {
                jwt_secret,
                require_confirmation: parse_bool(var("LOCAL_REQUIRE_CONFIRMATION")),
            })
        } else {
            None
        };

        Ok(Self {
            api,
            notes_backend,
            auth_backend,
            provider,
            database,
            local_auth,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
