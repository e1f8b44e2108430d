//! Terminal client settings
//!
//! Layered with the `config` crate, later layers winning:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the notekeep config directory (or `--config <file>`),
//!    optional
//! 3. `NOTEKEEP_*` environment variables, e.g. `NOTEKEEP_API_URL`,
//!    `NOTEKEEP_AUTH=hosted`, `NOTEKEEP_PROVIDER_URL`,
//!    `NOTEKEEP_PROVIDER_ANON_KEY`
//!
//! ```toml
//! api_url = "https://notes.example.com"
//! auth = "hosted"
//! provider_url = "https://xyzcompany.supabase.co"
//! provider_anon_key = "public-anon-key"
//! timeout_seconds = 15
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use notekeep_shared::provider::ProviderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "notekeep";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";
const ENV_PREFIX: &str = "NOTEKEEP";

/// Where sign-in and sign-up go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Through the notekeep API's `/auth` routes
    Api,

    /// Straight to the hosted provider, with the API as registration fallback
    Hosted,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// notekeep API base URL
    pub api_url: String,

    pub auth: AuthMode,

    #[serde(default)]
    pub provider_url: Option<String>,

    #[serde(default)]
    pub provider_anon_key: Option<String>,

    /// HTTP request timeout
    pub timeout_seconds: u64,

    /// Overrides the session file location
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

/// `<config dir>/notekeep`, if the platform has a config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

impl Settings {
    /// Loads defaults, the optional config file and `NOTEKEEP_*` variables
    ///
    /// `file` overrides the default config file location.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = file
            .map(Path::to_path_buf)
            .or_else(|| config_dir().map(|dir| dir.join(CONFIG_FILE)));
        Self::build(file.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("api_url", "http://localhost:8080")?
            .set_default("auth", "api")?
            .set_default("timeout_seconds", 15)?;

        if let Some(path) = file {
            builder = builder.add_source(
                File::with_name(&path.to_string_lossy())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Where the session is persisted between runs
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join(SESSION_FILE)))
    }

    /// Hosted provider settings, when both URL and key are set
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        let url = self.provider_url.as_deref().filter(|v| !v.trim().is_empty())?;
        let key = self
            .provider_anon_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())?;

        let mut config = ProviderConfig::new(url, key);
        config.timeout_seconds = self.timeout_seconds;
        Some(config)
    }
}
