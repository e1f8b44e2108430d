//! Connection settings for the hosted backend-as-a-service
//!
//! Both the hosted auth provider and the REST notes backend talk to the same
//! project: one base URL and one public (anon) API key. Every request carries
//! the key in the `apikey` header; the `Authorization` header holds either the
//! anon key or the caller's access token.

use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

/// Hosted provider project settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Project base URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,

    /// Public API key; safe to ship to clients
    pub anon_key: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout_seconds: 15,
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Builds an HTTP client that sends the `apikey` header on every request
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid header value or the TLS
    /// backend cannot be initialised
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", value);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .user_agent(concat!("notekeep/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}
