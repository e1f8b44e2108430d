/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "auth": { "backend": "hosted", "status": "reachable" },
///   "storage": { "backend": "rest", "status": "reachable" }
/// }
/// ```
///
/// Always `200`; `status` is `degraded` when either provider is unreachable.

use crate::app::AppState;
use axum::{extract::State, Json};
use notekeep_shared::error::ServiceResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    pub auth: ComponentHealth,

    pub storage: ComponentHealth,
}

/// One provider's reachability
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub backend: String,

    /// `reachable` or `unreachable`
    pub status: String,
}

impl ComponentHealth {
    fn from_probe(backend: &str, probe: ServiceResult<()>) -> Self {
        let status = match probe {
            Ok(()) => "reachable",
            Err(err) => {
                warn!(backend, code = %err.kind, detail = err.detail().unwrap_or("-"), "Health probe failed");
                "unreachable"
            }
        };

        Self {
            backend: backend.to_string(),
            status: status.to_string(),
        }
    }

    fn is_reachable(&self) -> bool {
        self.status == "reachable"
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (auth_probe, storage_probe) =
        tokio::join!(state.auth.health_check(), state.notes.health_check());

    let auth = ComponentHealth::from_probe(state.auth.name(), auth_probe);
    let storage = ComponentHealth::from_probe(state.notes.name(), storage_probe);

    let status = if auth.is_reachable() && storage.is_reachable() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth,
        storage,
    })
}
