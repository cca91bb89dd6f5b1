//! Liveness endpoint
//!
//! `/health` reports 200 whenever the process is serving; it does not query
//! the store.

use hyper::StatusCode;
use serde::Serialize;

use super::response::{json_response, HttpResponse};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    /// Store backend in use
    pub store: &'static str,
    pub uptime: u64,
    pub timestamp: String,
}

/// GET /health
pub fn health_check(state: &AppState) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
            mode: if state.args.dev_mode {
                "development"
            } else {
                "production"
            },
            store: state.store.backend(),
            uptime: state.started_at.elapsed().as_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}
