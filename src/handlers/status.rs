//! Health and metrics handlers
//!
//! - `/health` - Simple liveness check for load balancers
//! - `/metrics` - Prometheus text exposition of the donation counters
//!
//! # Example Response
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptime_seconds": 3600,
//!   "webhook_enabled": true
//! }
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::handlers::AppState;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check response for liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,

    /// Server version (from Cargo.toml)
    pub version: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Whether a broker is configured and `/webhook` is mounted
    pub webhook_enabled: bool,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: SERVER_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        webhook_enabled: state.notifier.is_some(),
    })
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}
