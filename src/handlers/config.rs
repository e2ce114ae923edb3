//! `GET /config`

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::handlers::AppState;

/// Public configuration the browser needs to initialise Stripe.js
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub publishable_key: String,
}

pub async fn config_handler(State(state): State<Arc<AppState>>) -> Json<PublicConfig> {
    debug!("/config called");
    Json(PublicConfig {
        publishable_key: state.publishable_key.clone(),
    })
}
