//! `POST /webhook`
//!
//! ```text
//! raw body + Stripe-Signature
//!        |
//!   verify ----------------------------> 400
//!        |
//!   parse envelope --------------------> 400
//!        |
//!   donation event type? --no----------> 200 {}
//!        |
//!   extract fields --------------------> 400
//!        |
//!   resolve / create customer ---------> 500
//!        |
//!   publish (bounded) -----------------> 500
//!        |
//!      200 {}
//! ```
//!
//! The customer step is not undone when publishing fails.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::handlers::AppState;
use crate::notifier::{publish_with_timeout, DonationEvent};
use crate::stripe::StripeEvent;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    state.metrics.record_webhook_received();
    debug!(bytes = body.len(), "Webhook is called");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.verifier.verify(&body, signature) {
        warn!(error = %e, "Rejected webhook");
        state.metrics.record_webhook_rejected();
        return Err(e.into());
    }

    let event = StripeEvent::from_bytes(&body).map_err(|e| {
        warn!(error = %e, "Could not parse webhook envelope");
        state.metrics.record_webhook_rejected();
        AppError::from(e)
    })?;

    let event_type = event.typed_event_type();
    if !event_type.is_donation() {
        debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring event type");
        state.metrics.record_webhook_ignored();
        return Ok(Json(json!({})));
    }

    info!(event_id = %event.id, event_type = event_type.as_str(), "Donation completed");

    let details = event.donation_details().map_err(|e| {
        warn!(event_id = %event.id, error = %e, "Could not read donation fields");
        state.metrics.record_webhook_rejected();
        AppError::from(e)
    })?;

    let notifier = state.notifier.as_ref().ok_or_else(|| {
        error!("Webhook received without a configured broker");
        AppError::Internal("donation notifications are not configured".to_string())
    })?;

    let (customer, resolution) = state.resolver.resolve(&details).await.map_err(|e| {
        error!(event_id = %event.id, error = %e, "Could not resolve customer");
        AppError::Provider(e)
    })?;
    state.metrics.record_resolution(resolution);

    let donation = DonationEvent::new(&customer, &details);

    if let Err(e) = publish_with_timeout(notifier.as_ref(), &donation, state.publish_timeout).await
    {
        error!(
            event_id = %event.id,
            customer_id = %donation.customer_id,
            topic = notifier.topic(),
            error = %e,
            "Failed to publish donation event"
        );
        state.metrics.record_publish_failure();
        return Err(e.into());
    }

    state.metrics.record_published();
    info!(
        event_id = %event.id,
        customer_id = %donation.customer_id,
        topic = notifier.topic(),
        resolution = ?resolution,
        "Donation event published"
    );

    Ok(Json(json!({})))
}
