//! `POST /create-payment-intent?amount=<int>`

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::handlers::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Create a PaymentIntent for the requested amount (minor units).
///
/// The amount is validated before Stripe is contacted: it must be given
/// exactly once, parse as an integer and be at least 1.
pub async fn create_payment_intent_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaymentIntentResponse>> {
    let amount = parse_amount(&params).map_err(|e| {
        warn!(error = %e, "Amount was not set correctly");
        e
    })?;

    let intent = state
        .provider
        .create_payment_intent(amount, &state.currency)
        .await
        .map_err(AppError::from_payment_intent)?;

    state.metrics.record_payment_intent();
    info!(payment_intent = %intent.id, amount, currency = %state.currency, "Payment intent created");

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

fn parse_amount(params: &[(String, String)]) -> Result<i64> {
    let mut amounts = params.iter().filter(|(k, _)| k == "amount").map(|(_, v)| v);

    let raw = amounts
        .next()
        .ok_or_else(|| AppError::bad_request("missing amount query parameter"))?;
    if amounts.next().is_some() {
        return Err(AppError::bad_request("more than one amount is specified"));
    }

    let amount: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("amount {:?} is not an integer", raw)))?;
    if amount < 1 {
        return Err(AppError::bad_request("amount must be at least 1"));
    }

    Ok(amount)
}
