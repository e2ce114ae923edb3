//! Error types for the donation server
//!
//! Every failure reaching an HTTP handler becomes an [`AppError`], which
//! renders as a status code plus `{"error": {"message": ...}}`. Client
//! mistakes (bad signature, malformed payload or query) are 400; anything
//! that went wrong downstream is 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notifier::NotifyError;
use crate::stripe::{SignatureError, StripeError};

/// Message used when the underlying error must not reach the client
pub const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// The main error type for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    /// The webhook signature did not verify
    #[error("Webhook signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    /// Malformed request (query string, body, webhook object)
    #[error("{0}")]
    BadRequest(String),

    /// Stripe rejected a request made on behalf of the client
    #[error("{0}")]
    PaymentRejected(String),

    /// A Stripe call failed while handling the request
    #[error("Payment provider error: {0}")]
    Provider(StripeError),

    /// The donation event could not be published
    #[error("Could not publish donation event: {0}")]
    Publish(#[from] NotifyError),

    /// Generic server-side failure
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

/// Error envelope returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

impl AppError {
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        AppError::BadRequest(msg.into())
    }

    /// Map a Stripe failure during payment-intent creation.
    ///
    /// Structured API errors are the client's problem and keep their message;
    /// anything else is hidden behind a generic 500.
    pub fn from_payment_intent(err: StripeError) -> Self {
        match err {
            StripeError::Api { message, .. } => AppError::PaymentRejected(message),
            other => {
                tracing::error!(error = %other, "Payment intent creation failed");
                AppError::Internal(UNKNOWN_SERVER_ERROR.to_string())
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Signature(_) | AppError::BadRequest(_) | AppError::PaymentRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Provider(_) | AppError::Publish(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::InvalidPayload(msg) => AppError::BadRequest(msg),
            other => AppError::Provider(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
