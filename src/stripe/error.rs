//! Stripe integration error types

use thiserror::Error;

/// Errors raised while talking to Stripe or interpreting its payloads
#[derive(Error, Debug)]
pub enum StripeError {
    /// Structured error returned by the Stripe API (`{"error": {...}}`)
    #[error("{message}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Stripe error type (`card_error`, `invalid_request_error`, ...)
        kind: String,
        /// Stripe error code, when present
        code: Option<String>,
        /// Human readable message from Stripe
        message: String,
    },

    /// Network or TLS failure before a response was received
    #[error("Stripe request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Unexpected Stripe response: {0}")]
    Decode(String),

    /// The configured API base is not a usable URL
    #[error("Invalid Stripe API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The webhook envelope or object could not be interpreted
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl StripeError {
    /// True when Stripe reported the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 404 || code.as_deref() == Some("resource_missing")
            }
            _ => false,
        }
    }
}

/// Result alias for Stripe operations
pub type StripeResult<T> = std::result::Result<T, StripeError>;

/// Signature verification failures for inbound webhooks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Invalid Stripe-Signature header format")]
    MalformedHeader,

    #[error("No v1 signature found in Stripe-Signature header")]
    MissingSignature,

    #[error("Webhook timestamp outside the tolerance window")]
    TimestampOutOfTolerance,

    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    #[error("Webhook signing secret is not configured")]
    SecretNotConfigured,
}
