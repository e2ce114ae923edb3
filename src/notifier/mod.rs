//! Donation notifications
//!
//! A [`DonationEvent`] is built once per qualifying webhook and handed to a
//! [`Notifier`]. Publishing is bounded by a fixed timeout; a slow or failed
//! broker is reported to the caller and never retried.

pub mod kafka;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stripe::{Customer, DonationDetails};

pub use kafka::KafkaRestNotifier;

/// Default upper bound for a single publish
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(500);

/// Normalized "donation occurred" event sent downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationEvent {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    /// Amount in major currency units
    pub amount: f64,
    pub currency: String,
}

impl DonationEvent {
    /// Combine the resolved customer with the payment details.
    ///
    /// Name and email come from the customer record when it has them.
    pub fn new(customer: &Customer, details: &DonationDetails) -> Self {
        Self {
            customer_id: customer.id.clone(),
            customer_name: customer
                .name
                .clone()
                .or_else(|| details.name.clone())
                .unwrap_or_default(),
            customer_email: customer
                .email
                .clone()
                .unwrap_or_else(|| details.email.clone()),
            amount: details.amount_minor as f64 / 100.0,
            currency: details.currency.clone(),
        }
    }
}

/// Errors raised while publishing a donation event
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("Broker rejected record: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Broker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for donation events
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Publish one event. Implementations should not retry.
    async fn notify(&self, event: &DonationEvent) -> Result<(), NotifyError>;

    /// Destination name, for logs
    fn topic(&self) -> &str;
}

/// Publish `event`, giving up after `limit`.
pub async fn publish_with_timeout(
    notifier: &dyn Notifier,
    event: &DonationEvent,
    limit: Duration,
) -> Result<(), NotifyError> {
    match tokio::time::timeout(limit, notifier.notify(event)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Timeout(limit)),
    }
}
