//! HTTP handlers
//!
//! ```text
//! GET  /config                -> config::config_handler
//! POST /create-payment-intent -> payment_intent::create_payment_intent_handler
//! POST /webhook               -> webhook::webhook_handler   (only with a broker)
//! GET  /health                -> status::health_handler
//! GET  /metrics               -> status::metrics_handler
//! ```

pub mod config;
pub mod payment_intent;
pub mod status;
pub mod webhook;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::Metrics;
use crate::notifier::{Notifier, DEFAULT_PUBLISH_TIMEOUT};
use crate::stripe::{CustomerResolver, PaymentProvider, SignatureVerifier};

pub use config::config_handler;
pub use payment_intent::create_payment_intent_handler;
pub use status::{health_handler, metrics_handler};
pub use webhook::webhook_handler;

/// Default currency for payment intents
pub const DEFAULT_CURRENCY: &str = "eur";

/// Shared, read-only state for all handlers.
///
/// Client handles inside are safe to use from many requests at once; the only
/// mutable parts are the atomic counters in [`Metrics`].
pub struct AppState {
    pub publishable_key: String,
    pub currency: String,
    pub provider: Arc<dyn PaymentProvider>,
    pub resolver: CustomerResolver,
    pub verifier: SignatureVerifier,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub publish_timeout: Duration,
    pub metrics: Arc<Metrics>,
    start_time: Instant,
}

impl AppState {
    pub fn new(
        publishable_key: impl Into<String>,
        provider: Arc<dyn PaymentProvider>,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            publishable_key: publishable_key.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            resolver: CustomerResolver::new(provider.clone()),
            provider,
            verifier,
            notifier: None,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            metrics: Arc::new(Metrics::new()),
            start_time: Instant::now(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Attach the broker; this is what enables the webhook route.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, publish_timeout: Duration) -> Self {
        self.notifier = Some(notifier);
        self.publish_timeout = publish_timeout;
        self
    }

    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
