//! Metrics Collection
//!
//! Atomic counters for the donation flow, exported in Prometheus text format
//! on `/metrics`.
//!
//! # Example
//!
//! ```rust
//! use donation_server::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_webhook_received();
//! assert!(metrics.to_prometheus_format().contains("donation_webhooks_received_total 1"));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::stripe::Resolution;

/// Counters for the donation server
#[derive(Debug, Default)]
pub struct Metrics {
    /// Webhook deliveries received
    pub webhooks_received: AtomicU64,
    /// Webhooks rejected before processing (signature or payload)
    pub webhooks_rejected: AtomicU64,
    /// Verified webhooks with an event type we do not act on
    pub webhooks_ignored: AtomicU64,
    /// Donation events accepted by the broker
    pub donations_published: AtomicU64,
    /// Publish attempts that failed or timed out
    pub publish_failures: AtomicU64,
    /// Customers created during resolution
    pub customers_created: AtomicU64,
    /// Existing customers reused during resolution
    pub customers_reused: AtomicU64,
    /// Payment intents created
    pub payment_intents_created: AtomicU64,

    /// Responses broken down by route and status code
    responses_by_route_status: RwLock<BTreeMap<(String, u16), u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_webhook_received(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_webhook_rejected(&self) {
        self.webhooks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_webhook_ignored(&self) {
        self.webhooks_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.donations_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolution(&self, resolution: Resolution) {
        match resolution {
            Resolution::Created => self.customers_created.fetch_add(1, Ordering::Relaxed),
            Resolution::ById | Resolution::ByEmail => {
                self.customers_reused.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    pub fn record_payment_intent(&self) {
        self.payment_intents_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a response for `route` with `status`
    pub fn record_response(&self, route: &str, status: u16) {
        if let Ok(mut breakdown) = self.responses_by_route_status.write() {
            *breakdown.entry((route.to_string(), status)).or_insert(0) += 1;
        }
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let counters: [(&str, &AtomicU64); 8] = [
            ("donation_webhooks_received_total", &self.webhooks_received),
            ("donation_webhooks_rejected_total", &self.webhooks_rejected),
            ("donation_webhooks_ignored_total", &self.webhooks_ignored),
            ("donation_events_published_total", &self.donations_published),
            ("donation_publish_failures_total", &self.publish_failures),
            ("donation_customers_created_total", &self.customers_created),
            ("donation_customers_reused_total", &self.customers_reused),
            ("donation_payment_intents_created_total", &self.payment_intents_created),
        ];

        let mut output = String::new();
        for (name, value) in counters {
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value.load(Ordering::Relaxed)));
        }

        if let Ok(breakdown) = self.responses_by_route_status.read() {
            if !breakdown.is_empty() {
                output.push_str("# TYPE donation_http_responses_total counter\n");
            }
            for ((route, status), count) in breakdown.iter() {
                output.push_str(&format!(
                    "donation_http_responses_total{{route=\"{}\",status=\"{}\"}} {}\n",
                    route, status, count
                ));
            }
        }

        output
    }
}
