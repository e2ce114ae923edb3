//! Donation Server - Stripe donations with Kafka notifications
//!
//! This crate backs a donation page: it hands the browser its Stripe
//! publishable key, creates PaymentIntents, and turns signed Stripe webhooks
//! into normalized donation events published to Kafka.
//!
//! # Architecture
//!
//! ```text
//! Stripe ──webhook──▶ Signature Verify ──▶ Event Translate ──▶ Customer Resolve
//!                                                                    │
//!                                                                    ▼
//!                                      Kafka ◀── Publish (bounded timeout)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use donation_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     donation_server::server::run(config).await
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod notifier;
pub mod server;
pub mod stripe;

// Re-exports for convenience
pub use error::{AppError, Result};
pub use notifier::{DonationEvent, Notifier};
pub use server::build_router;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
