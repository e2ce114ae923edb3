//! Stripe integration
//!
//! - **Signature Verification**: HMAC-SHA256 validation of the `Stripe-Signature` header
//! - **Event Parsing**: typed envelope, loosely-typed object with checked field access
//! - **Customer Resolution**: reuse by ID, then by email, otherwise create
//! - **REST Client**: the few Stripe API calls the donation flow needs
//!
//! # Webhook flow
//!
//! ```text
//! Request -> Signature Verify -> Event Type? -> Donation Details -> Resolve Customer
//!                  |                  |                |
//!                  v                  v                v
//!                 400           200 (ignored)         400
//! ```

pub mod client;
pub mod customer;
pub mod error;
pub mod events;
pub mod signature;

pub use client::{Customer, PaymentIntent, PaymentProvider, StripeClient};
pub use customer::{CustomerResolver, Resolution};
pub use error::{SignatureError, StripeError, StripeResult};
pub use events::{DonationDetails, StripeEvent, StripeEventType};
pub use signature::SignatureVerifier;
