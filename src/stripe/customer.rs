//! Customer resolution
//!
//! ```text
//! customer id in payload? --yes--> retrieve --live--> reuse
//!        |                              |
//!        no                     404 / deleted
//!        v                              v
//!  list by email  <---------------------+
//!        |
//!   0 matches --> create(email, name)
//!   1 match   --> reuse
//!   n matches --> exact name match, else first
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::stripe::client::{Customer, PaymentProvider};
use crate::stripe::error::StripeResult;
use crate::stripe::events::DonationDetails;

/// How a customer was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Found through the customer ID on the payment
    ById,
    /// Found through an email lookup
    ByEmail,
    /// Created for this donation
    Created,
}

/// Looks up or creates the Stripe customer behind a donation
#[derive(Clone)]
pub struct CustomerResolver {
    provider: Arc<dyn PaymentProvider>,
}

impl CustomerResolver {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(&self, details: &DonationDetails) -> StripeResult<(Customer, Resolution)> {
        if let Some(id) = details.customer_id.as_deref() {
            match self.provider.retrieve_customer(id).await {
                Ok(customer) if !customer.deleted => {
                    debug!(customer_id = %customer.id, "Reusing customer from payment");
                    return Ok((customer, Resolution::ById));
                }
                Ok(_) => {
                    debug!(customer_id = %id, "Customer on payment was deleted, falling back to email");
                }
                Err(e) if e.is_not_found() => {
                    debug!(customer_id = %id, "Customer on payment not found, falling back to email");
                }
                Err(e) => return Err(e),
            }
        }

        let candidates = self
            .provider
            .find_customers_by_email(&details.email)
            .await?;
        if let Some(customer) = pick_candidate(candidates, details.name.as_deref()) {
            debug!(customer_id = %customer.id, "Reusing customer found by email");
            return Ok((customer, Resolution::ByEmail));
        }

        let idempotency_key = format!("customer-{}", details.event_id);
        let customer = self
            .provider
            .create_customer(&details.email, details.name.as_deref(), Some(&idempotency_key))
            .await?;
        info!(customer_id = %customer.id, "Created customer");
        Ok((customer, Resolution::Created))
    }
}

/// Exact name match wins, otherwise the first live result
fn pick_candidate(candidates: Vec<Customer>, name: Option<&str>) -> Option<Customer> {
    let mut live = candidates.into_iter().filter(|c| !c.deleted).peekable();
    let first = live.peek().cloned()?;

    match name {
        Some(name) => Some(
            live.find(|c| c.name.as_deref() == Some(name))
                .unwrap_or(first),
        ),
        None => Some(first),
    }
}
