//! Stripe Event Types
//!
//! The webhook envelope is typed; the object inside `data.object` is kept as
//! raw JSON and only the fields a donation needs are pulled out of it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stripe::error::{StripeError, StripeResult};

/// Stripe event types that describe a completed donation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEventType {
    /// A Checkout session finished successfully
    CheckoutSessionCompleted,
    /// A charge (e.g. from a Payment Element) succeeded
    ChargeSucceeded,
    /// Anything else; acknowledged and otherwise ignored
    Unknown,
}

impl FromStr for StripeEventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "charge.succeeded" => Self::ChargeSucceeded,
            _ => Self::Unknown,
        })
    }
}

impl StripeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::ChargeSucceeded => "charge.succeeded",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this event type should produce a donation notification
    pub fn is_donation(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Generic Stripe event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    /// Unique identifier for the event
    pub id: String,

    /// Type of event
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time of event creation (Unix timestamp)
    #[serde(default)]
    pub created: i64,

    /// API version used to render data
    #[serde(default)]
    pub api_version: Option<String>,

    /// Whether this is a live mode event
    #[serde(default)]
    pub livemode: bool,

    /// Object containing event data
    pub data: EventData,
}

/// Event data container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    /// The event object (checkout session, charge, ...)
    pub object: Value,
}

impl StripeEvent {
    /// Parse from raw JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> StripeResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StripeError::InvalidPayload(e.to_string()))
    }

    /// Get the typed event type
    pub fn typed_event_type(&self) -> StripeEventType {
        match StripeEventType::from_str(&self.event_type) {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }

    /// Extract the donation fields carried by this event.
    ///
    /// Fails for event types that are not donations and for objects that are
    /// missing a required field or carry one with the wrong JSON type.
    pub fn donation_details(&self) -> StripeResult<DonationDetails> {
        let object = self.data.object.as_object().ok_or_else(|| {
            StripeError::InvalidPayload("data.object is not a JSON object".to_string())
        })?;

        match self.typed_event_type() {
            StripeEventType::CheckoutSessionCompleted => {
                let details = optional_object(object, "customer_details")?;
                Ok(DonationDetails {
                    event_id: self.id.clone(),
                    customer_id: optional_str(object, "customer")?,
                    name: match details {
                        Some(d) => optional_str(d, "name")?,
                        None => None,
                    },
                    email: details
                        .map(|d| optional_str(d, "email"))
                        .transpose()?
                        .flatten()
                        .ok_or_else(|| missing("customer_details.email"))?,
                    amount_minor: required_i64(object, "amount_total")?,
                    currency: required_str(object, "currency")?,
                })
            }
            StripeEventType::ChargeSucceeded => {
                let billing = optional_object(object, "billing_details")?;
                let billing_email = match billing {
                    Some(b) => optional_str(b, "email")?,
                    None => None,
                };
                let email = match billing_email {
                    Some(email) => email,
                    None => optional_str(object, "receipt_email")?
                        .ok_or_else(|| missing("billing_details.email"))?,
                };
                Ok(DonationDetails {
                    event_id: self.id.clone(),
                    customer_id: optional_str(object, "customer")?,
                    name: match billing {
                        Some(b) => optional_str(b, "name")?,
                        None => None,
                    },
                    email,
                    amount_minor: required_i64(object, "amount")?,
                    currency: required_str(object, "currency")?,
                })
            }
            StripeEventType::Unknown => Err(StripeError::InvalidPayload(format!(
                "Event {} is not a donation event",
                self.event_type
            ))),
        }
    }
}

/// Donation fields pulled out of a webhook object, before customer resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationDetails {
    /// ID of the webhook event (evt_...) the fields came from
    pub event_id: String,
    /// Customer ID (cus_...) if the payment was attached to one
    pub customer_id: Option<String>,
    /// Name entered at checkout
    pub name: Option<String>,
    /// Email entered at checkout
    pub email: String,
    /// Amount in the currency's smallest unit
    pub amount_minor: i64,
    /// Lowercase ISO currency code
    pub currency: String,
}

fn missing(field: &str) -> StripeError {
    StripeError::InvalidPayload(format!("missing field `{}`", field))
}

fn mistyped(field: &str, expected: &str) -> StripeError {
    StripeError::InvalidPayload(format!("field `{}` is not {}", field, expected))
}

/// Null and absent are both treated as "not provided"
fn optional_str(object: &Map<String, Value>, field: &str) -> StripeResult<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(mistyped(field, "a string")),
    }
}

fn required_str(object: &Map<String, Value>, field: &str) -> StripeResult<String> {
    optional_str(object, field)?.ok_or_else(|| missing(field))
}

fn required_i64(object: &Map<String, Value>, field: &str) -> StripeResult<i64> {
    match object.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(value) => value.as_i64().ok_or_else(|| mistyped(field, "an integer")),
    }
}

fn optional_object<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> StripeResult<Option<&'a Map<String, Value>>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(mistyped(field, "an object")),
    }
}
