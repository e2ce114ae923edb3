//! Shared fakes for router-level tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use donation_server::handlers::AppState;
use donation_server::notifier::{DonationEvent, Notifier, NotifyError};
use donation_server::stripe::{
    Customer, PaymentIntent, PaymentProvider, SignatureVerifier, StripeError, StripeResult,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const PUBLISHABLE_KEY: &str = "pk_test_abc";

pub fn customer(id: &str, email: &str, name: Option<&str>) -> Customer {
    Customer {
        id: id.to_string(),
        email: Some(email.to_string()),
        name: name.map(str::to_string),
        deleted: false,
    }
}

/// In-memory stand-in for the Stripe API
#[derive(Default)]
pub struct FakeStripe {
    pub customers: Mutex<Vec<Customer>>,
    pub calls: Mutex<Vec<String>>,
    pub intent_error: Mutex<Option<StripeError>>,
    /// HTTP status every customer lookup fails with, when set
    pub lookup_status: Option<u16>,
}

fn api_error(status: u16, message: String) -> StripeError {
    StripeError::Api {
        status,
        kind: if status == 404 { "invalid_request_error" } else { "api_error" }.to_string(),
        code: (status == 404).then(|| "resource_missing".to_string()),
        message,
    }
}

impl FakeStripe {
    pub fn with_customers(customers: Vec<Customer>) -> Self {
        Self {
            customers: Mutex::new(customers),
            ..Default::default()
        }
    }

    pub fn failing_lookups(status: u16) -> Self {
        Self {
            lookup_status: Some(status),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl PaymentProvider for FakeStripe {
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> StripeResult<PaymentIntent> {
        self.log(format!("intent:{amount}:{currency}"));
        if let Some(err) = self.intent_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(PaymentIntent {
            id: "pi_test_1".to_string(),
            client_secret: "pi_test_1_secret_xyz".to_string(),
            amount,
            currency: currency.to_string(),
        })
    }

    async fn retrieve_customer(&self, id: &str) -> StripeResult<Customer> {
        self.log(format!("retrieve:{id}"));
        if let Some(status) = self.lookup_status {
            return Err(api_error(status, "Stripe is unavailable".to_string()));
        }
        self.customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| api_error(404, format!("No such customer: '{id}'")))
    }

    async fn find_customers_by_email(&self, email: &str) -> StripeResult<Vec<Customer>> {
        self.log(format!("find:{email}"));
        if let Some(status) = self.lookup_status {
            return Err(api_error(status, "Stripe is unavailable".to_string()));
        }
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email.as_deref() == Some(email))
            .cloned()
            .collect())
    }

    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        _idempotency_key: Option<&str>,
    ) -> StripeResult<Customer> {
        self.log(format!("create:{email}"));
        let mut customers = self.customers.lock().unwrap();
        let created = customer(&format!("cus_new_{}", customers.len()), email, name);
        customers.push(created.clone());
        Ok(created)
    }
}

/// Notifier that records events, optionally slowly or unsuccessfully
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<DonationEvent>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<DonationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &DonationEvent) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 503,
                message: "broker unavailable".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn topic(&self) -> &str {
        "donations"
    }
}

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(WEBHOOK_SECRET)
}

pub fn app(
    stripe: Arc<FakeStripe>,
    notifier: Option<Arc<RecordingNotifier>>,
    publish_timeout: Duration,
) -> Router {
    let mut state = AppState::new(PUBLISHABLE_KEY, stripe, verifier());
    if let Some(notifier) = notifier {
        state = state.with_notifier(notifier, publish_timeout);
    }
    donation_server::build_router(Arc::new(state), &["*".to_string()])
}

pub fn signed_webhook(payload: &[u8]) -> Request<Body> {
    let header = verifier().sign(payload, chrono::Utc::now().timestamp());
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(Body::from(payload.to_vec()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (u16, serde_json::Value) {
    let response: Response<Body> = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
