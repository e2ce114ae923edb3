//! Minimal Stripe REST client
//!
//! Only the handful of endpoints the donation flow touches. Requests are
//! form-encoded, authenticated with the secret key and never retried.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::stripe::error::{StripeError, StripeResult};

/// Production Stripe API host
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe customer object (only the fields we read)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID (cus_...)
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Set on the tombstone Stripe returns for deleted customers
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe PaymentIntent (only the fields we read)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// The payment-provider operations the donation flow depends on
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    /// Create a PaymentIntent for `amount` minor units of `currency`
    async fn create_payment_intent(&self, amount: i64, currency: &str)
        -> StripeResult<PaymentIntent>;

    /// Fetch a customer by ID
    async fn retrieve_customer(&self, id: &str) -> StripeResult<Customer>;

    /// List customers registered with `email`
    async fn find_customers_by_email(&self, email: &str) -> StripeResult<Vec<Customer>>;

    /// Create a customer. Requests sharing an `idempotency_key` create it once.
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> StripeResult<Customer>;
}

/// reqwest-backed [`PaymentProvider`]
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: Url,
    secret_key: String,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl StripeClient {
    pub fn new(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> StripeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = Url::parse(&base_url.into())?;
        if base_url.cannot_be_a_base() {
            return Err(StripeError::InvalidBaseUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        Ok(Self {
            http,
            base_url,
            secret_key: secret_key.into(),
        })
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> StripeResult<T> {
        let response = self
            .http
            .get(self.url(segments))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: &[(&str, &str)],
        idempotency_key: Option<&str>,
    ) -> StripeResult<T> {
        let mut request = self
            .http
            .post(self.url(segments))
            .bearer_auth(&self.secret_key)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        let response = request.send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> StripeResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| StripeError::Decode(e.to_string()));
    }

    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => Err(StripeError::Api {
            status: status.as_u16(),
            kind: envelope.error.kind,
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| format!("Stripe returned HTTP {}", status.as_u16())),
        }),
        Err(_) => Err(StripeError::Decode(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        ))),
    }
}

#[async_trait::async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self))]
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> StripeResult<PaymentIntent> {
        let amount = amount.to_string();
        self.post(
            &["v1", "payment_intents"],
            &[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("automatic_payment_methods[enabled]", "true"),
            ],
            None,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_customer(&self, id: &str) -> StripeResult<Customer> {
        self.get(&["v1", "customers", id], &[]).await
    }

    #[instrument(skip(self))]
    async fn find_customers_by_email(&self, email: &str) -> StripeResult<Vec<Customer>> {
        let list: List<Customer> = self
            .get(&["v1", "customers"], &[("email", email), ("limit", "100")])
            .await?;
        debug!(matches = list.data.len(), "Customer lookup by email");
        Ok(list.data)
    }

    #[instrument(skip(self))]
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> StripeResult<Customer> {
        let mut form = vec![("email", email)];
        if let Some(name) = name {
            form.push(("name", name));
        }
        self.post(&["v1", "customers"], &form, idempotency_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: &str) -> StripeClient {
        StripeClient::new("sk_test_123", url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_payment_intent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/payment_intents")
            .match_header("authorization", "Bearer sk_test_123")
            .match_header("idempotency-key", Matcher::Missing)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("amount".into(), "1500".into()),
                Matcher::UrlEncoded("currency".into(), "eur".into()),
                Matcher::UrlEncoded("automatic_payment_methods[enabled]".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"id":"pi_1","client_secret":"pi_1_secret_abc","amount":1500,"currency":"eur"}"#,
            )
            .create_async()
            .await;

        let intent = client(&server.url())
            .create_payment_intent(1500, "eur")
            .await
            .unwrap();
        assert_eq!(intent.client_secret, "pi_1_secret_abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_structured() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/customers/cus_missing")
            .with_status(404)
            .with_body(
                r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such customer: 'cus_missing'"}}"#,
            )
            .create_async()
            .await;

        let err = client(&server.url())
            .retrieve_customer("cus_missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        match err {
            StripeError::Api { status, kind, .. } => {
                assert_eq!(status, 404);
                assert_eq!(kind, "invalid_request_error");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/customers/cus_1")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let err = client(&server.url())
            .retrieve_customer("cus_1")
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_find_and_create_customers() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/customers")
            .match_query(Matcher::UrlEncoded("email".into(), "ana@example.com".into()))
            .with_status(200)
            .with_body(
                r#"{"object":"list","data":[{"id":"cus_1","email":"ana@example.com","name":"Ana"}],"has_more":false}"#,
            )
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/v1/customers")
            .match_header("idempotency-key", "customer-evt_1")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("email".into(), "bo@example.com".into()),
                Matcher::UrlEncoded("name".into(), "Bo".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"cus_2","email":"bo@example.com","name":"Bo"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let found = client.find_customers_by_email("ana@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "cus_1");

        let created = client
            .create_customer("bo@example.com", Some("Bo"), Some("customer-evt_1"))
            .await
            .unwrap();
        assert_eq!(created.id, "cus_2");
        assert!(!created.deleted);
    }

    #[tokio::test]
    async fn test_customer_id_is_path_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/customers/cus_1%2Fsecrets")
            .with_status(200)
            .with_body(r#"{"id":"cus_1/secrets","email":"ana@example.com"}"#)
            .create_async()
            .await;

        let found = client(&server.url())
            .retrieve_customer("cus_1/secrets")
            .await
            .unwrap();
        assert_eq!(found.id, "cus_1/secrets");
        mock.assert_async().await;
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let client = StripeClient::new("sk", "http://proxy.local/stripe/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            client.url(&["v1", "customers", "cus_1"]).as_str(),
            "http://proxy.local/stripe/v1/customers/cus_1"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = StripeClient::new("sk", "not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StripeError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", client("http://localhost"));
        assert!(!rendered.contains("sk_test_123"));
    }
}
