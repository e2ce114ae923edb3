//! Kafka producer over the Kafka REST produce API
//!
//! `POST {endpoint}/produce/{topic}` with `{"key": ..., "value": ...}` and HTTP
//! basic credentials when configured. The record key is the customer ID so all
//! donations from one customer land on the same partition.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::notifier::{DonationEvent, Notifier, NotifyError};

#[derive(Serialize)]
struct ProduceRequest<'a> {
    key: &'a str,
    value: String,
}

/// Broker acknowledgement
#[derive(Debug, Default, Deserialize)]
struct ProduceResponse {
    #[serde(default)]
    partition: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

/// Credentials for SASL-over-REST brokers
#[derive(Clone)]
pub struct KafkaCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for KafkaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// [`Notifier`] that writes one record per donation to a Kafka topic
#[derive(Debug, Clone)]
pub struct KafkaRestNotifier {
    http: reqwest::Client,
    produce_url: Url,
    topic: String,
    credentials: Option<KafkaCredentials>,
}

impl KafkaRestNotifier {
    pub fn new(
        endpoint: &Url,
        topic: impl Into<String>,
        credentials: Option<KafkaCredentials>,
        request_timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let topic = topic.into();
        let produce_url = produce_url(endpoint, &topic);

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            produce_url,
            topic,
            credentials,
        })
    }
}

fn produce_url(endpoint: &Url, topic: &str) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("produce").push(topic);
    }
    url
}

/// A 2xx body that is not a produce ack is still accepted, but logged
fn read_ack(text: &str) -> ProduceResponse {
    match serde_json::from_str(text) {
        Ok(ack) => ack,
        Err(e) => {
            warn!(
                error = %e,
                body = %text.chars().take(200).collect::<String>(),
                "Broker accepted the record with an unrecognized response body"
            );
            ProduceResponse::default()
        }
    }
}

#[async_trait::async_trait]
impl Notifier for KafkaRestNotifier {
    #[instrument(skip_all, fields(customer_id = %event.customer_id))]
    async fn notify(&self, event: &DonationEvent) -> Result<(), NotifyError> {
        let body = ProduceRequest {
            key: &event.customer_id,
            value: serde_json::to_string(event)?,
        };

        let mut request = self.http.post(self.produce_url.clone()).json(&body);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let ack = read_ack(&text);
        if let Some(error) = ack.error {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: error,
            });
        }

        debug!(topic = %self.topic, partition = ?ack.partition, offset = ?ack.offset, "Record produced");
        Ok(())
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}
