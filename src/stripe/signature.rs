//! Webhook signature verification
//!
//! Stripe signs every delivery with the endpoint secret. The header looks like
//!
//! ```text
//! Stripe-Signature: t=1614556800,v1=5257a869e7ec...,v0=6ffbb59b2300...
//! ```
//!
//! and the signature is `hex(HMAC-SHA256(secret, "{t}.{raw body}"))`. Several
//! `v1` entries can be present while a secret is being rolled; any match
//! accepts. `v0` entries are test-mode legacy signatures and are ignored.

use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::stripe::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance between the signed timestamp and the local clock
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Verifies `Stripe-Signature` headers against a shared endpoint secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

/// Parsed components of a signature header
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Verify a payload against the header using the current wall clock.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify a payload against the header as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        if self.secret.is_empty() {
            return Err(SignatureError::SecretNotConfigured);
        }

        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(SignatureError::MissingHeader)?;
        let parsed = parse_header(header)?;

        let expected = self.compute(parsed.timestamp, payload);

        let matched = parsed.signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|provided| provided.ct_eq(&expected).unwrap_u8() == 1)
                .unwrap_or(false)
        });
        if !matched {
            return Err(SignatureError::Mismatch);
        }

        // Checked after the HMAC so a forged header cannot probe the clock
        let skew = now.abs_diff(parsed.timestamp);
        if skew > self.tolerance.as_secs() {
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        Ok(())
    }

    /// Build a header value for `payload` signed at `timestamp`.
    ///
    /// Mirrors what Stripe sends, which makes it handy for local replay and tests.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(self.compute(timestamp, payload))
        )
    }

    fn compute(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn parse_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;

        match key.trim() {
            "t" => {
                timestamp = Some(
                    value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                )
            }
            "v1" => signatures.push(value.trim().to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}
