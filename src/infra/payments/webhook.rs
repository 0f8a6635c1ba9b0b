//! Inbound webhook verification.
//!
//! The processor signs `"{timestamp}.{raw_body}"` with HMAC-SHA256 and sends
//! `t=<unix>,v1=<hex>[,v1=<hex>...]` in the signature header. Verification
//! runs on the raw bytes before anything is parsed.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::WEBHOOK_TOLERANCE_SECONDS;
use crate::domain::PaymentIntent;
use crate::errors::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Verified processor event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// The event object read as a payment intent.
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

/// Parsed signature header
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Option<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Some(Self {
                timestamp,
                signatures,
            }),
            _ => None,
        }
    }
}

pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_seconds: i64,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            tolerance_seconds: WEBHOOK_TOLERANCE_SECONDS,
        }
    }

    /// Verify against the current clock and parse the event.
    pub fn verify(&self, header: Option<&str>, payload: &[u8]) -> AppResult<WebhookEvent> {
        self.verify_at(header, payload, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        header: Option<&str>,
        payload: &[u8],
        now: i64,
    ) -> AppResult<WebhookEvent> {
        if self.secret.expose_secret().is_empty() {
            tracing::error!("Webhook received but no signing secret is configured");
            return Err(AppError::WebhookSignature("signing secret not configured".into()));
        }

        let header = header
            .ok_or_else(|| AppError::WebhookSignature("missing signature header".into()))?;
        let parsed = SignatureHeader::parse(header)
            .ok_or_else(|| AppError::WebhookSignature("malformed signature header".into()))?;

        if !self.within_tolerance(now, parsed.timestamp) {
            return Err(AppError::WebhookSignature(
                "timestamp outside the tolerance window".into(),
            ));
        }

        let mac = self.mac(parsed.timestamp, payload)?;
        let matched = parsed.signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            return Err(AppError::WebhookSignature("no matching signature".into()));
        }

        serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("malformed webhook payload: {}", e)))
    }

    /// The header timestamp is untrusted, so the skew is computed without
    /// overflowing.
    fn within_tolerance(&self, now: i64, timestamp: i64) -> bool {
        now.checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .is_some_and(|skew| skew <= self.tolerance_seconds.unsigned_abs())
    }

    /// Header value a sender would attach to `payload` at `timestamp`.
    pub fn signature_header(&self, payload: &[u8], timestamp: i64) -> AppResult<String> {
        let signature = hex::encode(self.mac(timestamp, payload)?.finalize().into_bytes());
        Ok(format!("t={},v1={}", timestamp, signature))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AppError::internal(format!("HMAC key error: {}", e)))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}
