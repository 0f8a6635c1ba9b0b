//! Stripe REST client for payment intents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::GatewayError;
use crate::config::{Config, PAYMENT_HTTP_TIMEOUT_SECONDS, STRIPE_API_VERSION};
use crate::domain::{IntentRequest, PaymentIntent};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Payment processor operations used by reconciliation.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an intent carrying the booking/customer metadata.
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Fetch the processor's current view of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Stripe error envelope
#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: Option<SecretString>,
}

impl StripeGateway {
    /// Build the client. A missing secret key is allowed here; calls fail
    /// with `NotConfigured` until one is set.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Stripe-Version",
            header::HeaderValue::from_static(STRIPE_API_VERSION),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(PAYMENT_HTTP_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key().map(|key| SecretString::new(key.into())),
        })
    }

    fn secret_key(&self) -> Result<&str, GatewayError> {
        self.secret_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(GatewayError::NotConfigured)
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in request.metadata.pairs() {
            form.push((format!("metadata[{}]", key), value));
        }

        let response = self
            .client
            .post(self.intents_url())
            .bearer_auth(self.secret_key()?)
            .form(&form)
            .send()
            .await?;

        let intent: PaymentIntent = parse_response(response, "new intent").await?;
        tracing::info!(
            intent_id = %intent.id,
            booking_id = %request.metadata.booking_id,
            amount = intent.amount,
            "Payment intent created"
        );
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if intent_id.is_empty() || intent_id.contains(['/', '?', '#']) {
            return Err(GatewayError::InvalidRequest(
                "Invalid payment intent id".into(),
            ));
        }

        let response = self
            .client
            .get(format!("{}/{}", self.intents_url(), intent_id))
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;

        parse_response(response, intent_id).await
    }
}

async fn parse_response(response: Response, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<PaymentIntent>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<StripeErrorResponse>(&body)
        .map(|envelope| envelope.error)
        .ok();
    let message = error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let code = error.and_then(|e| e.code);

    tracing::warn!(status = status.as_u16(), %message, "Payment processor request failed");

    Err(classify(status, code.as_deref(), intent_id, message))
}

fn classify(status: StatusCode, code: Option<&str>, intent_id: &str, message: String) -> GatewayError {
    if status == StatusCode::NOT_FOUND || code == Some("resource_missing") {
        GatewayError::NotFound(intent_id.to_string())
    } else if status == StatusCode::BAD_REQUEST {
        GatewayError::InvalidRequest(message)
    } else {
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
