//! Payment processor integration.
//!
//! - `stripe`: REST client for payment intents
//! - `webhook`: signature verification for processor callbacks

mod stripe;
mod webhook;

use thiserror::Error;

use crate::errors::AppError;

pub use stripe::{PaymentGateway, StripeGateway};
pub use webhook::{WebhookEvent, WebhookEventData, WebhookVerifier};

#[cfg(any(test, feature = "test-utils"))]
pub use stripe::MockPaymentGateway;

/// Errors raised while talking to the payment processor.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment processor is not configured")]
    NotConfigured,

    #[error("payment intent not found: {0}")]
    NotFound(String),

    #[error("processor rejected the request: {0}")]
    InvalidRequest(String),

    #[error("processor returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("processor unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(_) => AppError::BadRequest("Payment intent not found".into()),
            GatewayError::InvalidRequest(message) => AppError::BadRequest(message),
            other => AppError::upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unknown_intent_is_client_error() {
        let err: AppError = GatewayError::NotFound("pi_missing".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_processor_outage_is_server_error() {
        let err: AppError = GatewayError::Api {
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "UPSTREAM_ERROR");

        let err: AppError = GatewayError::NotConfigured.into();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }
}
