//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;

/// Whether error bodies may carry internal diagnostics. Set once at startup.
static EXPOSE_DIAGNOSTICS: OnceCell<bool> = OnceCell::new();

/// Enable or disable internal diagnostics in error bodies.
///
/// Only the first call has an effect.
pub fn expose_diagnostics(enabled: bool) {
    let _ = EXPOSE_DIAGNOSTICS.set(enabled);
}

fn diagnostics_enabled() -> bool {
    EXPOSE_DIAGNOSTICS.get().copied().unwrap_or(false)
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Resource errors
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.join(" "))]
    InvalidInput(Vec<String>),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    // Payment reconciliation
    #[error("{0}")]
    PaymentMismatch(String),

    #[error("Webhook signature verification failed: {0}")]
    WebhookSignature(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Upstream service error")]
    Upstream(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<String>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) | AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::PaymentMismatch(_) => "PAYMENT_MISMATCH",
            AppError::WebhookSignature(_) => "INVALID_SIGNATURE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::BadRequest(_)
            | AppError::PaymentMismatch(_)
            | AppError::WebhookSignature(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Upstream(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "A cache error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {}", msg);
                "A dependent service failed".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Internal cause, only for errors whose message is masked.
    fn diagnostics(&self) -> Option<String> {
        match self {
            AppError::Database(e) => Some(e.to_string()),
            AppError::Cache(e) => Some(e.to_string()),
            AppError::Jwt(e) => Some(e.to_string()),
            AppError::Upstream(msg) | AppError::Internal(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::InvalidInput(messages) => messages.clone(),
            _ => Vec::new(),
        };
        let debug = if diagnostics_enabled() {
            self.diagnostics()
        } else {
            None
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.user_message(),
                details,
                debug,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T> {
        self.ok_or(AppError::NotFound(entity))
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        AppError::PaymentMismatch(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Booking").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::mismatch("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::WebhookSignature("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::upstream("stripe down").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_input_joins_messages() {
        let err = AppError::InvalidInput(vec![
            "Title is required and cannot be empty.".into(),
            "Price is required.".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Title is required and cannot be empty. Price is required."
        );
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn not_found_names_entity() {
        assert_eq!(AppError::NotFound("Service").to_string(), "Service not found");
        let missing: Option<u8> = None;
        assert!(matches!(
            missing.ok_or_not_found("Booking"),
            Err(AppError::NotFound("Booking"))
        ));
    }

    #[test]
    fn internal_messages_are_masked() {
        let err = AppError::internal("connection refused at 10.0.0.3");
        assert_eq!(err.user_message(), "An internal error occurred");
    }
}
