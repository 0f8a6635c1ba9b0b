use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Booking;

/// Message-only response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Service deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A booking together with what just happened to it
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    #[schema(example = "Booking created")]
    pub message: String,
    pub booking: Booking,
}

impl BookingResponse {
    pub fn new(message: impl Into<String>, booking: Booking) -> Self {
        Self {
            message: message.into(),
            booking,
        }
    }
}

/// Created response helper for POST endpoints
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}
