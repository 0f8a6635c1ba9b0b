//! Booking handlers.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{Booking, BookingStatus, Identity};
use crate::errors::AppResult;
use crate::services::BookingRequest;
use crate::types::{BookingResponse, Created};

/// Professional assignment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRequest {
    #[serde(alias = "professionalId")]
    pub professional_id: Uuid,
}

/// Status change request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    #[schema(value_type = BookingStatus, example = "accepted")]
    pub status: String,
}

/// Create booking routes (all authenticated)
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/open", get(open_bookings))
        .route("/:id/assign", put(assign_professional))
        .route("/:id/status", put(update_status))
}

/// Book a listing
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = BookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Only customers can create bookings"),
        (status = 404, description = "Service not found")
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<BookingRequest>,
) -> AppResult<Created<BookingResponse>> {
    let booking = state.booking_service.create(&caller, request).await?;
    Ok(Created(BookingResponse::new("Booking created", booking)))
}

/// Bookings visible to the caller
#[utoipa::path(
    get,
    path = "/api/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own, assigned, or (for admins) all bookings", body = Vec<Booking>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.booking_service.list(&caller).await?))
}

/// Pending bookings waiting for a professional
#[utoipa::path(
    get,
    path = "/api/bookings/open",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unassigned pending bookings", body = Vec<Booking>),
        (status = 403, description = "Only providers can browse open bookings")
    )
)]
pub async fn open_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.booking_service.list_open(&caller).await?))
}

#[utoipa::path(
    put,
    path = "/api/bookings/{id}/assign",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Professional assigned", body = BookingResponse),
        (status = 400, description = "Target is not a provider"),
        (status = 403, description = "Not allowed to assign"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking was modified by another request")
    )
)]
pub async fn assign_professional(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<AssignRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .booking_service
        .assign(&caller, id, request.professional_id)
        .await?;
    Ok(Json(BookingResponse::new("Professional assigned", booking)))
}

#[utoipa::path(
    put,
    path = "/api/bookings/{id}/status",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status updated", body = BookingResponse),
        (status = 400, description = "Invalid status or transition"),
        (status = 403, description = "Not allowed, or booking already final"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking was modified by another request")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<StatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .booking_service
        .update_status(&caller, id, &request.status)
        .await?;
    Ok(Json(BookingResponse::new("Status updated", booking)))
}
