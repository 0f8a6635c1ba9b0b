//! Payment handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::config::WEBHOOK_SIGNATURE_HEADER;
use crate::domain::{Identity, PaymentApplication};
use crate::errors::{AppError, AppResult};
use crate::services::IntentResponse;
use crate::types::BookingResponse;

/// Payment intent request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIntentRequest {
    #[serde(default, alias = "bookingId")]
    #[schema(example = "3f1c9b8e-6a0d-4f4e-9b59-2f0a4f6c1d2e")]
    pub booking_id: Option<String>,
}

/// Client-side confirmation after checkout
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmBookingRequest {
    #[serde(alias = "paymentIntentId")]
    #[validate(length(min = 1, message = "payment_intent_id is required"))]
    #[schema(example = "pi_3Nabc")]
    pub payment_intent_id: String,
    #[serde(default, alias = "bookingId")]
    pub booking_id: Option<String>,
}

/// Webhook acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Authenticated payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/create-intent", post(create_intent))
        .route("/create-payment-intent", post(create_intent))
        .route("/confirm-booking", post(confirm_booking))
}

/// Processor callbacks; authenticated by signature only
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}

fn parse_booking_id(raw: Option<&str>) -> AppResult<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("booking_id is required"))?;
    Uuid::parse_str(raw).map_err(|_| AppError::validation("booking_id must be a valid UUID"))
}

/// Start checkout for an unpaid booking
#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = IntentResponse),
        (status = 400, description = "Missing id, already paid, cancelled, or bad price"),
        (status = 403, description = "Not the booking owner"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<CreateIntentRequest>,
) -> AppResult<Json<IntentResponse>> {
    let booking_id = parse_booking_id(request.booking_id.as_deref())?;
    let intent = state
        .payment_service
        .create_intent(&caller, booking_id)
        .await?;
    Ok(Json(intent))
}

/// Mark a booking paid after the client completed checkout
#[utoipa::path(
    post,
    path = "/api/payments/confirm-booking",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = ConfirmBookingRequest,
    responses(
        (status = 200, description = "Booking paid", body = BookingResponse),
        (status = 400, description = "Intent unknown, not succeeded, or mismatched"),
        (status = 403, description = "Not the booking owner"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<ConfirmBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking_id = parse_booking_id(request.booking_id.as_deref())?;
    let application = state
        .payment_service
        .confirm_booking(&caller, request.payment_intent_id.trim(), booking_id)
        .await?;

    let message = match application {
        PaymentApplication::Applied(_) => "Payment confirmed",
        PaymentApplication::AlreadyPaid(_) => "Booking already paid",
    };
    Ok(Json(BookingResponse::new(message, application.into_booking())))
}

/// Signed processor callback. The body must stay byte-exact for the
/// signature check.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    tag = "Payments",
    request_body(content = String, content_type = "application/json"),
    params(("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Invalid signature"),
        (status = 500, description = "Event could not be applied; the processor retries")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.payment_service.handle_webhook(signature, &body).await?;
    tracing::debug!(?outcome, "Webhook handled");

    Ok(Json(WebhookAck { received: true }))
}
