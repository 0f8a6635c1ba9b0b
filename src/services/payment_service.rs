//! Payment reconciliation.
//!
//! Two independent triggers settle a booking: the client confirming after
//! checkout and the processor's signed webhook. Both funnel into
//! `apply_payment`, a single conditional update, so arrival order and
//! redelivery do not matter.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::EVENT_PAYMENT_SUCCEEDED;
use crate::domain::{
    from_minor_units, to_minor_units, BookingStatus, Identity, IntentMetadata, IntentRequest,
    PaymentApplication, PaymentIntent,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{BookingRepository, PaymentGateway, WebhookVerifier};

const BOOKING: &str = "Booking";

/// Client-side handle for completing checkout
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntentResponse {
    #[schema(example = "pi_3Nabc_secret_xyz")]
    pub client_secret: String,
    #[schema(example = "pi_3Nabc")]
    pub payment_intent_id: String,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// This delivery settled the booking.
    Applied(Uuid),
    /// The booking was already paid.
    AlreadyApplied(Uuid),
    /// Acknowledged without touching any booking.
    Ignored(String),
}

/// Payment service trait for dependency injection.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Open a processor intent for an unpaid booking the caller owns
    async fn create_intent(&self, caller: &Identity, booking_id: Uuid) -> AppResult<IntentResponse>;

    /// Client-side confirmation after checkout
    async fn confirm_booking(
        &self,
        caller: &Identity,
        payment_intent_id: &str,
        booking_id: Uuid,
    ) -> AppResult<PaymentApplication>;

    /// Verify and apply a processor callback
    async fn handle_webhook(&self, signature: Option<&str>, payload: &[u8]) -> AppResult<WebhookOutcome>;

    /// Mark the booking paid exactly once
    async fn apply_payment(&self, booking_id: Uuid, payment_intent_id: &str) -> AppResult<PaymentApplication>;
}

pub struct PaymentManager {
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
    currency: String,
}

impl PaymentManager {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            gateway,
            verifier,
            currency: currency.into(),
        }
    }

    /// Apply a succeeded intent delivered by the processor. Business
    /// mismatches are acknowledged and skipped; storage errors propagate so
    /// the processor retries.
    async fn reconcile_event(&self, intent: PaymentIntent) -> AppResult<WebhookOutcome> {
        let (Some(booking_id), Some(customer_id)) = (intent.booking_id(), intent.customer_id())
        else {
            return Ok(ignored(&intent, "intent carries no booking metadata"));
        };

        let Some(booking) = self.bookings.find_by_id(booking_id).await? else {
            return Ok(ignored(&intent, "booking does not exist"));
        };
        if !booking.is_owned_by(customer_id) {
            return Ok(ignored(&intent, "customer does not own the booking"));
        }
        if intent.ensure_amount_matches(&booking).is_err() {
            return Ok(ignored(&intent, "amount does not match the booking price"));
        }

        Ok(match self.apply_payment(booking_id, &intent.id).await? {
            PaymentApplication::Applied(_) => WebhookOutcome::Applied(booking_id),
            PaymentApplication::AlreadyPaid(_) => WebhookOutcome::AlreadyApplied(booking_id),
        })
    }
}

fn ignored(intent: &PaymentIntent, reason: &str) -> WebhookOutcome {
    tracing::warn!(intent_id = %intent.id, reason, "Webhook payment ignored");
    WebhookOutcome::Ignored(reason.to_string())
}

#[async_trait]
impl PaymentService for PaymentManager {
    async fn create_intent(&self, caller: &Identity, booking_id: Uuid) -> AppResult<IntentResponse> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_not_found(BOOKING)?;

        if !booking.is_owned_by(caller.id) {
            return Err(AppError::forbidden("Unauthorized: You do not own this booking"));
        }
        if booking.is_paid() {
            return Err(AppError::validation("Booking is already paid"));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::validation("Cannot pay for a cancelled booking"));
        }
        let amount = to_minor_units(booking.price)
            .ok_or_else(|| AppError::validation("Invalid or missing price for this service"))?;

        let intent = self
            .gateway
            .create_intent(IntentRequest {
                amount,
                currency: self.currency.clone(),
                metadata: IntentMetadata {
                    booking_id,
                    customer_id: caller.id,
                },
            })
            .await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| AppError::upstream("Payment intent was created without a client secret"))?;

        Ok(IntentResponse {
            client_secret,
            payment_intent_id: intent.id,
        })
    }

    async fn confirm_booking(
        &self,
        caller: &Identity,
        payment_intent_id: &str,
        booking_id: Uuid,
    ) -> AppResult<PaymentApplication> {
        let intent = self.gateway.retrieve_intent(payment_intent_id).await?;
        if !intent.is_succeeded() {
            return Err(AppError::validation("Payment has not succeeded yet"));
        }

        intent.ensure_issued_for(booking_id, caller.id).inspect_err(|_| {
            tracing::warn!(
                intent_id = %intent.id,
                booking_id = %booking_id,
                customer_id = %caller.id,
                "Payment intent metadata mismatch"
            );
        })?;

        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_not_found(BOOKING)?;
        if !booking.is_owned_by(caller.id) {
            return Err(AppError::forbidden("Unauthorized: You do not own this booking"));
        }
        intent.ensure_amount_matches(&booking).inspect_err(|_| {
            tracing::warn!(
                intent_id = %intent.id,
                booking_id = %booking_id,
                charged = %from_minor_units(intent.amount),
                price = %booking.price,
                "Payment amount mismatch"
            );
        })?;

        self.apply_payment(booking_id, &intent.id).await
    }

    async fn handle_webhook(&self, signature: Option<&str>, payload: &[u8]) -> AppResult<WebhookOutcome> {
        let event = self.verifier.verify(signature, payload).inspect_err(|e| {
            tracing::warn!(error = %e, "Webhook rejected");
        })?;

        if event.event_type != EVENT_PAYMENT_SUCCEEDED {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook event skipped");
            return Ok(WebhookOutcome::Ignored(format!(
                "unhandled event type {}",
                event.event_type
            )));
        }

        match event.payment_intent() {
            Some(intent) => self.reconcile_event(intent).await,
            None => {
                tracing::warn!(event_id = %event.id, "Webhook event object is not a payment intent");
                Ok(WebhookOutcome::Ignored("event object is not a payment intent".into()))
            }
        }
    }

    async fn apply_payment(&self, booking_id: Uuid, payment_intent_id: &str) -> AppResult<PaymentApplication> {
        let application = self
            .bookings
            .mark_paid(booking_id, payment_intent_id)
            .await?
            .ok_or_not_found(BOOKING)?;

        match &application {
            PaymentApplication::Applied(_) => tracing::info!(
                booking_id = %booking_id,
                intent_id = %payment_intent_id,
                "Booking marked paid"
            ),
            PaymentApplication::AlreadyPaid(_) => tracing::info!(
                booking_id = %booking_id,
                intent_id = %payment_intent_id,
                "Booking was already paid"
            ),
        }
        Ok(application)
    }
}
