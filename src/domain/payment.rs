//! Payment intents and the rules for reconciling them with bookings.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::booking::Booking;
use crate::config::{INTENT_STATUS_SUCCEEDED, METADATA_BOOKING_ID, METADATA_CUSTOMER_ID};
use crate::errors::{AppError, AppResult};

/// Convert a price into minor currency units, rounding half away from zero.
///
/// Returns `None` for non-positive prices or amounts that do not fit.
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    if price <= Decimal::ZERO {
        return None;
    }
    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|amount| *amount > 0)
}

pub fn from_minor_units(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

/// Links an intent back to the booking and customer that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMetadata {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
}

impl IntentMetadata {
    pub fn pairs(&self) -> [(&'static str, String); 2] {
        [
            (METADATA_BOOKING_ID, self.booking_id.to_string()),
            (METADATA_CUSTOMER_ID, self.customer_id.to_string()),
        ]
    }
}

/// Request for a new processor intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub amount: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
}

/// Processor-side intent as returned by the API or carried in an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == INTENT_STATUS_SUCCEEDED
    }

    fn metadata_uuid(&self, key: &str) -> Option<Uuid> {
        self.metadata.get(key).and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn booking_id(&self) -> Option<Uuid> {
        self.metadata_uuid(METADATA_BOOKING_ID)
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        self.metadata_uuid(METADATA_CUSTOMER_ID)
    }

    /// The intent must have been created for exactly this booking and customer.
    pub fn ensure_issued_for(&self, booking_id: Uuid, customer_id: Uuid) -> AppResult<()> {
        if self.booking_id() != Some(booking_id) {
            return Err(AppError::mismatch(
                "Payment intent does not belong to this booking",
            ));
        }
        if self.customer_id() != Some(customer_id) {
            return Err(AppError::mismatch(
                "Payment intent was not created by this customer",
            ));
        }
        Ok(())
    }

    /// The charged amount must equal the booking price in minor units.
    pub fn ensure_amount_matches(&self, booking: &Booking) -> AppResult<()> {
        match to_minor_units(booking.price) {
            Some(expected) if expected == self.amount => Ok(()),
            _ => Err(AppError::mismatch(
                "Payment amount does not match the booking price",
            )),
        }
    }
}

/// Outcome of the idempotent apply-payment operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentApplication {
    /// This call moved the booking from unpaid to paid.
    Applied(Booking),
    /// Another trigger had already settled it.
    AlreadyPaid(Booking),
}

impl PaymentApplication {
    pub fn booking(&self) -> &Booking {
        match self {
            PaymentApplication::Applied(b) | PaymentApplication::AlreadyPaid(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            PaymentApplication::Applied(b) | PaymentApplication::AlreadyPaid(b) => b,
        }
    }
}
