//! Booking entity, its lifecycle state machine and authorization rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::role::{Identity, Role};
use crate::errors::{AppError, AppResult};

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Completed and cancelled bookings never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted) | (Pending, Cancelled) | (Accepted, Completed) | (Accepted, Cancelled)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state, tracked apart from the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        if value == "paid" {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

/// Booking domain entity
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    #[schema(example = "Pipe Fix")]
    pub service_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    /// Price agreed at booking time
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State observed before a write. A conditional update only lands if the
/// row still matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingGuard {
    pub status: BookingStatus,
    pub professional_id: Option<Uuid>,
}

impl Booking {
    pub fn guard(&self) -> BookingGuard {
        BookingGuard {
            status: self.status,
            professional_id: self.professional_id,
        }
    }

    pub fn is_owned_by(&self, customer_id: Uuid) -> bool {
        self.customer_id == customer_id
    }

    pub fn is_assigned_to(&self, professional_id: Uuid) -> bool {
        self.professional_id == Some(professional_id)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Check a status change requested by `actor`.
    ///
    /// Owners may only cancel; the assigned professional may request any
    /// target. The move itself must then be legal for the current status.
    pub fn authorize_status_change(&self, actor: &Identity, target: BookingStatus) -> AppResult<()> {
        let owner_cancelling = actor.role.is_customer()
            && self.is_owned_by(actor.id)
            && target == BookingStatus::Cancelled;
        let assigned_professional = actor.role.is_professional() && self.is_assigned_to(actor.id);

        if !(owner_cancelling || assigned_professional) {
            return Err(AppError::forbidden("Not authorized to update this booking"));
        }

        if self.status.is_terminal() {
            return Err(AppError::forbidden(format!(
                "Booking is already {} and can no longer change",
                self.status
            )));
        }

        if !self.status.can_transition_to(target) {
            return Err(AppError::validation(format!(
                "Cannot move booking from {} to {}",
                self.status, target
            )));
        }

        Ok(())
    }

    /// Check an assignment of `professional_id` requested by `actor`.
    pub fn authorize_assignment(&self, actor: &Identity, professional_id: Uuid) -> AppResult<()> {
        let self_assigning = actor.role.is_professional() && actor.id == professional_id;
        let owner = actor.role.is_customer() && self.is_owned_by(actor.id);

        if !(self_assigning || owner) {
            return Err(AppError::forbidden("Unauthorized to assign professional"));
        }

        if self.status.is_terminal() {
            return Err(AppError::forbidden(format!(
                "Booking is already {} and can no longer change",
                self.status
            )));
        }

        if self_assigning
            && self
                .professional_id
                .is_some_and(|current| current != professional_id)
        {
            return Err(AppError::forbidden(
                "Booking is already assigned to another professional",
            ));
        }

        Ok(())
    }
}

/// Values for a new booking row
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub service_id: Uuid,
    pub service_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub price: Decimal,
}

/// Which bookings a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    Customer(Uuid),
    Professional(Uuid),
    All,
}

impl BookingScope {
    pub fn for_identity(identity: &Identity) -> Self {
        match identity.role {
            Role::Customer => BookingScope::Customer(identity.id),
            Role::Provider => BookingScope::Professional(identity.id),
            Role::Admin => BookingScope::All,
        }
    }
}

/// Parse an ISO-8601 schedule. Offsets are honored; naive values are UTC.
pub fn parse_schedule(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation("Scheduled date is required"));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::validation("Scheduled date must be a valid ISO 8601 date"))
}
