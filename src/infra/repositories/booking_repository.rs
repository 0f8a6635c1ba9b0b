//! Booking repository.
//!
//! Every mutation is a single conditional UPDATE. Assignment and status
//! changes only land if the row still matches the state the caller was
//! authorized against; payment settlement only lands on unpaid rows.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, UpdateMany,
};
use uuid::Uuid;

use super::entities::booking::{self, ActiveModel, Entity as BookingEntity};
use crate::domain::{
    Booking, BookingGuard, BookingScope, BookingStatus, NewBooking, PaymentApplication,
    PaymentStatus,
};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Booking repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a pending, unpaid booking
    async fn create(&self, booking: NewBooking) -> AppResult<Booking>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>>;

    /// Bookings visible within `scope`, newest first
    async fn list(&self, scope: BookingScope) -> AppResult<Vec<Booking>>;

    /// Pending bookings nobody has taken yet, oldest schedule first
    async fn list_open(&self) -> AppResult<Vec<Booking>>;

    /// Set the professional and accept. `None` if the row no longer
    /// matches `guard`.
    async fn assign(
        &self,
        id: Uuid,
        guard: BookingGuard,
        professional_id: Uuid,
    ) -> AppResult<Option<Booking>>;

    /// Move to `status`. `None` if the row no longer matches `guard`.
    async fn update_status(
        &self,
        id: Uuid,
        guard: BookingGuard,
        status: BookingStatus,
    ) -> AppResult<Option<Booking>>;

    /// Settle the booking exactly once. `None` if the booking does not exist.
    async fn mark_paid(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> AppResult<Option<PaymentApplication>>;
}

/// Booking store. Callers are authorized by the booking and payment
/// services, so all statements run on the elevated connection.
pub struct BookingStore {
    db: DatabaseConnection,
}

impl BookingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> AppResult<Option<Booking>> {
        BookingEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Booking::try_from)
            .transpose()
    }
}

/// Restrict an update to rows still in the observed state.
fn guarded(update: UpdateMany<BookingEntity>, guard: BookingGuard) -> UpdateMany<BookingEntity> {
    let update = update.filter(booking::Column::Status.eq(guard.status.as_str()));
    match guard.professional_id {
        Some(professional_id) => update.filter(booking::Column::ProfessionalId.eq(professional_id)),
        None => update.filter(booking::Column::ProfessionalId.is_null()),
    }
}

fn into_bookings(models: Vec<booking::Model>) -> AppResult<Vec<Booking>> {
    models.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for BookingStore {
    async fn create(&self, new: NewBooking) -> AppResult<Booking> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(new.customer_id),
            professional_id: Set(new.professional_id),
            service_id: Set(Some(new.service_id)),
            service_type: Set(new.service_type),
            scheduled_at: Set(new.scheduled_at),
            status: Set(BookingStatus::Pending.as_str().to_string()),
            payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
            payment_intent_id: Set(None),
            price: Set(new.price),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Booking::try_from(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        self.fetch(id).await
    }

    async fn list(&self, scope: BookingScope) -> AppResult<Vec<Booking>> {
        let query = match scope {
            BookingScope::Customer(id) => {
                BookingEntity::find().filter(booking::Column::CustomerId.eq(id))
            }
            BookingScope::Professional(id) => {
                BookingEntity::find().filter(booking::Column::ProfessionalId.eq(id))
            }
            BookingScope::All => BookingEntity::find(),
        };

        let models = query
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await?;
        into_bookings(models)
    }

    async fn list_open(&self) -> AppResult<Vec<Booking>> {
        let models = BookingEntity::find()
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .filter(booking::Column::ProfessionalId.is_null())
            .order_by_asc(booking::Column::ScheduledAt)
            .all(&self.db)
            .await?;
        into_bookings(models)
    }

    async fn assign(
        &self,
        id: Uuid,
        guard: BookingGuard,
        professional_id: Uuid,
    ) -> AppResult<Option<Booking>> {
        let update = BookingEntity::update_many()
            .col_expr(
                booking::Column::ProfessionalId,
                Expr::value(Some(professional_id)),
            )
            .col_expr(
                booking::Column::Status,
                Expr::value(BookingStatus::Accepted.as_str()),
            )
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id));

        let result = guarded(update, guard).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.fetch(id).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        guard: BookingGuard,
        status: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        let update = BookingEntity::update_many()
            .col_expr(booking::Column::Status, Expr::value(status.as_str()))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id));

        let result = guarded(update, guard).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.fetch(id).await
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> AppResult<Option<PaymentApplication>> {
        let result = BookingEntity::update_many()
            .col_expr(
                booking::Column::PaymentStatus,
                Expr::value(PaymentStatus::Paid.as_str()),
            )
            .col_expr(
                booking::Column::PaymentIntentId,
                Expr::value(Some(payment_intent_id.to_string())),
            )
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::PaymentStatus.eq(PaymentStatus::Unpaid.as_str()))
            .exec(&self.db)
            .await?;

        let applied = result.rows_affected > 0;
        Ok(self.fetch(id).await?.map(|booking| {
            if applied {
                PaymentApplication::Applied(booking)
            } else {
                PaymentApplication::AlreadyPaid(booking)
            }
        }))
    }
}
