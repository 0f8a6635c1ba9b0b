//! Booking database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Booking, BookingStatus, PaymentStatus};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub service_type: String,
    pub scheduled_at: DateTimeUtc,
    pub status: String,
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Booking {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&model.status).ok_or_else(|| {
            AppError::internal(format!(
                "Booking {} has unknown status '{}'",
                model.id, model.status
            ))
        })?;

        Ok(Booking {
            id: model.id,
            customer_id: model.customer_id,
            professional_id: model.professional_id,
            service_id: model.service_id,
            service_type: model.service_type,
            scheduled_at: model.scheduled_at,
            status,
            payment_status: PaymentStatus::from(model.payment_status.as_str()),
            payment_intent_id: model.payment_intent_id,
            price: model.price,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
