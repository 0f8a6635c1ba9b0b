//! Service listing database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Listing, ServiceCategory};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub category: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Rows with a category outside the fixed set indicate data corruption.
impl TryFrom<Model> for Listing {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let category = ServiceCategory::from_label(&model.category).ok_or_else(|| {
            AppError::internal(format!(
                "Listing {} has unknown category '{}'",
                model.id, model.category
            ))
        })?;

        Ok(Listing {
            id: model.id,
            provider_id: model.provider_id,
            title: model.title,
            description: model.description,
            price: model.price,
            category,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
