//! Listing repository for the public service catalog.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::listing::{self, ActiveModel, Entity as ListingEntity};
use crate::domain::{Listing, ListingDraft};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Listing repository trait for dependency injection.
///
/// Mutations are scoped to the owning provider: a write that matches no
/// row owned by `provider_id` reports nothing changed.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// All listings, newest first
    async fn list(&self) -> AppResult<Vec<Listing>>;

    /// Listings owned by one provider, newest first
    async fn list_by_provider(&self, provider_id: Uuid) -> AppResult<Vec<Listing>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Listing>>;

    async fn create(&self, provider_id: Uuid, draft: ListingDraft) -> AppResult<Listing>;

    /// Returns `None` when no listing with this id belongs to the provider.
    async fn update_owned(
        &self,
        id: Uuid,
        provider_id: Uuid,
        draft: ListingDraft,
    ) -> AppResult<Option<Listing>>;

    /// Returns `false` when no listing with this id belongs to the provider.
    async fn delete_owned(&self, id: Uuid, provider_id: Uuid) -> AppResult<bool>;
}

/// Reads use the restricted tier; writes, already authorized by the
/// catalog service, use the elevated one.
pub struct ListingStore {
    reader: DatabaseConnection,
    writer: DatabaseConnection,
}

impl ListingStore {
    pub fn new(reader: DatabaseConnection, writer: DatabaseConnection) -> Self {
        Self { reader, writer }
    }
}

fn into_listings(models: Vec<listing::Model>) -> AppResult<Vec<Listing>> {
    models.into_iter().map(Listing::try_from).collect()
}

#[async_trait]
impl ListingRepository for ListingStore {
    async fn list(&self) -> AppResult<Vec<Listing>> {
        let models = ListingEntity::find()
            .order_by_desc(listing::Column::CreatedAt)
            .all(&self.reader)
            .await?;
        into_listings(models)
    }

    async fn list_by_provider(&self, provider_id: Uuid) -> AppResult<Vec<Listing>> {
        let models = ListingEntity::find()
            .filter(listing::Column::ProviderId.eq(provider_id))
            .order_by_desc(listing::Column::CreatedAt)
            .all(&self.reader)
            .await?;
        into_listings(models)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Listing>> {
        ListingEntity::find_by_id(id)
            .one(&self.reader)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn create(&self, provider_id: Uuid, draft: ListingDraft) -> AppResult<Listing> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            provider_id: Set(provider_id),
            title: Set(draft.title),
            description: Set(draft.description),
            price: Set(draft.price),
            category: Set(draft.category.label().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.writer).await?;
        Listing::try_from(model)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        provider_id: Uuid,
        draft: ListingDraft,
    ) -> AppResult<Option<Listing>> {
        let result = ListingEntity::update_many()
            .col_expr(listing::Column::Title, Expr::value(draft.title))
            .col_expr(listing::Column::Description, Expr::value(draft.description))
            .col_expr(listing::Column::Price, Expr::value(draft.price))
            .col_expr(
                listing::Column::Category,
                Expr::value(draft.category.label()),
            )
            .col_expr(listing::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(listing::Column::Id.eq(id))
            .filter(listing::Column::ProviderId.eq(provider_id))
            .exec(&self.writer)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        ListingEntity::find_by_id(id)
            .one(&self.writer)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn delete_owned(&self, id: Uuid, provider_id: Uuid) -> AppResult<bool> {
        let result = ListingEntity::delete_many()
            .filter(listing::Column::Id.eq(id))
            .filter(listing::Column::ProviderId.eq(provider_id))
            .exec(&self.writer)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
