//! Service catalog - provider listings.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Identity, Listing, ListingDraft, ListingInput};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::ListingRepository;

const LISTING: &str = "Service";

/// Catalog service trait for dependency injection.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Public catalog, newest first
    async fn list(&self) -> AppResult<Vec<Listing>>;

    async fn get(&self, id: Uuid) -> AppResult<Listing>;

    /// The calling provider's own listings
    async fn list_mine(&self, caller: &Identity) -> AppResult<Vec<Listing>>;

    async fn create(&self, caller: &Identity, input: ListingInput) -> AppResult<Listing>;

    async fn update(&self, caller: &Identity, id: Uuid, input: ListingInput) -> AppResult<Listing>;

    async fn delete(&self, caller: &Identity, id: Uuid) -> AppResult<()>;
}

pub struct CatalogManager {
    listings: Arc<dyn ListingRepository>,
}

impl CatalogManager {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self { listings }
    }

    /// Load a listing and check the caller owns it.
    async fn owned(&self, caller: &Identity, id: Uuid, denied: &str) -> AppResult<Listing> {
        let listing = self.listings.find_by_id(id).await?.ok_or_not_found(LISTING)?;
        if !listing.is_owned_by(caller.id) {
            tracing::warn!(listing_id = %id, caller = %caller.id, "Listing ownership check failed");
            return Err(AppError::forbidden(denied));
        }
        Ok(listing)
    }
}

fn require_provider(caller: &Identity) -> AppResult<()> {
    if caller.role.is_professional() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only providers can manage services"))
    }
}

#[async_trait]
impl CatalogService for CatalogManager {
    async fn list(&self) -> AppResult<Vec<Listing>> {
        self.listings.list().await
    }

    async fn get(&self, id: Uuid) -> AppResult<Listing> {
        self.listings.find_by_id(id).await?.ok_or_not_found(LISTING)
    }

    async fn list_mine(&self, caller: &Identity) -> AppResult<Vec<Listing>> {
        require_provider(caller)?;
        self.listings.list_by_provider(caller.id).await
    }

    async fn create(&self, caller: &Identity, input: ListingInput) -> AppResult<Listing> {
        require_provider(caller)?;
        let draft = ListingDraft::parse(&input)?;

        let listing = self.listings.create(caller.id, draft).await?;
        tracing::info!(listing_id = %listing.id, provider_id = %caller.id, "Listing created");
        Ok(listing)
    }

    async fn update(&self, caller: &Identity, id: Uuid, input: ListingInput) -> AppResult<Listing> {
        require_provider(caller)?;
        let draft = ListingDraft::parse(&input)?;
        self.owned(caller, id, "Unauthorized to update this service").await?;

        self.listings
            .update_owned(id, caller.id, draft)
            .await?
            .ok_or_not_found(LISTING)
    }

    async fn delete(&self, caller: &Identity, id: Uuid) -> AppResult<()> {
        require_provider(caller)?;
        self.owned(caller, id, "Unauthorized to delete this service").await?;

        if !self.listings.delete_owned(id, caller.id).await? {
            return Err(AppError::NotFound(LISTING));
        }
        tracing::info!(listing_id = %id, provider_id = %caller.id, "Listing deleted");
        Ok(())
    }
}
