//! Service Container - Centralized service access.
//!
//! Wires stores and external clients into the service implementations once
//! at startup. Handlers only ever see the service traits.

use std::sync::Arc;

use super::{AuthService, BookingService, CatalogService, PaymentService};
use crate::config::Config;
use crate::infra::{
    BookingStore, Database, DocumentStore, ListingStore, PaymentGateway, ProfileStore,
    WebhookVerifier,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    /// Listings catalog
    fn catalog(&self) -> Arc<dyn CatalogService>;

    fn bookings(&self) -> Arc<dyn BookingService>;

    /// Payment intents, confirmation and webhooks
    fn payments(&self) -> Arc<dyn PaymentService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    catalog_service: Arc<dyn CatalogService>,
    booking_service: Arc<dyn BookingService>,
    payment_service: Arc<dyn PaymentService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        catalog_service: Arc<dyn CatalogService>,
        booking_service: Arc<dyn BookingService>,
        payment_service: Arc<dyn PaymentService>,
    ) -> Self {
        Self {
            auth_service,
            catalog_service,
            booking_service,
            payment_service,
        }
    }

    /// Build every service over the database tiers and external clients.
    ///
    /// Public catalog reads go through the restricted connection; profile,
    /// booking and payment writes need the elevated one.
    pub fn build(
        database: &Database,
        documents: Arc<dyn DocumentStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: Config,
    ) -> Self {
        use super::{Authenticator, BookingManager, CatalogManager, PaymentManager};

        let profiles = Arc::new(ProfileStore::new(database.elevated()));
        let listings = Arc::new(ListingStore::new(database.restricted(), database.elevated()));
        let bookings = Arc::new(BookingStore::new(database.elevated()));

        let verifier = WebhookVerifier::new(config.webhook_secret());
        let currency = config.payment_currency.clone();

        Self {
            auth_service: Arc::new(Authenticator::new(profiles.clone(), documents, config)),
            catalog_service: Arc::new(CatalogManager::new(listings.clone())),
            booking_service: Arc::new(BookingManager::new(
                bookings.clone(),
                listings,
                profiles,
            )),
            payment_service: Arc::new(PaymentManager::new(bookings, gateway, verifier, currency)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn catalog(&self) -> Arc<dyn CatalogService> {
        self.catalog_service.clone()
    }

    fn bookings(&self) -> Arc<dyn BookingService> {
        self.booking_service.clone()
    }

    fn payments(&self) -> Arc<dyn PaymentService> {
        self.payment_service.clone()
    }
}
