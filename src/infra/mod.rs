//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - Redis-backed rate limiting
//! - Payment processor client and webhook verification
//! - Identity document storage

pub mod cache;
pub mod db;
pub mod health;
pub mod payments;
pub mod repositories;
pub mod storage;

pub use cache::{Cache, RateLimiter};
pub use db::{Database, Migrator};
pub use health::HealthProbe;
pub use payments::{GatewayError, PaymentGateway, StripeGateway, WebhookEvent, WebhookVerifier};
pub use repositories::{
    BookingRepository, BookingStore, ListingRepository, ListingStore, ProfileRepository,
    ProfileStore,
};
pub use storage::{DocumentStore, LocalDocumentStore, UploadedDocument};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockRateLimiter;
#[cfg(any(test, feature = "test-utils"))]
pub use payments::MockPaymentGateway;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockBookingRepository, MockListingRepository, MockProfileRepository};
#[cfg(any(test, feature = "test-utils"))]
pub use storage::MockDocumentStore;
