//! Application state - Dependency injection container.
//!
//! Handlers reach services only through their traits, so the router can be
//! driven by fakes in tests.

use std::sync::Arc;

use crate::infra::{HealthProbe, RateLimiter};
use crate::services::{
    AuthService, BookingService, CatalogService, PaymentService, ServiceContainer,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub catalog_service: Arc<dyn CatalogService>,
    pub booking_service: Arc<dyn BookingService>,
    pub payment_service: Arc<dyn PaymentService>,
    /// Fixed-window request counter
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Dependencies reported by `/health`
    pub probes: Arc<[Arc<dyn HealthProbe>]>,
    /// CORS allow-list
    pub allowed_origins: Arc<[String]>,
    /// Whether the rate limiter keys on proxy-supplied client addresses
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// Assemble state from a service container and the shared infrastructure.
    pub fn new(
        services: &dyn ServiceContainer,
        rate_limiter: Arc<dyn RateLimiter>,
        probes: Vec<Arc<dyn HealthProbe>>,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            auth_service: services.auth(),
            catalog_service: services.catalog(),
            booking_service: services.bookings(),
            payment_service: services.payments(),
            rate_limiter,
            probes: probes.into(),
            allowed_origins: allowed_origins.into(),
            trust_proxy_headers: false,
        }
    }

    /// Key rate limits on `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address.
    pub fn with_trusted_proxy_headers(mut self, trusted: bool) -> Self {
        self.trust_proxy_headers = trusted;
        self
    }
}
