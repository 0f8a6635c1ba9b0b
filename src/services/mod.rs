//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain rules and infrastructure to fulfill
//! application use cases. They depend on repository and client traits
//! so every use case can be exercised without a database or network.

mod auth_service;
mod booking_service;
mod catalog_service;
pub mod container;
mod payment_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{
    AuthService, Authenticator, Claims, LoginOutcome, SignupInput, SignupOutcome, TokenResponse,
};
pub use booking_service::{BookingManager, BookingRequest, BookingService};
pub use catalog_service::{CatalogManager, CatalogService};
pub use payment_service::{IntentResponse, PaymentManager, PaymentService, WebhookOutcome};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
