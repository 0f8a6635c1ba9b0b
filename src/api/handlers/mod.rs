//! HTTP request handlers.

pub mod auth_handler;
pub mod booking_handler;
pub mod health_handler;
pub mod payment_handler;
pub mod service_handler;

pub use auth_handler::auth_routes;
pub use booking_handler::booking_routes;
pub use payment_handler::{payment_routes, webhook_routes};
pub use service_handler::{provider_service_routes, public_service_routes};
