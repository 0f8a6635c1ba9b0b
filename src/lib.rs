//! Helpora - home-services marketplace API
//!
//! Customers book services that providers list; payments are settled
//! through an external card processor and reconciled from two directions.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Roles, profiles, listings, bookings and payment rules
//! - **services**: Use cases (auth, catalog, bookings, payments)
//! - **infra**: Database, Redis, payment processor and document storage
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response shapes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! helpora serve --port 5000
//!
//! # Run migrations
//! helpora migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::{create_router, AppState};
pub use config::Config;
pub use domain::{Booking, BookingStatus, Identity, Listing, PaymentStatus, Role};
pub use errors::{AppError, AppResult};
