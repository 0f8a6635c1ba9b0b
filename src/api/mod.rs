//! HTTP boundary.
//!
//! Routing, bearer and rate-limit middleware, request extractors and the
//! OpenAPI document. Handlers stay thin and delegate to the service traits
//! held in [`AppState`].

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
