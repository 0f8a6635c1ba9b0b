//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::extractors::SignupRequest;
use crate::api::handlers::{
    auth_handler, booking_handler, health_handler, payment_handler, service_handler,
};
use crate::domain::{
    Booking, BookingStatus, Identity, Listing, ListingInput, PaymentStatus, ProfileResponse, Role,
    ServiceCategory,
};
use crate::services::{BookingRequest, IntentResponse, LoginOutcome, SignupOutcome, TokenResponse};
use crate::types::{BookingResponse, MessageResponse};

/// OpenAPI documentation for the Helpora API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Helpora API",
        version = "0.1.0",
        description = "Home-services marketplace: provider listings, bookings and card payments",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        health_handler::health,
        auth_handler::signup,
        auth_handler::login,
        service_handler::list_services,
        service_handler::get_service,
        service_handler::my_services,
        service_handler::create_service,
        service_handler::update_service,
        service_handler::delete_service,
        booking_handler::create_booking,
        booking_handler::list_bookings,
        booking_handler::open_bookings,
        booking_handler::assign_professional,
        booking_handler::update_status,
        payment_handler::create_intent,
        payment_handler::confirm_booking,
        payment_handler::webhook,
    ),
    components(
        schemas(
            // Domain types
            Role,
            Identity,
            ProfileResponse,
            ServiceCategory,
            Listing,
            ListingInput,
            BookingStatus,
            PaymentStatus,
            Booking,
            // Requests
            SignupRequest,
            auth_handler::LoginRequest,
            BookingRequest,
            booking_handler::AssignRequest,
            booking_handler::StatusRequest,
            payment_handler::CreateIntentRequest,
            payment_handler::ConfirmBookingRequest,
            // Responses
            TokenResponse,
            SignupOutcome,
            LoginOutcome,
            BookingResponse,
            MessageResponse,
            IntentResponse,
            payment_handler::WebhookAck,
            health_handler::HealthResponse,
            health_handler::ServiceStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Dependency status"),
        (name = "Authentication", description = "Signup and login"),
        (name = "Services", description = "Provider listings"),
        (name = "Bookings", description = "Booking lifecycle"),
        (name = "Payments", description = "Checkout and reconciliation")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/signup",
            "/api/services/{id}",
            "/api/bookings/{id}/status",
            "/api/payments/webhook",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
