//! Application route configuration.

use axum::{
    http::{
        header::{
            HeaderName, AUTHORIZATION, CONTENT_SECURITY_POLICY, CONTENT_TYPE, REFERRER_POLICY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        HeaderValue, Method,
    },
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    auth_routes, booking_routes, health_handler, payment_routes, provider_service_routes,
    public_service_routes, webhook_routes,
};
use super::middleware::{auth_middleware, rate_limit_auth_middleware, rate_limit_middleware};
use super::openapi::ApiDoc;
use super::AppState;

/// Allows the payment processor's checkout script and API.
const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
    script-src 'self' https://js.stripe.com; \
    frame-src 'self' https://js.stripe.com; \
    connect-src 'self' https://api.stripe.com; \
    img-src 'self' data: blob:; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com https://cdnjs.cloudflare.com; \
    font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com";

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Signup and login (stricter rate limiting)
        .nest(
            "/auth",
            auth_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_auth_middleware,
            )),
        )
        // Catalog reads are public; writes need a provider
        .nest(
            "/services",
            public_service_routes()
                .merge(provider_service_routes().route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )))
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware)),
        )
        .nest(
            "/bookings",
            booking_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware)),
        )
        // The webhook is verified by signature and never rate limited
        .nest(
            "/payments",
            payment_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
                .merge(webhook_routes()),
        );

    Router::new()
        .route("/", get(health_handler::root))
        .route("/health", get(health_handler::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        // Global middleware
        .layer(header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(header(X_FRAME_OPTIONS, "DENY"))
        .layer(header(REFERRER_POLICY, "no-referrer"))
        .layer(header(CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_VALUE))
        .layer(cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

fn header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}
