//! Authentication handlers.

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::{SignupForm, SignupRequest, ValidatedJson};
use crate::api::AppState;
use crate::config::MAX_DOCUMENT_BYTES;
use crate::errors::AppResult;
use crate::services::{LoginOutcome, SignupOutcome};
use crate::types::Created;

/// Headroom for the text fields sent next to the document.
const SIGNUP_FORM_OVERHEAD: usize = 64 * 1024;

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "secret123")]
    pub password: String,
}

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/signup",
            post(signup).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + SIGNUP_FORM_OVERHEAD)),
        )
        .route("/login", post(login))
}

/// Register a customer or provider
///
/// Providers may attach an identity document by sending
/// `multipart/form-data` with an `idDocument` file part.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Authentication",
    request_body(content = SignupRequest, description = "JSON, or multipart with an `idDocument` file"),
    responses(
        (status = 201, description = "Profile created", body = SignupOutcome),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    SignupForm(input): SignupForm,
) -> AppResult<Created<SignupOutcome>> {
    let outcome = state.auth_service.signup(input).await?;
    Ok(Created(outcome))
}

/// Login and get a session token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginOutcome),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginOutcome>> {
    let outcome = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(outcome))
}
