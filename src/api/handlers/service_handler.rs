//! Service catalog handlers.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Extension, Router,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::{Identity, Listing, ListingInput};
use crate::errors::AppResult;
use crate::types::{Created, MessageResponse};

/// Routes anyone may call
pub fn public_service_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services))
        .route("/:id", get(get_service))
}

/// Routes that need an authenticated provider
pub fn provider_service_routes() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_service))
        .route("/my-services", get(my_services))
        .route("/:id", axum::routing::put(update_service).delete(delete_service))
}

/// List every service, newest first
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Services",
    responses((status = 200, description = "All listings", body = Vec<Listing>))
)]
pub async fn list_services(State(state): State<AppState>) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(state.catalog_service.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing", body = Listing),
        (status = 404, description = "Service not found")
    )
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Listing>> {
    Ok(Json(state.catalog_service.get(id).await?))
}

/// The calling provider's listings
#[utoipa::path(
    get,
    path = "/api/services/my-services",
    tag = "Services",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own listings", body = Vec<Listing>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a provider")
    )
)]
pub async fn my_services(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(state.catalog_service.list_mine(&caller).await?))
}

#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Services",
    security(("bearer_auth" = [])),
    request_body = ListingInput,
    responses(
        (status = 201, description = "Listing created", body = Listing),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not a provider")
    )
)]
pub async fn create_service(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Json(input): Json<ListingInput>,
) -> AppResult<Created<Listing>> {
    let listing = state.catalog_service.create(&caller, input).await?;
    Ok(Created(listing))
}

#[utoipa::path(
    put,
    path = "/api/services/{id}",
    tag = "Services",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = ListingInput,
    responses(
        (status = 200, description = "Listing updated", body = Listing),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Service not found")
    )
)]
pub async fn update_service(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(input): Json<ListingInput>,
) -> AppResult<Json<Listing>> {
    Ok(Json(state.catalog_service.update(&caller, id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    tag = "Services",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Service not found")
    )
)]
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.catalog_service.delete(&caller, id).await?;
    Ok(Json(MessageResponse::new("Service deleted successfully")))
}
