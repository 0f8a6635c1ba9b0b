//! Bearer authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::errors::AppError;

/// Resolve the bearer token into an [`Identity`](crate::domain::Identity)
/// and attach it to the request extensions.
///
/// The role comes from the stored profile, never from the token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let identity = state.auth_service.resolve(token).await?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
