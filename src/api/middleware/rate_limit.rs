//! Rate limiting middleware backed by the shared counter store.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// A counter scope with its own window.
#[derive(Debug, Clone, Copy)]
struct Policy {
    scope: &'static str,
    max_requests: u64,
    window_seconds: u64,
}

const GENERAL: Policy = Policy {
    scope: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    window_seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Policy = Policy {
    scope: "auth",
    max_requests: RATE_LIMIT_AUTH_REQUESTS,
    window_seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later."
            }
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after));
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("0"));
        response
    }
}

/// Extract client identifier for rate limiting.
///
/// Proxy headers are client-controlled unless a proxy rewrites them, so they
/// are only read when `trust_proxy` is set. Otherwise the peer address wins.
fn client_identifier(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_client(request) {
            return ip;
        }
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

fn forwarded_client(request: &Request) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    // First hop is the original client
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
}

async fn enforce(
    state: &AppState,
    policy: Policy,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client_id = client_identifier(&request, state.trust_proxy_headers);
    let key = format!("{}:{}", policy.scope, client_id);

    let (count, allowed) = match state
        .rate_limiter
        .check_rate_limit(&key, policy.max_requests, policy.window_seconds)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            // Fail closed
            tracing::error!(error = %e, scope = policy.scope, "Rate limit check failed - denying request");
            return Err(RateLimitError {
                retry_after: policy.window_seconds,
            });
        }
    };

    if !allowed {
        tracing::warn!(client = %client_id, count, scope = policy.scope, "Rate limit exceeded");
        return Err(RateLimitError {
            retry_after: policy.window_seconds,
        });
    }

    let mut response = next.run(request).await;

    let remaining = policy.max_requests.saturating_sub(count);
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(policy.max_requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));

    Ok(response)
}

/// General API limit for bookings, services and payments.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, GENERAL, request, next).await
}

/// Stricter limit for signup and login.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, AUTH, request, next).await
}
