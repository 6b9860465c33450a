use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info};

use crate::api::ApiError;
use crate::auth::Identity;
use crate::server::AppState;

/// Marker left on a request that carried a bearer token we could not verify.
#[derive(Debug, Clone, Copy)]
pub struct InvalidToken;

pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        method = %method,
        url = %uri,
        status = status,
        length = content_length,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "HTTP request"
    );

    response
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Decode the bearer token once per request and attach the caller's
/// [`Identity`]. Requests without a valid token pass through untouched;
/// the route guards decide what that means.
pub async fn attach_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(&req) {
        match state.tokens.verify(token) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) => {
                debug!("rejected bearer token: {}", e);
                req.extensions_mut().insert(InvalidToken);
            }
        }
    }
    next.run(req).await
}

fn identity(req: &Request) -> Result<&Identity, ApiError> {
    if let Some(identity) = req.extensions().get::<Identity>() {
        return Ok(identity);
    }
    if req.extensions().get::<InvalidToken>().is_some() {
        return Err(ApiError::Unauthorized("Invalid or expired token".to_string()));
    }
    Err(ApiError::Unauthorized("Authentication required".to_string()))
}

pub async fn require_auth(req: Request, next: Next) -> Result<Response, ApiError> {
    identity(&req)?;
    Ok(next.run(req).await)
}

/// Favorites and ratings belong to regular users; admins are turned away.
pub async fn require_user(req: Request, next: Next) -> Result<Response, ApiError> {
    if identity(&req)?.is_admin() {
        return Err(ApiError::Forbidden("Admins cannot use this feature".to_string()));
    }
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    if !identity(&req)?.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(next.run(req).await)
}
