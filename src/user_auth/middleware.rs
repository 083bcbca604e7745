use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::principal::{Capability, Principal};
use crate::gateway::{
    state::AppState,
    types::{ApiError, ErrorCode, api_error, error_codes},
};

/// Bearer JWT → [`Principal`] in request extensions
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Missing Authorization header",
            )
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        api_error(
            StatusCode::UNAUTHORIZED,
            error_codes::AUTH_FAILED,
            "Invalid token format",
        )
    })?;

    // 2. Verify Token
    let principal = state
        .accounts
        .verify_token(token)
        .and_then(|claims| Principal::try_from(&claims))
        .map_err(|e| e.to_api_error())?;

    // 3. Inject caller
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Rejects non-admin principals; must run after [`jwt_auth_middleware`]
pub async fn require_admin_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .copied()
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Not authenticated",
            )
        })?;

    principal
        .require(Capability::ReconcileLedger)
        .map_err(|e| e.to_api_error())?;

    Ok(next.run(request).await)
}
