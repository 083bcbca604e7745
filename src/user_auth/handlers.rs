use axum::{Extension, Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::otp::OtpChallenge;
use super::principal::Principal;
use super::service::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    VerifyCodeRequest,
};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ErrorCode};
use crate::ledger::User;

/// Register a new user
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, signup code sent", body = ApiResponse<OtpChallenge>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OtpChallenge>>), ApiError> {
    match state.accounts.register(req).await {
        Ok(challenge) => Ok((StatusCode::CREATED, Json(ApiResponse::success(challenge)))),
        Err(e) => {
            tracing::warn!("Registration failed: {}", e);
            Err(e.to_api_error())
        }
    }
}

/// Confirm the signup code
///
/// POST /api/v1/auth/verify
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Email verified", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn verify_signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<AuthResponse> {
    let response = state
        .accounts
        .verify_signup(req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(response)))
}

/// Login step 1: password, then a code is emailed
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login code sent", body = ApiResponse<OtpChallenge>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<OtpChallenge> {
    let challenge = state
        .accounts
        .login(req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(challenge)))
}

/// Login step 2: code → JWT
///
/// POST /api/v1/auth/login/verify
#[utoipa::path(
    post,
    path = "/api/v1/auth/login/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn verify_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<AuthResponse> {
    let response = state
        .accounts
        .verify_login(req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(response)))
}

/// Email a password reset code
///
/// POST /api/v1/auth/password/forgot
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/forgot",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Code sent if the account exists"),
        (status = 429, description = "Code requested too recently")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    state
        .accounts
        .forgot_password(req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// Set a new password with a reset code
///
/// POST /api/v1/auth/password/reset
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    state
        .accounts
        .reset_password(req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// Current user
///
/// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_jwt" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<User> {
    let user = state
        .accounts
        .me(&principal)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(user)))
}
