use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use validator::Validate;

use super::types::{
    CompleteWithdrawalRequest, DepositRequest, InvestRequest, WalletOverview, WithdrawalRequest,
};
use crate::gateway::cache::load_active_assets_cached;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ErrorCode, api_error, error_codes};
use crate::ledger::{CryptoAsset, Investment, Plan, PlanInfo, PortfolioSnapshot, Transaction};
use crate::user_auth::otp::OtpChallenge;
use crate::user_auth::principal::Principal;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LimitQuery {
    /// Max rows (1..=500, default 100)
    pub limit: Option<i64>,
}

fn invalid(e: validator::ValidationErrors) -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        error_codes::INVALID_PARAMETER,
        e.to_string(),
    )
}

/// Balances, positions and pending withdrawals
///
/// GET /api/v1/wallet/overview
#[utoipa::path(
    get,
    path = "/api/v1/wallet/overview",
    responses(
        (status = 200, description = "Wallet overview", body = ApiResponse<WalletOverview>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<WalletOverview> {
    let overview = state
        .funds
        .wallet_overview(principal.user_id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(overview)))
}

/// Own transactions, newest first
///
/// GET /api/v1/wallet/transactions
#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    params(LimitQuery),
    responses(
        (status = 200, description = "Transaction history", body = ApiResponse<Vec<Transaction>>)
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn transactions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Transaction>> {
    let history = state
        .funds
        .transaction_history(principal.user_id, query.limit)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(history)))
}

/// Daily portfolio values, oldest first
///
/// GET /api/v1/wallet/portfolio
#[utoipa::path(
    get,
    path = "/api/v1/wallet/portfolio",
    params(LimitQuery),
    responses(
        (status = 200, description = "Portfolio history", body = ApiResponse<Vec<PortfolioSnapshot>>)
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn portfolio(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<PortfolioSnapshot>> {
    let history = state
        .funds
        .portfolio_history(principal.user_id, query.limit)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(history)))
}

/// Declare a deposit; credited after admin approval
///
/// POST /api/v1/wallet/deposit
#[utoipa::path(
    post,
    path = "/api/v1/wallet/deposit",
    request_body = DepositRequest,
    responses(
        (status = 201, description = "Pending deposit recorded", body = ApiResponse<Transaction>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    req.validate().map_err(invalid)?;
    let tx = state
        .funds
        .request_deposit(principal.user_id, req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tx))))
}

/// Step 1: check funds and email a confirmation code
///
/// POST /api/v1/wallet/withdraw/request
#[utoipa::path(
    post,
    path = "/api/v1/wallet/withdraw/request",
    request_body = WithdrawalRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<OtpChallenge>),
        (status = 422, description = "Insufficient funds"),
        (status = 429, description = "Code requested too recently")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn withdraw_request(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<WithdrawalRequest>,
) -> ApiResult<OtpChallenge> {
    req.validate().map_err(invalid)?;
    let challenge = state
        .funds
        .request_withdrawal(principal.user_id, &req)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(challenge)))
}

/// Step 2: submit the code; records a pending withdrawal
///
/// POST /api/v1/wallet/withdraw/complete
#[utoipa::path(
    post,
    path = "/api/v1/wallet/withdraw/complete",
    request_body = CompleteWithdrawalRequest,
    responses(
        (status = 201, description = "Pending withdrawal recorded", body = ApiResponse<Transaction>),
        (status = 400, description = "Invalid code"),
        (status = 422, description = "Insufficient funds")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn withdraw_complete(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CompleteWithdrawalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    req.validate().map_err(invalid)?;
    let tx = state
        .funds
        .complete_withdrawal(principal.user_id, &req.withdrawal, &req.otp_code)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tx))))
}

/// Buy into a plan from the wallet balance
///
/// POST /api/v1/wallet/invest
#[utoipa::path(
    post,
    path = "/api/v1/wallet/invest",
    request_body = InvestRequest,
    responses(
        (status = 201, description = "Investment created or topped up", body = ApiResponse<Investment>),
        (status = 422, description = "Insufficient funds")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn invest(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<InvestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Investment>>), ApiError> {
    let outcome = state
        .funds
        .create_investment(principal.user_id, req.plan, req.amount)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(outcome.investment)),
    ))
}

/// Plan table
///
/// GET /api/v1/wallet/plans
#[utoipa::path(
    get,
    path = "/api/v1/wallet/plans",
    responses(
        (status = 200, description = "Available plans", body = ApiResponse<Vec<PlanInfo>>)
    ),
    tag = "Wallet"
)]
pub async fn plans() -> Json<ApiResponse<Vec<PlanInfo>>> {
    Json(ApiResponse::success(
        Plan::ALL.into_iter().map(PlanInfo::from).collect(),
    ))
}

/// Depositable assets and their addresses
///
/// GET /api/v1/wallet/assets
#[utoipa::path(
    get,
    path = "/api/v1/wallet/assets",
    responses(
        (status = 200, description = "Active assets", body = ApiResponse<Vec<CryptoAsset>>)
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn assets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CryptoAsset>> {
    let assets = load_active_assets_cached(state.store.clone())
        .await
        .map_err(|e| {
            tracing::error!("[WALLET] {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Failed to load assets",
            )
        })?;
    Ok(Json(ApiResponse::success(assets)))
}
