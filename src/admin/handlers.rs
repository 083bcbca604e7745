use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::distribution::{RunReport, SnapshotReport};
use crate::funding::handlers::LimitQuery;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, ErrorCode};
use crate::ledger::{
    CryptoAsset, InvestmentId, Role, Transaction, TransactionEdit, TransactionId, User, UserId,
};
use crate::user_auth::principal::Principal;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForceEditRequest {
    #[serde(flatten)]
    pub edit: TransactionEdit,
    /// Why the ledger is being overridden; kept in the audit log
    #[schema(example = "Deposit priced manually from exchange rate at 12:00 UTC")]
    pub justification: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Pending deposits and withdrawals, newest first
///
/// GET /api/v1/admin/transactions/pending
#[utoipa::path(
    get,
    path = "/api/v1/admin/transactions/pending",
    params(LimitQuery),
    responses(
        (status = 200, description = "Pending transactions", body = ApiResponse<Vec<Transaction>>),
        (status = 403, description = "Admin privileges required")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn pending_transactions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Transaction>> {
    let txs = state
        .admin
        .pending_transactions(&principal, query.limit)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(txs)))
}

/// Confirm a deposit or withdrawal
///
/// POST /api/v1/admin/transactions/{id}/approve
#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/{id}/approve",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction completed", body = ApiResponse<Transaction>),
        (status = 409, description = "Already finalized"),
        (status = 422, description = "Insufficient funds, transaction stays pending")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn approve_transaction(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Transaction> {
    let tx = state
        .admin
        .approve_transaction(&principal, id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(tx)))
}

/// Fail a pending transaction
///
/// POST /api/v1/admin/transactions/{id}/reject
#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/{id}/reject",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction failed", body = ApiResponse<Transaction>),
        (status = 409, description = "Already completed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn reject_transaction(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Transaction> {
    let tx = state
        .admin
        .reject_transaction(&principal, id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(tx)))
}

/// Manual override, audit logged
///
/// PATCH /api/v1/admin/transactions/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/admin/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    request_body = ForceEditRequest,
    responses(
        (status = 200, description = "Transaction edited", body = ApiResponse<Transaction>),
        (status = 400, description = "Missing justification or empty edit")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn force_edit_transaction(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TransactionId>,
    Json(req): Json<ForceEditRequest>,
) -> ApiResult<Transaction> {
    let tx = state
        .admin
        .force_edit_transaction(&principal, id, &req.edit, &req.justification)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(tx)))
}

/// DELETE /api/v1/admin/transactions/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TransactionId>,
) -> ApiResult<()> {
    state
        .admin
        .delete_transaction(&principal, id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// DELETE /api/v1/admin/investments/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/investments/{id}",
    params(("id" = i64, Path, description = "Investment id")),
    responses(
        (status = 200, description = "Deleted; wallet not refunded"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn delete_investment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<InvestmentId>,
) -> ApiResult<()> {
    state
        .admin
        .delete_investment(&principal, id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/v1/admin/investments/{id}/close
#[utoipa::path(
    post,
    path = "/api/v1/admin/investments/{id}/close",
    params(("id" = i64, Path, description = "Investment id")),
    responses(
        (status = 200, description = "Closed; wallet not refunded"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn close_investment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<InvestmentId>,
) -> ApiResult<()> {
    state
        .admin
        .close_investment(&principal, id)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// GET /api/v1/admin/users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "All users", body = ApiResponse<Vec<User>>)
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<User>> {
    let users = state
        .admin
        .list_users(&principal)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(users)))
}

/// PUT /api/v1/admin/users/{id}/role
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    params(("id" = i64, Path, description = "User id")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role changed"),
        (status = 400, description = "Cannot change own role")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<UserId>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<()> {
    state
        .admin
        .set_user_role(&principal, id, req.role)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(())))
}

/// Create or replace an asset and its networks
///
/// PUT /api/v1/admin/assets
#[utoipa::path(
    put,
    path = "/api/v1/admin/assets",
    request_body = CryptoAsset,
    responses(
        (status = 200, description = "Asset saved", body = ApiResponse<CryptoAsset>),
        (status = 400, description = "Invalid asset")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn upsert_asset(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(asset): Json<CryptoAsset>,
) -> ApiResult<CryptoAsset> {
    let asset = state
        .admin
        .upsert_asset(&principal, asset)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(asset)))
}

/// Snapshot then accrue for today's UTC date, once per date
///
/// POST /api/v1/admin/distribution/run
#[utoipa::path(
    post,
    path = "/api/v1/admin/distribution/run",
    responses(
        (status = 200, description = "Distribution report", body = ApiResponse<RunReport>),
        (status = 409, description = "Already distributed today")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn run_distribution(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RunReport> {
    let report = state
        .admin
        .run_distribution(&principal)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(report)))
}

/// Portfolio snapshot for today; refused once today's distribution has run
///
/// POST /api/v1/admin/distribution/snapshot
#[utoipa::path(
    post,
    path = "/api/v1/admin/distribution/snapshot",
    responses(
        (status = 200, description = "Snapshot written", body = ApiResponse<SnapshotReport>),
        (status = 409, description = "Today's distribution already ran")
    ),
    security(("bearer_jwt" = [])),
    tag = "Admin"
)]
pub async fn run_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<SnapshotReport> {
    let report = state
        .admin
        .run_snapshot(&principal)
        .await
        .map_err(|e| e.to_api_error())?;
    Ok(Json(ApiResponse::success(report)))
}
