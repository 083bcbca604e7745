//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::admin::handlers::{ForceEditRequest, SetRoleRequest};
use crate::distribution::{AccrualFailure, AccrualReport, RunReport, SnapshotReport};
use crate::funding::types::{
    CompleteWithdrawalRequest, DepositRequest, InvestRequest, InvestmentView, SourceFunds,
    WalletOverview, WithdrawalRequest,
};
use crate::gateway::handlers::HealthResponse;
use crate::ledger::{
    AssetNetwork, CryptoAsset, Investment, InvestmentStatus, Plan, PlanInfo,
    PortfolioSnapshot, Role, Transaction, TransactionEdit, TxStatus, TxType, User,
};
use crate::user_auth::otp::OtpChallenge;
use crate::user_auth::service::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    VerifyCodeRequest,
};

/// Bearer JWT issued by `/api/v1/auth/login/verify`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Minebank API",
        version = "1.0.0",
        description = "Wallet, mining plan investments and daily ROI distribution.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        // Auth
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::verify_signup,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::verify_login,
        crate::user_auth::handlers::forgot_password,
        crate::user_auth::handlers::reset_password,
        crate::user_auth::handlers::me,
        // Wallet
        crate::funding::handlers::overview,
        crate::funding::handlers::transactions,
        crate::funding::handlers::portfolio,
        crate::funding::handlers::deposit,
        crate::funding::handlers::withdraw_request,
        crate::funding::handlers::withdraw_complete,
        crate::funding::handlers::invest,
        crate::funding::handlers::plans,
        crate::funding::handlers::assets,
        // Admin
        crate::admin::handlers::pending_transactions,
        crate::admin::handlers::approve_transaction,
        crate::admin::handlers::reject_transaction,
        crate::admin::handlers::force_edit_transaction,
        crate::admin::handlers::delete_transaction,
        crate::admin::handlers::delete_investment,
        crate::admin::handlers::close_investment,
        crate::admin::handlers::list_users,
        crate::admin::handlers::set_user_role,
        crate::admin::handlers::upsert_asset,
        crate::admin::handlers::run_distribution,
        crate::admin::handlers::run_snapshot,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            VerifyCodeRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AuthResponse,
            OtpChallenge,
            User,
            Role,
            DepositRequest,
            WithdrawalRequest,
            CompleteWithdrawalRequest,
            InvestRequest,
            SourceFunds,
            InvestmentView,
            WalletOverview,
            Transaction,
            TxType,
            TxStatus,
            Investment,
            InvestmentStatus,
            Plan,
            PlanInfo,
            PortfolioSnapshot,
            CryptoAsset,
            AssetNetwork,
            TransactionEdit,
            ForceEditRequest,
            SetRoleRequest,
            SnapshotReport,
            RunReport,
            AccrualReport,
            AccrualFailure,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, two-step login and password reset"),
        (name = "Wallet", description = "Balances, deposits, withdrawals and investments (auth required)"),
        (name = "Admin", description = "Reconciliation, overrides and distribution (admin only)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Minebank API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Minebank API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        assert!(paths.paths.contains_key("/api/v1/health"));
        assert!(paths.paths.contains_key("/api/v1/auth/login/verify"));
        assert!(paths.paths.contains_key("/api/v1/wallet/withdraw/complete"));
        assert!(paths.paths.contains_key("/api/v1/admin/transactions/{id}"));
        assert!(paths.paths.contains_key("/api/v1/admin/distribution/run"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let components = ApiDoc::openapi()
            .components
            .expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_jwt"));
    }
}
