use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::ledger::{FundingSource, Investment, Plan};

// --- Requests ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DepositRequest {
    /// Amount in the deposited asset
    #[schema(value_type = String, example = "1000")]
    pub asset_amount: Decimal,
    #[validate(length(min = 2, max = 16))]
    #[schema(example = "USDT")]
    pub currency: String,
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "TRC20")]
    pub network: String,
    /// Defaults to the platform deposit address of the network
    #[validate(length(max = 128))]
    pub address: Option<String>,
    /// On-chain hash; becomes the reference when given
    #[validate(length(min = 8, max = 128))]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct WithdrawalRequest {
    /// USD amount
    #[schema(value_type = String, example = "70")]
    pub amount: Decimal,
    #[validate(length(min = 2, max = 16))]
    #[schema(example = "USDT")]
    pub currency: String,
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "TRC20")]
    pub network: String,
    #[validate(length(min = 8, max = 128))]
    pub address: String,
    #[schema(value_type = String, example = "WALLET")]
    pub source: FundingSource,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CompleteWithdrawalRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub withdrawal: WithdrawalRequest,
    #[validate(length(equal = 6))]
    pub otp_code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InvestRequest {
    pub plan: Plan,
    #[schema(value_type = String, example = "500")]
    pub amount: Decimal,
}

// --- Read models ---

/// Pending withdrawals drawing on one source
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SourceFunds {
    #[schema(value_type = String, example = "WALLET")]
    pub source: FundingSource,
    #[schema(value_type = String)]
    pub total: Decimal,
    #[schema(value_type = String)]
    pub pending_withdrawals: Decimal,
    /// `total - pending_withdrawals`
    #[schema(value_type = String)]
    pub available: Decimal,
}

impl SourceFunds {
    pub fn new(source: FundingSource, total: Decimal, pending_withdrawals: Decimal) -> Self {
        Self {
            source,
            total,
            pending_withdrawals,
            available: total - pending_withdrawals,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvestmentView {
    #[serde(flatten)]
    pub investment: Investment,
    pub funds: SourceFunds,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletOverview {
    pub wallet: SourceFunds,
    pub investments: Vec<InvestmentView>,
    #[schema(value_type = String)]
    pub total_invested: Decimal,
    #[schema(value_type = String)]
    pub total_profit: Decimal,
    /// Wallet balance plus principal and profit of ACTIVE positions
    #[schema(value_type = String)]
    pub total_value: Decimal,
}
