//! Ledger entities
//!
//! Users, investments, transactions, portfolio snapshots, OTP rows and the
//! crypto asset reference data. Enums are stored as upper-case TEXT columns;
//! `as_str()` / `FromStr` are the single mapping in both directions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::plan::Plan;

pub type UserId = i64;
pub type InvestmentId = i64;
pub type TransactionId = i64;

// ============================================================================
// User
// ============================================================================

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Platform user with wallet balance
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_verified: bool,
    /// Liquid wallet funds in USD
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

// ============================================================================
// Investment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvestmentStatus {
    Active,
    Closed,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Active => "ACTIVE",
            InvestmentStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvestmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(InvestmentStatus::Active),
            "CLOSED" => Ok(InvestmentStatus::Closed),
            _ => Err(format!("Invalid investment status: {}", s)),
        }
    }
}

/// A position in one mining plan
///
/// `daily_roi` is copied from the plan table when the position is opened and
/// never re-derived, so later rate changes do not touch existing positions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Investment {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub plan: Plan,
    #[schema(value_type = String)]
    pub daily_roi: Decimal,
    /// Principal
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Accrued, not yet withdrawn profit
    #[schema(value_type = String)]
    pub profit: Decimal,
    pub status: InvestmentStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Investment {
    /// Funds a withdrawal sourced from this position may draw on
    pub fn withdrawable(&self) -> Decimal {
        self.amount + self.profit
    }

    pub fn is_active(&self) -> bool {
        self.status == InvestmentStatus::Active
    }

    /// Profit one distribution run adds to this position
    pub fn daily_profit(&self) -> Decimal {
        self.amount * self.daily_roi
    }
}

/// Input for an atomic plan purchase
#[derive(Debug, Clone)]
pub struct InvestmentPurchase {
    pub user_id: UserId,
    pub plan: Plan,
    pub amount: Decimal,
    /// Reference of the audit transaction
    pub reference: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub investment: Investment,
    pub transaction: Transaction,
    /// True when the purchase topped up an existing ACTIVE position
    pub merged: bool,
}

// ============================================================================
// Transaction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    Deposit,
    Withdrawal,
    Investment,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "DEPOSIT",
            TxType::Withdrawal => "WITHDRAWAL",
            TxType::Investment => "INVESTMENT",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TxType::Deposit),
            "WITHDRAWAL" => Ok(TxType::Withdrawal),
            "INVESTMENT" => Ok(TxType::Investment),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Transaction status
///
/// ```text
/// PENDING ──▶ COMPLETED   (funds move)
///    └──────▶ FAILED      (no funds move)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Completed => "COMPLETED",
            TxStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(TxStatus::Pending),
            "COMPLETED" => Ok(TxStatus::Completed),
            "FAILED" => Ok(TxStatus::Failed),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

/// Where a withdrawal draws its funds from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FundingSource {
    Wallet,
    Investment(InvestmentId),
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundingSource::Wallet => write!(f, "WALLET"),
            FundingSource::Investment(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for FundingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("WALLET") {
            return Ok(FundingSource::Wallet);
        }
        s.parse::<InvestmentId>()
            .map(FundingSource::Investment)
            .map_err(|_| format!("Invalid funding source: {}", s))
    }
}

impl TryFrom<String> for FundingSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FundingSource> for String {
    fn from(val: FundingSource) -> String {
        val.to_string()
    }
}

/// Ledger row for deposits, withdrawals and plan purchases
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub tx_type: TxType,
    /// USD-normalized amount
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Original asset-denominated amount (deposits)
    #[schema(value_type = Option<String>)]
    pub asset_amount: Option<Decimal>,
    pub currency: String,
    pub network: Option<String>,
    pub address: Option<String>,
    pub status: TxStatus,
    #[schema(value_type = Option<String>, example = "WALLET")]
    pub source: Option<FundingSource>,
    pub reference: String,
    /// Set when the USD value could not be priced and needs an admin fix
    pub needs_reconciliation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub tx_type: TxType,
    pub amount: Decimal,
    pub asset_amount: Option<Decimal>,
    pub currency: String,
    pub network: Option<String>,
    pub address: Option<String>,
    pub status: TxStatus,
    pub source: Option<FundingSource>,
    pub reference: String,
    pub needs_reconciliation: bool,
}

/// Manual override of transaction fields (admin force-edit)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TransactionEdit {
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub status: Option<TxStatus>,
    pub reference: Option<String>,
}

impl TransactionEdit {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.status.is_none() && self.reference.is_none()
    }

    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
            tx.needs_reconciliation = false;
        }
        if let Some(status) = self.status {
            tx.status = status;
        }
        if let Some(reference) = &self.reference {
            tx.reference = reference.clone();
        }
    }
}

// ============================================================================
// Portfolio history
// ============================================================================

/// One row per user per day
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PortfolioSnapshot {
    pub user_id: UserId,
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub total_value: Decimal,
    #[schema(value_type = String)]
    pub liquid_balance: Decimal,
    #[schema(value_type = String)]
    pub total_invested: Decimal,
    #[schema(value_type = String)]
    pub total_profit: Decimal,
}

/// Marker for a completed combined distribution run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DistributionRun {
    pub run_date: NaiveDate,
    #[schema(value_type = String)]
    pub total_distributed: Decimal,
    pub investments_updated: i64,
    pub users_affected: i64,
}

// ============================================================================
// OTP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpKind {
    Signup,
    Login,
    Withdrawal,
    PasswordReset,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::Signup => "SIGNUP",
            OtpKind::Login => "LOGIN",
            OtpKind::Withdrawal => "WITHDRAWAL",
            OtpKind::PasswordReset => "PASSWORD_RESET",
        }
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OtpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIGNUP" => Ok(OtpKind::Signup),
            "LOGIN" => Ok(OtpKind::Login),
            "WITHDRAWAL" => Ok(OtpKind::Withdrawal),
            "PASSWORD_RESET" => Ok(OtpKind::PasswordReset),
            _ => Err(format!("Invalid otp kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub kind: OtpKind,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOtp {
    pub email: String,
    pub code: String,
    pub kind: OtpKind,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Reference data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetNetwork {
    #[schema(example = "TRC20")]
    pub name: String,
    pub deposit_address: String,
}

/// Depositable crypto asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CryptoAsset {
    #[schema(example = "USDT")]
    pub symbol: String,
    pub name: String,
    pub icon: Option<String>,
    pub is_active: bool,
    pub networks: Vec<AssetNetwork>,
}

impl CryptoAsset {
    pub fn network(&self, name: &str) -> Option<&AssetNetwork> {
        self.networks
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funding_source_parse() {
        assert_eq!("WALLET".parse::<FundingSource>(), Ok(FundingSource::Wallet));
        assert_eq!("wallet".parse::<FundingSource>(), Ok(FundingSource::Wallet));
        assert_eq!(
            "42".parse::<FundingSource>(),
            Ok(FundingSource::Investment(42))
        );
        assert!("savings".parse::<FundingSource>().is_err());
        assert_eq!(FundingSource::Investment(7).to_string(), "7");
    }

    #[test]
    fn test_funding_source_serde() {
        let json = serde_json::to_string(&FundingSource::Wallet).unwrap();
        assert_eq!(json, "\"WALLET\"");
        let parsed: FundingSource = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(parsed, FundingSource::Investment(12));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Completed.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transaction_edit_clears_reconciliation_flag() {
        let now = Utc::now();
        let mut tx = Transaction {
            id: 1,
            user_id: 1,
            tx_type: TxType::Deposit,
            amount: Decimal::ZERO,
            asset_amount: Some(Decimal::new(1, 2)),
            currency: "XYZ".to_string(),
            network: None,
            address: None,
            status: TxStatus::Pending,
            source: None,
            reference: "REF-AAAA-BBBB".to_string(),
            needs_reconciliation: true,
            created_at: now,
            updated_at: now,
        };
        let edit = TransactionEdit {
            amount: Some(Decimal::new(650, 0)),
            ..Default::default()
        };
        edit.apply(&mut tx);
        assert_eq!(tx.amount, Decimal::new(650, 0));
        assert!(!tx.needs_reconciliation);
        assert_eq!(tx.status, TxStatus::Pending);
    }

    #[test]
    fn test_otp_kind_roundtrip_names() {
        for kind in [
            OtpKind::Signup,
            OtpKind::Login,
            OtpKind::Withdrawal,
            OtpKind::PasswordReset,
        ] {
            assert_eq!(kind.as_str().parse::<OtpKind>(), Ok(kind));
        }
    }
}
