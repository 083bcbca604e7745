//! Ledger store seam
//!
//! Every method that touches more than one row is atomic: the PostgreSQL
//! implementation wraps it in one database transaction with row locks, the
//! memory implementation holds its single state lock for the whole call.
//! Balance guards are re-checked inside the atomic section, so a stale read
//! in the caller can never drive a balance or investment below zero.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::models::{
    CryptoAsset, DistributionRun, FundingSource, Investment, InvestmentId, InvestmentPurchase,
    InvestmentStatus, NewOtp, NewTransaction, NewUser, OtpKind, OtpRecord, PortfolioSnapshot,
    PurchaseOutcome, Role, Transaction, TransactionEdit, TransactionId, TxStatus, User, UserId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Transaction is already {0}")]
    StatusConflict(TxStatus),

    #[error("Insufficient funds: available {available}")]
    InsufficientFunds { available: Decimal },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Balance mutation committed together with a transaction status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    /// Status change only
    None,
    CreditWallet {
        user_id: UserId,
        amount: Decimal,
    },
    /// Guarded: fails if the balance is below `amount`
    DebitWallet {
        user_id: UserId,
        amount: Decimal,
    },
    /// Guarded: fails if `amount + profit` is below `amount`; split with
    /// [`split_profit_first`] against the locked row
    DebitInvestment {
        investment_id: InvestmentId,
        amount: Decimal,
    },
}

/// Portion of an investment withdrawal taken from profit and from principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub from_profit: Decimal,
    pub from_principal: Decimal,
}

/// Profit-first deduction: principal is only touched once accrued profit is
/// exhausted
pub fn split_profit_first(amount: Decimal, profit: Decimal) -> Deduction {
    let from_profit = amount.min(profit).max(Decimal::ZERO);
    Deduction {
        from_profit,
        from_principal: amount - from_profit,
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // === Users ===
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn mark_verified(&self, id: UserId) -> StoreResult<()>;
    async fn set_role(&self, id: UserId, role: Role) -> StoreResult<()>;
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> StoreResult<()>;

    // === Transactions ===
    async fn insert_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction>;
    async fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;
    async fn transactions_for_user(&self, user_id: UserId, limit: i64)
    -> StoreResult<Vec<Transaction>>;
    async fn transactions_by_status(
        &self,
        status: TxStatus,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>>;
    /// Sum of PENDING WITHDRAWAL amounts of `user_id` drawing on `source`
    async fn pending_withdrawal_total(
        &self,
        user_id: UserId,
        source: FundingSource,
    ) -> StoreResult<Decimal>;
    /// Atomically move a PENDING transaction to `target` and apply `effect`.
    ///
    /// Errors: `NotFound`, `StatusConflict(current)` when not PENDING,
    /// `InsufficientFunds` when the effect's guard fails (nothing is written).
    async fn settle_transaction(
        &self,
        id: TransactionId,
        target: TxStatus,
        effect: LedgerEffect,
    ) -> StoreResult<Transaction>;
    /// Unchecked field override; returns (before, after)
    async fn force_edit_transaction(
        &self,
        id: TransactionId,
        edit: &TransactionEdit,
    ) -> StoreResult<(Transaction, Transaction)>;
    async fn delete_transaction(&self, id: TransactionId) -> StoreResult<bool>;

    // === Investments ===
    async fn investment(&self, id: InvestmentId) -> StoreResult<Option<Investment>>;
    async fn investments_for_user(&self, user_id: UserId) -> StoreResult<Vec<Investment>>;
    async fn active_investments(&self) -> StoreResult<Vec<Investment>>;
    /// Atomically debit the wallet, merge into the ACTIVE position of the same
    /// plan (or open one) and record a COMPLETED INVESTMENT transaction.
    async fn purchase_investment(&self, purchase: InvestmentPurchase)
    -> StoreResult<PurchaseOutcome>;
    /// Add `amount` to the profit of an ACTIVE investment; false if it is no
    /// longer active or gone
    async fn accrue_profit(&self, id: InvestmentId, amount: Decimal) -> StoreResult<bool>;
    async fn set_investment_status(
        &self,
        id: InvestmentId,
        status: InvestmentStatus,
    ) -> StoreResult<bool>;
    async fn delete_investment(&self, id: InvestmentId) -> StoreResult<bool>;

    // === Portfolio history ===
    async fn upsert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> StoreResult<()>;
    async fn portfolio_history(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<PortfolioSnapshot>>;

    // === Distribution runs ===
    async fn distribution_run(&self, date: NaiveDate) -> StoreResult<Option<DistributionRun>>;
    /// Insert the marker for `date`; false if another run already claimed it
    async fn claim_distribution_run(&self, date: NaiveDate) -> StoreResult<bool>;
    /// Drop a claim whose run failed before accruing anything
    async fn release_distribution_run(&self, date: NaiveDate) -> StoreResult<()>;
    async fn record_distribution_totals(&self, run: &DistributionRun) -> StoreResult<()>;

    // === OTP ===
    async fn insert_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord>;
    async fn latest_otp(&self, email: &str, kind: OtpKind) -> StoreResult<Option<OtpRecord>>;
    /// Mark as used; false if it was already used
    async fn consume_otp(&self, id: i64) -> StoreResult<bool>;

    // === Reference data ===
    async fn list_assets(&self) -> StoreResult<Vec<CryptoAsset>>;
    async fn asset(&self, symbol: &str) -> StoreResult<Option<CryptoAsset>>;
    async fn upsert_asset(&self, asset: &CryptoAsset) -> StoreResult<()>;
}
