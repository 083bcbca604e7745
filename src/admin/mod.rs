//! Admin reconciliation
//!
//! Approve and reject go through the same funds-engine primitives users hit,
//! so every ledger invariant still holds. `force_edit_transaction` is the one
//! unchecked override; it needs a written justification and leaves an audit
//! record with the old and new values. Every operation checks the caller's
//! capability first.

pub mod error;
pub mod handlers;

use std::sync::Arc;

pub use error::AdminError;

use crate::distribution::{DistributionJob, RunReport, SnapshotReport};
use crate::funding::FundsEngine;
use crate::funding::overview::clamp_limit;
use crate::ledger::{
    CryptoAsset, FundingSource, InvestmentId, InvestmentStatus, LedgerStore, Role, Transaction,
    TransactionEdit, TransactionId, TxStatus, TxType, User, UserId,
};
use crate::logging::AUDIT_TARGET;
use crate::user_auth::principal::{Capability, Principal};

pub struct AdminService {
    funds: Arc<FundsEngine>,
    store: Arc<dyn LedgerStore>,
    distribution: Arc<DistributionJob>,
}

impl AdminService {
    pub fn new(
        funds: Arc<FundsEngine>,
        store: Arc<dyn LedgerStore>,
        distribution: Arc<DistributionJob>,
    ) -> Self {
        Self {
            funds,
            store,
            distribution,
        }
    }

    // === Transactions ===

    pub async fn pending_transactions(
        &self,
        principal: &Principal,
        limit: Option<i64>,
    ) -> Result<Vec<Transaction>, AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        Ok(self
            .store
            .transactions_by_status(TxStatus::Pending, clamp_limit(limit))
            .await?)
    }

    /// Confirm a PENDING deposit or withdrawal
    pub async fn approve_transaction(
        &self,
        principal: &Principal,
        id: TransactionId,
    ) -> Result<Transaction, AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        let tx = self
            .store
            .transaction(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Transaction {}", id)))?;

        let settled = match tx.tx_type {
            TxType::Deposit => self.funds.confirm_deposit(id).await?,
            TxType::Withdrawal => self.funds.confirm_withdrawal(id).await?,
            TxType::Investment => {
                return Err(crate::funding::FundsError::WrongType {
                    expected: TxType::Deposit,
                    actual: TxType::Investment,
                }
                .into());
            }
        };

        tracing::info!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            tx_id = id,
            tx_type = %settled.tx_type,
            amount = %settled.amount,
            "Transaction approved"
        );
        Ok(settled)
    }

    pub async fn reject_transaction(
        &self,
        principal: &Principal,
        id: TransactionId,
    ) -> Result<Transaction, AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        let failed = self.funds.fail_transaction(id).await?;
        tracing::info!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            tx_id = id,
            "Transaction rejected"
        );
        Ok(failed)
    }

    /// Override amount, status or reference without any ledger checks
    ///
    /// Balances are not touched. Setting the amount clears the
    /// reconciliation flag of an unpriced deposit.
    pub async fn force_edit_transaction(
        &self,
        principal: &Principal,
        id: TransactionId,
        edit: &TransactionEdit,
        justification: &str,
    ) -> Result<Transaction, AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(AdminError::MissingJustification);
        }
        if edit.is_empty() {
            return Err(AdminError::InvalidInput("Nothing to edit".to_string()));
        }
        if edit.amount.is_some_and(|a| a.is_sign_negative()) {
            return Err(AdminError::InvalidInput(
                "Amount cannot be negative".to_string(),
            ));
        }

        let (before, after) = self.store.force_edit_transaction(id, edit).await?;

        tracing::warn!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            tx_id = id,
            justification = %justification,
            old_amount = %before.amount,
            new_amount = %after.amount,
            old_status = %before.status,
            new_status = %after.status,
            old_reference = %before.reference,
            new_reference = %after.reference,
            "Transaction force-edited"
        );
        Ok(after)
    }

    pub async fn delete_transaction(
        &self,
        principal: &Principal,
        id: TransactionId,
    ) -> Result<(), AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        let tx = self
            .store
            .transaction(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Transaction {}", id)))?;

        if !self.store.delete_transaction(id).await? {
            return Err(AdminError::NotFound(format!("Transaction {}", id)));
        }

        tracing::warn!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            tx_id = id,
            user_id = tx.user_id,
            tx_type = %tx.tx_type,
            status = %tx.status,
            amount = %tx.amount,
            "Transaction deleted"
        );
        Ok(())
    }

    // === Investments ===

    /// Remove a position; the wallet balance is not refunded
    pub async fn delete_investment(
        &self,
        principal: &Principal,
        id: InvestmentId,
    ) -> Result<(), AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        let inv = self
            .store
            .investment(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Investment {}", id)))?;

        let pending = self
            .store
            .pending_withdrawal_total(inv.user_id, FundingSource::Investment(id))
            .await?;
        if !pending.is_zero() {
            return Err(AdminError::InvalidInput(format!(
                "Investment {} has pending withdrawals; reject them first",
                id
            )));
        }

        if !self.store.delete_investment(id).await? {
            return Err(AdminError::NotFound(format!("Investment {}", id)));
        }

        tracing::warn!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            investment_id = id,
            user_id = inv.user_id,
            plan = %inv.plan,
            amount = %inv.amount,
            profit = %inv.profit,
            "Investment deleted"
        );
        Ok(())
    }

    /// Stop accrual; the wallet balance is not refunded
    pub async fn close_investment(
        &self,
        principal: &Principal,
        id: InvestmentId,
    ) -> Result<(), AdminError> {
        principal.require(Capability::ReconcileLedger)?;
        if !self
            .store
            .set_investment_status(id, InvestmentStatus::Closed)
            .await?
        {
            return Err(AdminError::NotFound(format!("Investment {}", id)));
        }
        tracing::warn!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            investment_id = id,
            "Investment closed"
        );
        Ok(())
    }

    // === Users & reference data ===

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>, AdminError> {
        principal.require(Capability::ManageUsers)?;
        Ok(self.store.list_users().await?)
    }

    pub async fn set_user_role(
        &self,
        principal: &Principal,
        user_id: UserId,
        role: Role,
    ) -> Result<(), AdminError> {
        principal.require(Capability::ManageUsers)?;
        if user_id == principal.user_id {
            return Err(AdminError::InvalidInput(
                "Admins cannot change their own role".to_string(),
            ));
        }
        self.store.set_role(user_id, role).await?;
        tracing::warn!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            user_id,
            role = %role,
            "User role changed"
        );
        Ok(())
    }

    pub async fn upsert_asset(
        &self,
        principal: &Principal,
        asset: CryptoAsset,
    ) -> Result<CryptoAsset, AdminError> {
        principal.require(Capability::ManageUsers)?;
        let symbol = asset.symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AdminError::InvalidInput(format!(
                "Invalid asset symbol: {}",
                asset.symbol
            )));
        }
        if asset
            .networks
            .iter()
            .any(|n| n.name.trim().is_empty() || n.deposit_address.trim().is_empty())
        {
            return Err(AdminError::InvalidInput(
                "Every network needs a name and a deposit address".to_string(),
            ));
        }

        let asset = CryptoAsset { symbol, ..asset };
        self.store.upsert_asset(&asset).await?;
        tracing::info!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            symbol = %asset.symbol,
            networks = asset.networks.len(),
            active = asset.is_active,
            "Asset saved"
        );
        Ok(asset)
    }

    // === Distribution ===

    /// Combined run for the job's current date
    pub async fn run_distribution(&self, principal: &Principal) -> Result<RunReport, AdminError> {
        principal.require(Capability::RunDistribution)?;
        tracing::info!(
            target: AUDIT_TARGET,
            admin_id = principal.user_id,
            date = %self.distribution.today(),
            "Distribution triggered"
        );
        Ok(self.distribution.run().await?)
    }

    pub async fn run_snapshot(&self, principal: &Principal) -> Result<SnapshotReport, AdminError> {
        principal.require(Capability::RunDistribution)?;
        Ok(self.distribution.snapshot().await?)
    }
}
