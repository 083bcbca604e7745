//! Funds engine
//!
//! Owns the transaction state machine. Every status change that moves money
//! goes through [`FundsEngine::settle`], which hands the store one atomic
//! "status + balance effect" call. Deposits and withdrawals differ only in the
//! [`LedgerEffect`] they pass.
//!
//! ```text
//! PENDING ──settle(COMPLETED, effect)──▶ COMPLETED
//!    └──────settle(FAILED, None)──────▶ FAILED
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::error::FundsError;
use crate::ledger::{
    LedgerEffect, LedgerStore, StoreError, Transaction, TransactionId, TxStatus, TxType, User,
    UserId,
};
use crate::notify::{Notifier, send_best_effort};
use crate::oracle::PriceOracle;
use crate::user_auth::otp::OtpGate;

pub struct FundsEngine {
    pub(super) store: Arc<dyn LedgerStore>,
    pub(super) oracle: Arc<PriceOracle>,
    pub(super) otp: Arc<dyn OtpGate>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl FundsEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<PriceOracle>,
        otp: Arc<dyn OtpGate>,
        notifier: Arc<dyn Notifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            oracle,
            otp,
            notifier,
            notify_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub(super) async fn load_user(&self, user_id: UserId) -> Result<User, FundsError> {
        self.store
            .user(user_id)
            .await?
            .ok_or_else(|| FundsError::not_found(format!("User {}", user_id)))
    }

    pub(super) async fn load_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Transaction, FundsError> {
        self.store
            .transaction(id)
            .await?
            .ok_or_else(|| FundsError::not_found(format!("Transaction {}", id)))
    }

    /// Load a transaction that must be PENDING and of type `expected`
    pub(super) async fn load_pending(
        &self,
        id: TransactionId,
        expected: TxType,
    ) -> Result<Transaction, FundsError> {
        let tx = self.load_transaction(id).await?;
        if tx.tx_type != expected {
            return Err(FundsError::WrongType {
                expected,
                actual: tx.tx_type,
            });
        }
        if tx.status.is_terminal() {
            return Err(FundsError::AlreadyFinalized(tx.status));
        }
        Ok(tx)
    }

    /// The one path from PENDING to a terminal state
    ///
    /// The store re-checks the status and the effect's guard under lock, so a
    /// concurrent settle of the same row sees `AlreadyFinalized` and a balance
    /// that shrank since the caller's read sees `InsufficientFunds`; in both
    /// cases nothing is written.
    pub(super) async fn settle(
        &self,
        tx: &Transaction,
        target: TxStatus,
        effect: LedgerEffect,
    ) -> Result<Transaction, FundsError> {
        match self.store.settle_transaction(tx.id, target, effect).await {
            Ok(settled) => {
                tracing::info!(
                    tx_id = settled.id,
                    user_id = settled.user_id,
                    tx_type = %settled.tx_type,
                    status = %settled.status,
                    amount = %settled.amount,
                    "[FUNDS] Transaction settled"
                );
                Ok(settled)
            }
            Err(StoreError::InsufficientFunds { available }) => {
                tracing::warn!(
                    tx_id = tx.id,
                    available = %available,
                    requested = %tx.amount,
                    "[FUNDS] Settle rejected, insufficient funds"
                );
                Err(FundsError::InsufficientFunds {
                    available,
                    pending: rust_decimal::Decimal::ZERO,
                    requested: tx.amount,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// PENDING → FAILED, no funds move
    ///
    /// Failing an already FAILED transaction succeeds without a write;
    /// COMPLETED is `AlreadyFinalized`.
    pub async fn fail_transaction(&self, id: TransactionId) -> Result<Transaction, FundsError> {
        let tx = self.load_transaction(id).await?;
        match tx.status {
            TxStatus::Failed => return Ok(tx),
            TxStatus::Completed => return Err(FundsError::AlreadyFinalized(tx.status)),
            TxStatus::Pending => {}
        }

        match self.settle(&tx, TxStatus::Failed, LedgerEffect::None).await {
            Err(FundsError::AlreadyFinalized(TxStatus::Failed)) => self.load_transaction(id).await,
            other => other,
        }
    }

    /// Email the owner of a committed change; never fails
    pub(super) async fn notify_user(&self, user_id: UserId, subject: &str, body: &str) {
        let email = match self.store.user(user_id).await {
            Ok(Some(user)) => user.email,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "[NOTIFY] Recipient lookup failed");
                return;
            }
        };
        send_best_effort(&self.notifier, self.notify_timeout, &email, subject, body).await;
    }
}
