//! Withdrawals
//!
//! Two user steps and one admin step:
//!
//! 1. `request_withdrawal`: check available funds, send a WITHDRAWAL code.
//! 2. `complete_withdrawal`: verify the code, check again, record PENDING.
//! 3. `confirm_withdrawal`: debit the source and complete, atomically.
//!
//! Available funds of a source are its total minus every PENDING withdrawal
//! already drawing on it, so the same dollar cannot be requested twice.

use rust_decimal::Decimal;

use super::engine::FundsEngine;
use super::error::FundsError;
use super::reference::generate_reference;
use super::types::{SourceFunds, WithdrawalRequest};
use crate::ledger::{
    FundingSource, LedgerEffect, NewTransaction, OtpKind, Transaction, TransactionId, TxStatus,
    TxType, User, UserId,
};
use crate::user_auth::otp::OtpChallenge;

impl FundsEngine {
    /// Total and pending withdrawals of `source` for `user`
    ///
    /// Errors: `Unauthorized` for another user's investment, `NotFound` for a
    /// missing or closed one.
    pub async fn source_funds(
        &self,
        user: &User,
        source: FundingSource,
    ) -> Result<SourceFunds, FundsError> {
        let total = match source {
            FundingSource::Wallet => user.balance,
            FundingSource::Investment(id) => {
                let investment = self
                    .store
                    .investment(id)
                    .await?
                    .ok_or_else(|| FundsError::not_found(format!("Investment {}", id)))?;
                if investment.user_id != user.id {
                    return Err(FundsError::Unauthorized);
                }
                if !investment.is_active() {
                    return Err(FundsError::not_found(format!("Active investment {}", id)));
                }
                investment.withdrawable()
            }
        };

        let pending = self.store.pending_withdrawal_total(user.id, source).await?;
        Ok(SourceFunds::new(source, total, pending))
    }

    async fn check_available(
        &self,
        user: &User,
        req: &WithdrawalRequest,
    ) -> Result<SourceFunds, FundsError> {
        if req.amount <= Decimal::ZERO {
            return Err(FundsError::InvalidAmount);
        }

        let funds = self.source_funds(user, req.source).await?;
        if req.amount > funds.available {
            tracing::info!(
                user_id = user.id,
                source = %req.source,
                available = %funds.available,
                pending = %funds.pending_withdrawals,
                requested = %req.amount,
                "[WITHDRAW] Rejected, insufficient funds"
            );
            return Err(FundsError::InsufficientFunds {
                available: funds.available,
                pending: funds.pending_withdrawals,
                requested: req.amount,
            });
        }
        Ok(funds)
    }

    /// Validate a withdrawal and send the confirmation code; nothing is recorded
    pub async fn request_withdrawal(
        &self,
        user_id: UserId,
        req: &WithdrawalRequest,
    ) -> Result<OtpChallenge, FundsError> {
        let user = self.load_user(user_id).await?;
        self.check_available(&user, req).await?;

        let context = format!(
            "Withdrawal of ${} as {} ({}) to {}.",
            req.amount, req.currency, req.network, req.address
        );
        let challenge = self
            .otp
            .issue(&user.email, OtpKind::Withdrawal, &context)
            .await?;

        tracing::info!(user_id, source = %req.source, amount = %req.amount, "[WITHDRAW] Code sent");
        Ok(challenge)
    }

    /// Verify the code and record a PENDING withdrawal
    pub async fn complete_withdrawal(
        &self,
        user_id: UserId,
        req: &WithdrawalRequest,
        otp_code: &str,
    ) -> Result<Transaction, FundsError> {
        let user = self.load_user(user_id).await?;
        self.otp
            .verify(&user.email, otp_code, OtpKind::Withdrawal)
            .await?;

        // balances may have moved since the code was sent
        self.check_available(&user, req).await?;

        let tx = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                tx_type: TxType::Withdrawal,
                amount: req.amount,
                asset_amount: None,
                currency: req.currency.trim().to_uppercase(),
                network: Some(req.network.clone()),
                address: Some(req.address.clone()),
                status: TxStatus::Pending,
                source: Some(req.source),
                reference: generate_reference(),
                needs_reconciliation: false,
            })
            .await?;

        tracing::info!(
            tx_id = tx.id,
            user_id,
            source = %req.source,
            amount = %tx.amount,
            "[WITHDRAW] Pending"
        );
        Ok(tx)
    }

    /// PENDING WITHDRAWAL → COMPLETED, debiting its source in the same commit
    ///
    /// Wallet sources need `balance >= amount`; investment sources need
    /// `amount + profit >= amount` and are debited profit first. On shortfall
    /// the transaction stays PENDING.
    pub async fn confirm_withdrawal(&self, id: TransactionId) -> Result<Transaction, FundsError> {
        let tx = self.load_pending(id, TxType::Withdrawal).await?;

        let effect = match tx.source.unwrap_or(FundingSource::Wallet) {
            FundingSource::Wallet => LedgerEffect::DebitWallet {
                user_id: tx.user_id,
                amount: tx.amount,
            },
            FundingSource::Investment(investment_id) => LedgerEffect::DebitInvestment {
                investment_id,
                amount: tx.amount,
            },
        };

        let settled = self.settle(&tx, TxStatus::Completed, effect).await?;

        self.notify_user(
            settled.user_id,
            "Withdrawal confirmed",
            &format!(
                "Your withdrawal {} of ${} to {} has been processed.",
                settled.reference,
                settled.amount,
                settled.address.as_deref().unwrap_or("your address")
            ),
        )
        .await;

        Ok(settled)
    }
}
