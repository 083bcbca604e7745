use rust_decimal::Decimal;

use super::engine::FundsEngine;
use super::error::FundsError;
use super::reference::generate_reference;
use super::types::DepositRequest;
use crate::ledger::{
    LedgerEffect, NewTransaction, Transaction, TransactionId, TxStatus, TxType, UserId,
};

impl FundsEngine {
    /// Record a user-declared deposit as PENDING
    ///
    /// The USD amount comes from the price oracle. An unpriceable asset is
    /// still recorded, with amount 0 and the reconciliation flag set.
    pub async fn request_deposit(
        &self,
        user_id: UserId,
        req: DepositRequest,
    ) -> Result<Transaction, FundsError> {
        if req.asset_amount <= Decimal::ZERO {
            return Err(FundsError::InvalidAmount);
        }
        self.load_user(user_id).await?;

        let currency = req.currency.trim().to_uppercase();
        let quote = self
            .oracle
            .resolve_usd_value(&currency, req.asset_amount)
            .await;

        let address = match req.address {
            Some(address) => Some(address),
            None => self
                .store
                .asset(&currency)
                .await?
                .and_then(|asset| asset.network(&req.network).map(|n| n.deposit_address.clone())),
        };

        let reference = req
            .tx_hash
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(generate_reference);

        let tx = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                tx_type: TxType::Deposit,
                amount: quote.usd_amount,
                asset_amount: Some(req.asset_amount),
                currency,
                network: Some(req.network),
                address,
                status: TxStatus::Pending,
                source: None,
                reference,
                needs_reconciliation: quote.needs_reconciliation,
            })
            .await?;

        tracing::info!(
            tx_id = tx.id,
            user_id,
            currency = %tx.currency,
            asset_amount = %req.asset_amount,
            usd = %tx.amount,
            needs_reconciliation = tx.needs_reconciliation,
            "[DEPOSIT] Requested"
        );
        Ok(tx)
    }

    /// PENDING DEPOSIT → COMPLETED, crediting the wallet in the same commit
    pub async fn confirm_deposit(&self, id: TransactionId) -> Result<Transaction, FundsError> {
        let tx = self.load_pending(id, TxType::Deposit).await?;
        if tx.needs_reconciliation {
            return Err(FundsError::NeedsReconciliation(id));
        }

        let settled = self
            .settle(
                &tx,
                TxStatus::Completed,
                LedgerEffect::CreditWallet {
                    user_id: tx.user_id,
                    amount: tx.amount,
                },
            )
            .await?;

        self.notify_user(
            settled.user_id,
            "Deposit confirmed",
            &format!(
                "Your deposit {} of ${} has been credited to your wallet.",
                settled.reference, settled.amount
            ),
        )
        .await;

        Ok(settled)
    }
}
