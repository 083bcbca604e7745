use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::engine::FundsEngine;
use super::error::FundsError;
use super::reference::generate_reference;
use crate::ledger::models::{InvestmentPurchase, PurchaseOutcome};
use crate::ledger::{Plan, StoreError, UserId};

impl FundsEngine {
    /// Buy into a plan from the wallet
    pub async fn create_investment(
        &self,
        user_id: UserId,
        plan: Plan,
        amount: Decimal,
    ) -> Result<PurchaseOutcome, FundsError> {
        self.create_investment_at(user_id, plan, amount, Utc::now())
            .await
    }

    /// Debit, merge-or-open and the audit row commit together. A second
    /// purchase of a plan with an ACTIVE position tops it up and restarts its
    /// lock period from `now`.
    pub async fn create_investment_at(
        &self,
        user_id: UserId,
        plan: Plan,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, FundsError> {
        if amount <= Decimal::ZERO {
            return Err(FundsError::InvalidAmount);
        }

        let user = self.load_user(user_id).await?;
        if amount > user.balance {
            return Err(FundsError::InsufficientFunds {
                available: user.balance,
                pending: Decimal::ZERO,
                requested: amount,
            });
        }

        let purchase = InvestmentPurchase {
            user_id,
            plan,
            amount,
            reference: generate_reference(),
            now,
        };

        let outcome = match self.store.purchase_investment(purchase.clone()).await {
            // two first purchases raced on the one-active-per-plan index;
            // the retry merges into the winner
            Err(StoreError::Duplicate(_)) => self.store.purchase_investment(purchase).await,
            other => other,
        }
        .map_err(|e| match e {
            StoreError::InsufficientFunds { available } => FundsError::InsufficientFunds {
                available,
                pending: Decimal::ZERO,
                requested: amount,
            },
            e => e.into(),
        })?;

        tracing::info!(
            user_id,
            plan = %plan,
            amount = %amount,
            investment_id = outcome.investment.id,
            merged = outcome.merged,
            "[INVEST] Purchase committed"
        );

        self.notify_user(
            user_id,
            "Investment created",
            &format!(
                "${} has been added to your {} plan. Principal is now ${}, locked until {}.",
                amount,
                plan.display_name(),
                outcome.investment.amount,
                outcome.investment.end_date.format("%Y-%m-%d")
            ),
        )
        .await;

        Ok(outcome)
    }
}
