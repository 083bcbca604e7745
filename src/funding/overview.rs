//! Dashboard read models

use rust_decimal::Decimal;

use super::engine::FundsEngine;
use super::error::FundsError;
use super::types::{InvestmentView, WalletOverview};
use crate::ledger::{FundingSource, PortfolioSnapshot, Transaction, UserId};

pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
pub const MAX_HISTORY_LIMIT: i64 = 500;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

impl FundsEngine {
    pub async fn wallet_overview(&self, user_id: UserId) -> Result<WalletOverview, FundsError> {
        let user = self.load_user(user_id).await?;
        let wallet = self.source_funds(&user, FundingSource::Wallet).await?;

        let mut investments = Vec::new();
        let mut total_invested = Decimal::ZERO;
        let mut total_profit = Decimal::ZERO;

        for investment in self.store.investments_for_user(user_id).await? {
            if !investment.is_active() {
                continue;
            }
            let funds = self
                .source_funds(&user, FundingSource::Investment(investment.id))
                .await?;
            total_invested += investment.amount;
            total_profit += investment.profit;
            investments.push(InvestmentView { investment, funds });
        }

        Ok(WalletOverview {
            total_value: wallet.total + total_invested + total_profit,
            wallet,
            investments,
            total_invested,
            total_profit,
        })
    }

    /// Newest first
    pub async fn transaction_history(
        &self,
        user_id: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Transaction>, FundsError> {
        self.load_user(user_id).await?;
        Ok(self
            .store
            .transactions_for_user(user_id, clamp_limit(limit))
            .await?)
    }

    /// Oldest first, for charting
    pub async fn portfolio_history(
        &self,
        user_id: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<PortfolioSnapshot>, FundsError> {
        let mut history = self
            .store
            .portfolio_history(user_id, clamp_limit(limit))
            .await?;
        history.reverse();
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_HISTORY_LIMIT);
    }
}
