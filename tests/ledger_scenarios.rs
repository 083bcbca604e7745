//! End-to-end funds scenarios against the in-memory ledger

mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use common::{Harness, deposit, usd};
use minebank::FundsError;
use minebank::distribution::DistributionError;
use minebank::ledger::plan::lock_until;
use minebank::ledger::{
    FundingSource, LedgerStore, NewTransaction, Plan, TxStatus, TxType, User,
};

fn pending_withdrawal(user_id: i64, amount: Decimal, reference: &str) -> NewTransaction {
    NewTransaction {
        user_id,
        tx_type: TxType::Withdrawal,
        amount,
        asset_amount: None,
        currency: "USDT".to_string(),
        network: Some("TRC20".to_string()),
        address: Some("TXYZabcdefghijklmnop".to_string()),
        status: TxStatus::Pending,
        source: Some(FundingSource::Wallet),
        reference: reference.to_string(),
        needs_reconciliation: false,
    }
}

// ============================================================================
// Withdrawals
// ============================================================================

#[tokio::test]
async fn test_second_withdrawal_sees_pending_first() {
    let h = Harness::new();
    let user = h.funded_user("alice@example.com", 100).await;

    let first = h
        .withdraw(&user, FundingSource::Wallet, usd(7000))
        .await
        .unwrap();
    assert_eq!(first.status, TxStatus::Pending);

    let err = h
        .withdraw(&user, FundingSource::Wallet, usd(7000))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FundsError::InsufficientFunds {
            available: usd(3000),
            pending: usd(7000),
            requested: usd(7000),
        }
    );

    // the request alone moves no money
    assert_eq!(h.balance_of(&user).await, usd(10000));
}

#[tokio::test]
async fn test_confirm_never_drives_wallet_negative() {
    let h = Harness::new();
    let user = h.funded_user("bob@example.com", 100).await;

    // two pending rows that together overdraw the wallet
    let a = h
        .store
        .insert_transaction(pending_withdrawal(user.id, usd(7000), "REF-A"))
        .await
        .unwrap();
    let b = h
        .store
        .insert_transaction(pending_withdrawal(user.id, usd(7000), "REF-B"))
        .await
        .unwrap();

    h.funds.confirm_withdrawal(a.id).await.unwrap();
    let err = h.funds.confirm_withdrawal(b.id).await.unwrap_err();
    assert!(matches!(err, FundsError::InsufficientFunds { .. }));

    assert_eq!(h.balance_of(&user).await, usd(3000));
    let b = h.store.transaction(b.id).await.unwrap().unwrap();
    assert_eq!(b.status, TxStatus::Pending);
}

/// Starter position of 1000 with 50 accrued profit
async fn position_with_profit(h: &Harness, email: &str) -> (User, i64) {
    let user = h.funded_user(email, 1000).await;
    let outcome = h
        .funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();
    let id = outcome.investment.id;
    assert!(h.store.accrue_profit(id, Decimal::from(50)).await.unwrap());
    (user, id)
}

#[tokio::test]
async fn test_investment_withdrawal_within_profit() {
    let h = Harness::new();
    let (user, id) = position_with_profit(&h, "carol@example.com").await;

    let tx = h
        .withdraw(&user, FundingSource::Investment(id), Decimal::from(30))
        .await
        .unwrap();
    h.funds.confirm_withdrawal(tx.id).await.unwrap();
    let inv = h.store.investment(id).await.unwrap().unwrap();
    assert_eq!(inv.amount, Decimal::from(1000));
    assert_eq!(inv.profit, Decimal::from(20));

    // withdrawals from a position never touch the wallet
    assert_eq!(h.balance_of(&user).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_investment_withdrawal_takes_profit_first() {
    let h = Harness::new();
    let (user, id) = position_with_profit(&h, "cora@example.com").await;

    let tx = h
        .withdraw(&user, FundingSource::Investment(id), Decimal::from(70))
        .await
        .unwrap();
    h.funds.confirm_withdrawal(tx.id).await.unwrap();
    let inv = h.store.investment(id).await.unwrap().unwrap();
    assert_eq!(inv.amount, Decimal::from(980));
    assert_eq!(inv.profit, Decimal::ZERO);
    assert_eq!(h.balance_of(&user).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_cannot_withdraw_from_someone_elses_investment() {
    let h = Harness::new();
    let owner = h.funded_user("owner@example.com", 500).await;
    let other = h.funded_user("other@example.com", 10).await;
    let outcome = h
        .funds
        .create_investment(owner.id, Plan::Growth, Decimal::from(500))
        .await
        .unwrap();

    let err = h
        .withdraw(
            &other,
            FundingSource::Investment(outcome.investment.id),
            Decimal::from(5),
        )
        .await
        .unwrap_err();
    assert_eq!(err, FundsError::Unauthorized);
}

#[tokio::test]
async fn test_wrong_withdrawal_code_is_rejected() {
    let h = Harness::new();
    let user = h.funded_user("dave@example.com", 100).await;
    let req = common::withdrawal(FundingSource::Wallet, Decimal::from(10));

    h.funds.request_withdrawal(user.id, &req).await.unwrap();
    let err = h
        .funds
        .complete_withdrawal(user.id, &req, "000000x")
        .await
        .unwrap_err();
    assert_eq!(err, FundsError::InvalidOtp);

    let history = h.funds.transaction_history(user.id, None).await.unwrap();
    assert!(history.iter().all(|t| t.tx_type != TxType::Withdrawal));
}

// ============================================================================
// State machine
// ============================================================================

#[tokio::test]
async fn test_terminal_states_are_final() {
    let h = Harness::new();
    let user = h.user("erin@example.com", minebank::ledger::Role::User).await;

    let done = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(40)))
        .await
        .unwrap();
    h.funds.confirm_deposit(done.id).await.unwrap();

    assert_eq!(
        h.funds.confirm_deposit(done.id).await.unwrap_err(),
        FundsError::AlreadyFinalized(TxStatus::Completed)
    );
    assert_eq!(
        h.funds.fail_transaction(done.id).await.unwrap_err(),
        FundsError::AlreadyFinalized(TxStatus::Completed)
    );

    let failed = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(15)))
        .await
        .unwrap();
    h.funds.fail_transaction(failed.id).await.unwrap();
    // failing twice is a no-op
    let again = h.funds.fail_transaction(failed.id).await.unwrap();
    assert_eq!(again.status, TxStatus::Failed);
    assert_eq!(
        h.funds.confirm_deposit(failed.id).await.unwrap_err(),
        FundsError::AlreadyFinalized(TxStatus::Failed)
    );

    // only the first deposit was credited, once
    assert_eq!(h.balance_of(&user).await, Decimal::from(40));
}

#[tokio::test]
async fn test_confirm_checks_transaction_type() {
    let h = Harness::new();
    let user = h.funded_user("frank@example.com", 50).await;
    let tx = h
        .withdraw(&user, FundingSource::Wallet, Decimal::from(20))
        .await
        .unwrap();

    assert_eq!(
        h.funds.confirm_deposit(tx.id).await.unwrap_err(),
        FundsError::WrongType {
            expected: TxType::Deposit,
            actual: TxType::Withdrawal,
        }
    );
}

// ============================================================================
// Deposits
// ============================================================================

#[tokio::test]
async fn test_priced_deposit_uses_oracle() {
    let h = Harness::new();
    let user = h.user("gina@example.com", minebank::ledger::Role::User).await;

    let tx = h
        .funds
        .request_deposit(user.id, deposit("btc", Decimal::new(5, 2)))
        .await
        .unwrap();
    assert_eq!(tx.currency, "BTC");
    assert_eq!(tx.amount, Decimal::from(3000));
    assert_eq!(tx.asset_amount, Some(Decimal::new(5, 2)));
    assert!(!tx.needs_reconciliation);
    assert!(tx.reference.starts_with("REF-"));
}

#[tokio::test]
async fn test_unpriced_deposit_is_flagged_not_credited() {
    let h = Harness::new();
    let user = h.user("hank@example.com", minebank::ledger::Role::User).await;

    let tx = h
        .funds
        .request_deposit(user.id, deposit("XYZ", Decimal::new(1, 2)))
        .await
        .unwrap();
    assert_eq!(tx.status, TxStatus::Pending);
    assert_eq!(tx.amount, Decimal::ZERO);
    assert!(tx.needs_reconciliation);

    assert_eq!(
        h.funds.confirm_deposit(tx.id).await.unwrap_err(),
        FundsError::NeedsReconciliation(tx.id)
    );
    assert_eq!(h.balance_of(&user).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_non_positive_amounts_are_rejected() {
    let h = Harness::new();
    let user = h.funded_user("ivy@example.com", 10).await;

    assert_eq!(
        h.funds
            .request_deposit(user.id, deposit("USDT", Decimal::ZERO))
            .await
            .unwrap_err(),
        FundsError::InvalidAmount
    );
    assert_eq!(
        h.funds
            .create_investment(user.id, Plan::Starter, Decimal::new(-1, 0))
            .await
            .unwrap_err(),
        FundsError::InvalidAmount
    );
}

// ============================================================================
// Investments
// ============================================================================

#[tokio::test]
async fn test_repeat_purchase_merges_and_restarts_lock() {
    let h = Harness::new();
    let user = h.funded_user("jack@example.com", 1000).await;
    let t0 = Utc::now();
    let t1 = t0 + Duration::days(10);

    let first = h
        .funds
        .create_investment_at(user.id, Plan::Growth, Decimal::from(500), t0)
        .await
        .unwrap();
    assert!(!first.merged);

    let second = h
        .funds
        .create_investment_at(user.id, Plan::Growth, Decimal::from(300), t1)
        .await
        .unwrap();
    assert!(second.merged);
    assert_eq!(second.investment.id, first.investment.id);
    assert_eq!(second.investment.amount, Decimal::from(800));
    assert_eq!(second.investment.start_date, first.investment.start_date);
    assert_eq!(second.investment.end_date, lock_until(t1));

    let positions = h.store.investments_for_user(user.id).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(h.balance_of(&user).await, Decimal::from(200));

    // every purchase leaves a COMPLETED audit row
    let history = h.funds.transaction_history(user.id, None).await.unwrap();
    let purchases: Vec<_> = history
        .iter()
        .filter(|t| t.tx_type == TxType::Investment)
        .collect();
    assert_eq!(purchases.len(), 2);
    assert!(purchases.iter().all(|t| t.status == TxStatus::Completed));
}

#[tokio::test]
async fn test_purchase_over_balance_changes_nothing() {
    let h = Harness::new();
    let user = h.funded_user("kate@example.com", 100).await;

    let err = h
        .funds
        .create_investment(user.id, Plan::Wealth, Decimal::from(101))
        .await
        .unwrap_err();
    assert!(matches!(err, FundsError::InsufficientFunds { .. }));
    assert_eq!(h.balance_of(&user).await, Decimal::from(100));
    assert!(h.store.investments_for_user(user.id).await.unwrap().is_empty());
}

// ============================================================================
// Distribution
// ============================================================================

#[tokio::test]
async fn test_accrual_per_plan_rate() {
    let h = Harness::new();
    let user = h.funded_user("leo@example.com", 3500).await;
    for (plan, amount) in [
        (Plan::Starter, 1000),
        (Plan::Growth, 2000),
        (Plan::Wealth, 500),
    ] {
        h.funds
            .create_investment(user.id, plan, Decimal::from(amount))
            .await
            .unwrap();
    }

    let report = h.distribution.run().await.unwrap();
    assert_eq!(report.accrual.total_distributed, usd(4150));
    assert_eq!(report.accrual.investments_updated, 3);
    assert_eq!(report.accrual.users_affected, 1);

    let mut profits: Vec<Decimal> = h
        .store
        .investments_for_user(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.profit)
        .collect();
    profits.sort();
    assert_eq!(profits, vec![usd(500), usd(1250), usd(2400)]);
}

#[tokio::test]
async fn test_distribution_runs_once_per_day() {
    let h = Harness::new();
    let user = h.funded_user("mia@example.com", 1000).await;
    let outcome = h
        .funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();
    let id = outcome.investment.id;

    let report = h.distribution.run().await.unwrap();
    assert_eq!(report.date, h.today());
    for _ in 0..2 {
        let err = h.distribution.run().await.unwrap_err();
        assert!(matches!(err, DistributionError::AlreadyDistributed(d) if d == h.today()));
    }
    let inv = h.store.investment(id).await.unwrap().unwrap();
    assert_eq!(inv.profit, Decimal::from(5));

    // the next day accrues again
    let tomorrow = h.next_day();
    assert_eq!(h.distribution.run().await.unwrap().date, tomorrow);
    let inv = h.store.investment(id).await.unwrap().unwrap();
    assert_eq!(inv.profit, Decimal::from(10));
}

#[tokio::test]
async fn test_snapshot_rerun_overwrites_same_day() {
    let h = Harness::new();
    let user = h.funded_user("noah@example.com", 300).await;

    h.distribution.snapshot().await.unwrap();
    h.funds
        .create_investment(user.id, Plan::Starter, Decimal::from(200))
        .await
        .unwrap();
    let report = h.distribution.snapshot().await.unwrap();
    assert_eq!(report.snapshots_written, 1);

    let history = h.funds.portfolio_history(user.id, None).await.unwrap();
    assert_eq!(history.len(), 1);
    let snap = &history[0];
    assert_eq!(snap.date, h.today());
    assert_eq!(snap.liquid_balance, Decimal::from(100));
    assert_eq!(snap.total_invested, Decimal::from(200));
    assert_eq!(snap.total_value, Decimal::from(300));
}

#[tokio::test]
async fn test_snapshot_is_taken_before_accrual() {
    let h = Harness::new();
    let user = h.funded_user("olga@example.com", 1000).await;
    h.funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();

    h.distribution.run().await.unwrap();
    let history = h.funds.portfolio_history(user.id, None).await.unwrap();
    assert_eq!(history[0].total_profit, Decimal::ZERO);

    let overview = h.funds.wallet_overview(user.id).await.unwrap();
    assert_eq!(overview.total_profit, Decimal::from(5));
    assert_eq!(overview.total_value, Decimal::from(1005));
}

#[tokio::test]
async fn test_snapshot_after_run_keeps_pre_accrual_row() {
    let h = Harness::new();
    let user = h.funded_user("pia@example.com", 1000).await;
    h.funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();

    h.distribution.run().await.unwrap();
    let err = h.distribution.snapshot().await.unwrap_err();
    assert!(matches!(err, DistributionError::AlreadyDistributed(d) if d == h.today()));

    let history = h.funds.portfolio_history(user.id, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_profit, Decimal::ZERO);
    assert_eq!(history[0].total_value, Decimal::from(1000));
}
