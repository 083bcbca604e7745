mod common;

use rust_decimal::Decimal;

use common::{Harness, deposit};
use minebank::FundsError;
use minebank::admin::AdminError;
use minebank::distribution::DistributionError;
use minebank::ledger::{
    AssetNetwork, CryptoAsset, FundingSource, LedgerStore, Plan, Role, TransactionEdit, TxStatus,
};
use minebank::user_auth::{AuthError, Principal};

fn amount_edit(amount: i64) -> TransactionEdit {
    TransactionEdit {
        amount: Some(Decimal::from(amount)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_regular_user_cannot_reconcile() {
    let h = Harness::new();
    let user = h.funded_user("user@example.com", 10).await;
    let caller = Principal::new(user.id, Role::User);

    let err = h.admin.pending_transactions(&caller, None).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth(AuthError::Forbidden)));

    let err = h
        .admin
        .force_edit_transaction(&caller, 1, &amount_edit(1_000_000), "because")
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Auth(AuthError::Forbidden)));

    let err = h.admin.run_distribution(&caller).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth(AuthError::Forbidden)));
}

#[tokio::test]
async fn test_approve_and_reject_pending_rows() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.user("u@example.com", Role::User).await;

    let keep = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(80)))
        .await
        .unwrap();
    let refused = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(20)))
        .await
        .unwrap();

    let pending = h.admin.pending_transactions(&admin, None).await.unwrap();
    assert_eq!(pending.len(), 2);

    let approved = h.admin.approve_transaction(&admin, keep.id).await.unwrap();
    assert_eq!(approved.status, TxStatus::Completed);
    let rejected = h.admin.reject_transaction(&admin, refused.id).await.unwrap();
    assert_eq!(rejected.status, TxStatus::Failed);

    assert_eq!(h.balance_of(&user).await, Decimal::from(80));
    assert!(h.admin.pending_transactions(&admin, None).await.unwrap().is_empty());

    let err = h.admin.approve_transaction(&admin, keep.id).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Funds(FundsError::AlreadyFinalized(TxStatus::Completed))
    ));
}

#[tokio::test]
async fn test_force_edit_needs_justification() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.user("u@example.com", Role::User).await;
    let tx = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(10)))
        .await
        .unwrap();

    let err = h
        .admin
        .force_edit_transaction(&admin, tx.id, &amount_edit(12), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::MissingJustification));

    let err = h
        .admin
        .force_edit_transaction(&admin, tx.id, &TransactionEdit::default(), "typo")
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::InvalidInput(_)));

    let unchanged = h.store.transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(unchanged.amount, Decimal::from(10));
}

#[tokio::test]
async fn test_unpriced_deposit_reconciled_by_force_edit() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.user("u@example.com", Role::User).await;
    let tx = h
        .funds
        .request_deposit(user.id, deposit("XYZ", Decimal::new(1, 2)))
        .await
        .unwrap();

    let err = h.admin.approve_transaction(&admin, tx.id).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Funds(FundsError::NeedsReconciliation(_))
    ));

    let edited = h
        .admin
        .force_edit_transaction(&admin, tx.id, &amount_edit(25), "Priced from exchange close")
        .await
        .unwrap();
    assert!(!edited.needs_reconciliation);
    // editing does not credit anything by itself
    assert_eq!(h.balance_of(&user).await, Decimal::ZERO);

    h.admin.approve_transaction(&admin, tx.id).await.unwrap();
    assert_eq!(h.balance_of(&user).await, Decimal::from(25));
}

#[tokio::test]
async fn test_investment_with_pending_withdrawal_cannot_be_deleted() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.funded_user("u@example.com", 500).await;
    let outcome = h
        .funds
        .create_investment(user.id, Plan::Growth, Decimal::from(500))
        .await
        .unwrap();
    let id = outcome.investment.id;

    let pending = h
        .withdraw(&user, FundingSource::Investment(id), Decimal::from(50))
        .await
        .unwrap();

    let err = h.admin.delete_investment(&admin, id).await.unwrap_err();
    assert!(matches!(err, AdminError::InvalidInput(_)));

    h.admin.reject_transaction(&admin, pending.id).await.unwrap();
    h.admin.delete_investment(&admin, id).await.unwrap();
    assert!(h.store.investment(id).await.unwrap().is_none());
    // no refund
    assert_eq!(h.balance_of(&user).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_closed_investment_stops_accruing() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.funded_user("u@example.com", 1000).await;
    let outcome = h
        .funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();

    h.admin
        .close_investment(&admin, outcome.investment.id)
        .await
        .unwrap();

    let report = h.admin.run_distribution(&admin).await.unwrap();
    assert_eq!(report.date, h.today());
    assert_eq!(report.accrual.investments_updated, 0);

    let err = h.admin.run_distribution(&admin).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Distribution(DistributionError::AlreadyDistributed(_))
    ));
    let err = h.admin.run_snapshot(&admin).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Distribution(DistributionError::AlreadyDistributed(_))
    ));
}

#[tokio::test]
async fn test_pending_withdrawal_cannot_debit_closed_investment() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.funded_user("u@example.com", 1000).await;
    let outcome = h
        .funds
        .create_investment(user.id, Plan::Starter, Decimal::from(1000))
        .await
        .unwrap();
    let id = outcome.investment.id;

    let pending = h
        .withdraw(&user, FundingSource::Investment(id), Decimal::from(100))
        .await
        .unwrap();
    h.admin.close_investment(&admin, id).await.unwrap();

    let err = h.admin.approve_transaction(&admin, pending.id).await.unwrap_err();
    assert!(matches!(err, AdminError::Funds(FundsError::NotFound(_))));

    let inv = h.store.investment(id).await.unwrap().unwrap();
    assert_eq!(inv.amount, Decimal::from(1000));
    let tx = h.store.transaction(pending.id).await.unwrap().unwrap();
    assert_eq!(tx.status, TxStatus::Pending);

    h.admin.reject_transaction(&admin, pending.id).await.unwrap();
}

#[tokio::test]
async fn test_admin_cannot_change_own_role() {
    let h = Harness::new();
    let admin = h.admin_principal().await;
    let user = h.user("u@example.com", Role::User).await;

    let err = h
        .admin
        .set_user_role(&admin, admin.user_id, Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::InvalidInput(_)));

    h.admin
        .set_user_role(&admin, user.id, Role::Admin)
        .await
        .unwrap();
    let promoted = h.store.user(user.id).await.unwrap().unwrap();
    assert_eq!(promoted.role, Role::Admin);
}

#[tokio::test]
async fn test_asset_upsert_normalizes_symbol() {
    let h = Harness::new();
    let admin = h.admin_principal().await;

    let saved = h
        .admin
        .upsert_asset(
            &admin,
            CryptoAsset {
                symbol: "usdt".to_string(),
                name: "Tether".to_string(),
                icon: None,
                is_active: true,
                networks: vec![AssetNetwork {
                    name: "TRC20".to_string(),
                    deposit_address: "TMinebankDepositAddr".to_string(),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.symbol, "USDT");

    let stored = h.store.asset("USDT").await.unwrap().unwrap();
    assert_eq!(
        stored.network("trc20").map(|n| n.deposit_address.as_str()),
        Some("TMinebankDepositAddr")
    );

    // deposits pick the address up from the asset table
    let user = h.user("u@example.com", Role::User).await;
    let tx = h
        .funds
        .request_deposit(user.id, deposit("USDT", Decimal::from(5)))
        .await
        .unwrap();
    assert_eq!(tx.address.as_deref(), Some("TMinebankDepositAddr"));
}
