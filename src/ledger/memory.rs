//! In-process ledger store
//!
//! Used by the test-suite and by `--memory` dev mode. All state lives behind a
//! single async mutex held for the duration of each call, which gives every
//! multi-row operation the same all-or-nothing behaviour as a database
//! transaction: guards are checked before the first write.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::models::{
    CryptoAsset, DistributionRun, FundingSource, Investment, InvestmentId, InvestmentPurchase,
    InvestmentStatus, NewOtp, NewTransaction, NewUser, OtpKind, OtpRecord, PortfolioSnapshot,
    PurchaseOutcome, Role, Transaction, TransactionEdit, TransactionId, TxStatus, TxType, User,
    UserId,
};
use super::plan::lock_until;
use super::store::{LedgerEffect, LedgerStore, StoreError, StoreResult, split_profit_first};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    transactions: BTreeMap<TransactionId, Transaction>,
    investments: BTreeMap<InvestmentId, Investment>,
    portfolio: BTreeMap<(UserId, NaiveDate), PortfolioSnapshot>,
    runs: BTreeMap<NaiveDate, DistributionRun>,
    otps: Vec<OtpRecord>,
    assets: BTreeMap<String, CryptoAsset>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: UserId) -> StoreResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("User {}", id)))
    }

    fn insert_transaction(&mut self, new: NewTransaction) -> Transaction {
        let now = Utc::now();
        let tx = Transaction {
            id: self.next_id(),
            user_id: new.user_id,
            tx_type: new.tx_type,
            amount: new.amount,
            asset_amount: new.asset_amount,
            currency: new.currency,
            network: new.network,
            address: new.address,
            status: new.status,
            source: new.source,
            reference: new.reference,
            needs_reconciliation: new.needs_reconciliation,
            created_at: now,
            updated_at: now,
        };
        self.transactions.insert(tx.id, tx.clone());
        tx
    }
}

/// Ledger store backed by in-process maps
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut rows: Vec<Transaction>, limit: i64) -> Vec<Transaction> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows.truncate(limit.max(0) as usize);
    rows
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        let email = new.email.to_lowercase();
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(format!("email {}", email)));
        }
        let user = User {
            id: state.next_id(),
            email,
            password_hash: new.password_hash,
            name: new.name,
            role: new.role,
            is_verified: false,
            balance: Decimal::ZERO,
            image: None,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.state.lock().await.users.values().cloned().collect())
    }

    async fn mark_verified(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.user_mut(id)?.is_verified = true;
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.user_mut(id)?.role = role;
        Ok(())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.user_mut(id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&tx.user_id) {
            return Err(StoreError::NotFound(format!("User {}", tx.user_id)));
        }
        Ok(state.insert_transaction(tx))
    }

    async fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn transactions_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let rows = state
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }

    async fn transactions_by_status(
        &self,
        status: TxStatus,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let rows = state
            .transactions
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }

    async fn pending_withdrawal_total(
        &self,
        user_id: UserId,
        source: FundingSource,
    ) -> StoreResult<Decimal> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .filter(|t| {
                t.user_id == user_id
                    && t.tx_type == TxType::Withdrawal
                    && t.status == TxStatus::Pending
                    && t.source == Some(source)
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn settle_transaction(
        &self,
        id: TransactionId,
        target: TxStatus,
        effect: LedgerEffect,
    ) -> StoreResult<Transaction> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let current = state
            .transactions
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {}", id)))?
            .status;
        if current != TxStatus::Pending {
            return Err(StoreError::StatusConflict(current));
        }

        match effect {
            LedgerEffect::None => {}
            LedgerEffect::CreditWallet { user_id, amount } => {
                state.user_mut(user_id)?.balance += amount;
            }
            LedgerEffect::DebitWallet { user_id, amount } => {
                let user = state.user_mut(user_id)?;
                if user.balance < amount {
                    return Err(StoreError::InsufficientFunds {
                        available: user.balance,
                    });
                }
                user.balance -= amount;
            }
            LedgerEffect::DebitInvestment {
                investment_id,
                amount,
            } => {
                let inv = state
                    .investments
                    .get_mut(&investment_id)
                    .filter(|inv| inv.status == InvestmentStatus::Active)
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("Active investment {}", investment_id))
                    })?;
                if inv.withdrawable() < amount {
                    return Err(StoreError::InsufficientFunds {
                        available: inv.withdrawable(),
                    });
                }
                let split = split_profit_first(amount, inv.profit);
                inv.profit -= split.from_profit;
                inv.amount -= split.from_principal;
            }
        }

        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {}", id)))?;
        tx.status = target;
        tx.updated_at = Utc::now();
        Ok(tx.clone())
    }

    async fn force_edit_transaction(
        &self,
        id: TransactionId,
        edit: &TransactionEdit,
    ) -> StoreResult<(Transaction, Transaction)> {
        let mut state = self.state.lock().await;
        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {}", id)))?;
        let before = tx.clone();
        edit.apply(tx);
        tx.updated_at = Utc::now();
        Ok((before, tx.clone()))
    }

    async fn delete_transaction(&self, id: TransactionId) -> StoreResult<bool> {
        Ok(self.state.lock().await.transactions.remove(&id).is_some())
    }

    async fn investment(&self, id: InvestmentId) -> StoreResult<Option<Investment>> {
        Ok(self.state.lock().await.investments.get(&id).cloned())
    }

    async fn investments_for_user(&self, user_id: UserId) -> StoreResult<Vec<Investment>> {
        let state = self.state.lock().await;
        Ok(state
            .investments
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_investments(&self) -> StoreResult<Vec<Investment>> {
        let state = self.state.lock().await;
        Ok(state
            .investments
            .values()
            .filter(|i| i.is_active())
            .cloned()
            .collect())
    }

    async fn purchase_investment(
        &self,
        purchase: InvestmentPurchase,
    ) -> StoreResult<PurchaseOutcome> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let user = state.user_mut(purchase.user_id)?;
        if user.balance < purchase.amount {
            return Err(StoreError::InsufficientFunds {
                available: user.balance,
            });
        }
        user.balance -= purchase.amount;

        let existing = state
            .investments
            .values_mut()
            .find(|i| i.user_id == purchase.user_id && i.plan == purchase.plan && i.is_active());

        let (investment, merged) = match existing {
            Some(inv) => {
                inv.amount += purchase.amount;
                inv.end_date = lock_until(purchase.now);
                (inv.clone(), true)
            }
            None => {
                let inv = Investment {
                    id: state.next_id(),
                    user_id: purchase.user_id,
                    plan: purchase.plan,
                    daily_roi: purchase.plan.daily_roi(),
                    amount: purchase.amount,
                    profit: Decimal::ZERO,
                    status: InvestmentStatus::Active,
                    start_date: purchase.now,
                    end_date: lock_until(purchase.now),
                };
                state.investments.insert(inv.id, inv.clone());
                (inv, false)
            }
        };

        let transaction = state.insert_transaction(NewTransaction {
            user_id: purchase.user_id,
            tx_type: TxType::Investment,
            amount: purchase.amount,
            asset_amount: None,
            currency: "USD".to_string(),
            network: None,
            address: None,
            status: TxStatus::Completed,
            source: None,
            reference: purchase.reference,
            needs_reconciliation: false,
        });

        Ok(PurchaseOutcome {
            investment,
            transaction,
            merged,
        })
    }

    async fn accrue_profit(&self, id: InvestmentId, amount: Decimal) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.investments.get_mut(&id) {
            Some(inv) if inv.is_active() => {
                inv.profit += amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_investment_status(
        &self,
        id: InvestmentId,
        status: InvestmentStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.investments.get_mut(&id) {
            Some(inv) => {
                inv.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_investment(&self, id: InvestmentId) -> StoreResult<bool> {
        Ok(self.state.lock().await.investments.remove(&id).is_some())
    }

    async fn upsert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .portfolio
            .insert((snapshot.user_id, snapshot.date), snapshot.clone());
        Ok(())
    }

    async fn portfolio_history(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> StoreResult<Vec<PortfolioSnapshot>> {
        let state = self.state.lock().await;
        let mut rows: Vec<PortfolioSnapshot> = state
            .portfolio
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        // newest first, like the SQL query
        rows.reverse();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn distribution_run(&self, date: NaiveDate) -> StoreResult<Option<DistributionRun>> {
        Ok(self.state.lock().await.runs.get(&date).cloned())
    }

    async fn claim_distribution_run(&self, date: NaiveDate) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.runs.contains_key(&date) {
            return Ok(false);
        }
        state.runs.insert(
            date,
            DistributionRun {
                run_date: date,
                total_distributed: Decimal::ZERO,
                investments_updated: 0,
                users_affected: 0,
            },
        );
        Ok(true)
    }

    async fn release_distribution_run(&self, date: NaiveDate) -> StoreResult<()> {
        self.state.lock().await.runs.remove(&date);
        Ok(())
    }

    async fn record_distribution_totals(&self, run: &DistributionRun) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.run_date, run.clone());
        Ok(())
    }

    async fn insert_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord> {
        let mut state = self.state.lock().await;
        let record = OtpRecord {
            id: state.next_id(),
            email: otp.email.to_lowercase(),
            code: otp.code,
            kind: otp.kind,
            used: false,
            expires_at: otp.expires_at,
            created_at: Utc::now(),
        };
        state.otps.push(record.clone());
        Ok(record)
    }

    async fn latest_otp(&self, email: &str, kind: OtpKind) -> StoreResult<Option<OtpRecord>> {
        let email = email.to_lowercase();
        let state = self.state.lock().await;
        Ok(state
            .otps
            .iter()
            .filter(|o| o.email == email && o.kind == kind)
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn consume_otp(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.otps.iter_mut().find(|o| o.id == id) {
            Some(otp) if !otp.used => {
                otp.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_assets(&self) -> StoreResult<Vec<CryptoAsset>> {
        Ok(self.state.lock().await.assets.values().cloned().collect())
    }

    async fn asset(&self, symbol: &str) -> StoreResult<Option<CryptoAsset>> {
        let state = self.state.lock().await;
        Ok(state.assets.get(&symbol.to_uppercase()).cloned())
    }

    async fn upsert_asset(&self, asset: &CryptoAsset) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let mut asset = asset.clone();
        asset.symbol = asset.symbol.to_uppercase();
        state.assets.insert(asset.symbol.clone(), asset);
        Ok(())
    }
}
