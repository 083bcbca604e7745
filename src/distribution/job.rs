//! Distribution job
//!
//! Phase 1 (`snapshot`) records every user's portfolio for the day before any
//! profit is added. Phase 2 (`accrue`) adds `amount * daily_roi` to each ACTIVE
//! investment, each as its own conditional update, so one failure does not
//! stop the batch and totals only count what committed.
//!
//! Both phases always work on the job's own business date, never a
//! caller-supplied one. A combined `run` claims the date before Phase 1 and
//! gives the claim back if Phase 1 fails. Once a date is claimed, no later
//! snapshot may overwrite its pre-accrual rows.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::gateway::types::{ErrorCode, error_codes};
use crate::ledger::{DistributionRun, InvestmentId, LedgerStore, PortfolioSnapshot, StoreError};

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Profit for {0} has already been distributed")]
    AlreadyDistributed(NaiveDate),

    #[error("Snapshot failed: {0}")]
    Snapshot(StoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for DistributionError {
    fn code(&self) -> i32 {
        match self {
            DistributionError::AlreadyDistributed(_) => error_codes::ALREADY_DISTRIBUTED,
            DistributionError::Snapshot(_) | DistributionError::Store(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    fn http_status(&self) -> u16 {
        match self {
            DistributionError::AlreadyDistributed(_) => 409,
            DistributionError::Snapshot(_) | DistributionError::Store(_) => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccrualFailure {
    pub investment_id: InvestmentId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AccrualReport {
    #[schema(value_type = String)]
    pub total_distributed: Decimal,
    pub investments_updated: i64,
    pub users_affected: i64,
    pub failures: Vec<AccrualFailure>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunReport {
    pub date: NaiveDate,
    pub snapshots_written: usize,
    pub accrual: AccrualReport,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotReport {
    pub date: NaiveDate,
    pub snapshots_written: usize,
}

/// Source of the current business date
pub type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Default)]
struct Holdings {
    invested: Decimal,
    profit: Decimal,
}

pub struct DistributionJob {
    store: Arc<dyn LedgerStore>,
    today: Today,
    /// Serializes snapshot and run inside this process
    gate: Mutex<()>,
}

impl DistributionJob {
    /// Job dated by the UTC wall clock
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_clock(store, Arc::new(|| Utc::now().date_naive()))
    }

    pub fn with_clock(store: Arc<dyn LedgerStore>, today: Today) -> Self {
        Self {
            store,
            today,
            gate: Mutex::new(()),
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Phase 1 alone for today
    ///
    /// Repeating it overwrites today's rows with current values until the
    /// day's distribution has started; after that it is rejected.
    pub async fn snapshot(&self) -> Result<SnapshotReport, DistributionError> {
        let _gate = self.gate.lock().await;
        let date = self.today();
        if self.store.distribution_run(date).await?.is_some() {
            tracing::warn!(date = %date, "[DISTRIBUTION] Snapshot refused, accrual already ran");
            return Err(DistributionError::AlreadyDistributed(date));
        }
        let snapshots_written = self.write_snapshot(date).await?;
        Ok(SnapshotReport {
            date,
            snapshots_written,
        })
    }

    /// Upsert one portfolio row per user for `today`
    async fn write_snapshot(&self, today: NaiveDate) -> Result<usize, DistributionError> {
        let users = self
            .store
            .list_users()
            .await
            .map_err(DistributionError::Snapshot)?;
        let investments = self
            .store
            .active_investments()
            .await
            .map_err(DistributionError::Snapshot)?;

        let mut holdings: BTreeMap<i64, Holdings> = BTreeMap::new();
        for inv in &investments {
            let h = holdings.entry(inv.user_id).or_default();
            h.invested += inv.amount;
            h.profit += inv.profit;
        }

        for user in &users {
            let h = holdings.remove(&user.id).unwrap_or_default();
            let snapshot = PortfolioSnapshot {
                user_id: user.id,
                date: today,
                total_value: user.balance + h.invested + h.profit,
                liquid_balance: user.balance,
                total_invested: h.invested,
                total_profit: h.profit,
            };
            self.store
                .upsert_portfolio_snapshot(&snapshot)
                .await
                .map_err(DistributionError::Snapshot)?;
        }

        tracing::info!(date = %today, users = users.len(), "[DISTRIBUTION] Snapshot written");
        Ok(users.len())
    }

    /// Phase 2: add one day of profit to every ACTIVE investment
    async fn accrue(&self) -> Result<AccrualReport, DistributionError> {
        let investments = self.store.active_investments().await?;

        let mut report = AccrualReport::default();
        let mut users = BTreeSet::new();

        for inv in &investments {
            let profit = inv.daily_profit();
            match self.store.accrue_profit(inv.id, profit).await {
                Ok(true) => {
                    report.total_distributed += profit;
                    report.investments_updated += 1;
                    users.insert(inv.user_id);
                }
                // closed since it was listed
                Ok(false) => {
                    tracing::debug!(investment_id = inv.id, "[DISTRIBUTION] Skipped, no longer active");
                }
                Err(e) => {
                    tracing::error!(
                        investment_id = inv.id,
                        error = %e,
                        "[DISTRIBUTION] Accrual failed"
                    );
                    report.failures.push(AccrualFailure {
                        investment_id: inv.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.users_affected = users.len() as i64;
        tracing::info!(
            total_distributed = %report.total_distributed,
            investments_updated = report.investments_updated,
            users_affected = report.users_affected,
            failures = report.failures.len(),
            "[DISTRIBUTION] Accrual complete"
        );
        Ok(report)
    }

    /// Snapshot then accrue for today, once per date
    pub async fn run(&self) -> Result<RunReport, DistributionError> {
        let _gate = self.gate.lock().await;
        let today = self.today();

        if !self.store.claim_distribution_run(today).await? {
            tracing::warn!(date = %today, "[DISTRIBUTION] Already ran today");
            return Err(DistributionError::AlreadyDistributed(today));
        }

        let snapshots_written = match self.write_snapshot(today).await {
            Ok(n) => n,
            Err(e) => {
                // nothing accrued yet, so the day can be retried
                if let Err(release) = self.store.release_distribution_run(today).await {
                    tracing::error!(
                        date = %today,
                        error = %release,
                        "[DISTRIBUTION] Failed to release claim"
                    );
                }
                return Err(e);
            }
        };

        let accrual = self.accrue().await?;

        self.store
            .record_distribution_totals(&DistributionRun {
                run_date: today,
                total_distributed: accrual.total_distributed,
                investments_updated: accrual.investments_updated,
                users_affected: accrual.users_affected,
            })
            .await?;

        Ok(RunReport {
            date: today,
            snapshots_written,
            accrual,
        })
    }
}
