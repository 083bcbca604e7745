//! Ledger: persisted entities and the atomic store seam
//!
//! - [`models`] - User, Investment, Transaction, PortfolioSnapshot, OTP, assets
//! - [`plan`] - Mining plan table
//! - [`store`] - `LedgerStore` trait and balance effects
//! - [`pg`] - PostgreSQL implementation
//! - [`memory`] - In-process implementation for tests and `--memory` mode

pub mod memory;
pub mod models;
pub mod pg;
pub mod plan;
pub mod store;

pub use memory::MemoryLedgerStore;
pub use models::{
    AssetNetwork, CryptoAsset, DistributionRun, FundingSource, Investment, InvestmentId,
    InvestmentStatus, NewTransaction, NewUser, OtpKind, PortfolioSnapshot, Role, Transaction,
    TransactionEdit, TransactionId, TxStatus, TxType, User, UserId,
};
pub use pg::PgLedgerStore;
pub use plan::{Plan, PlanInfo};
pub use store::{LedgerEffect, LedgerStore, StoreError, StoreResult};
