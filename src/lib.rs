//! Minebank - Cloud-mining investment ledger
//!
//! Users fund a USD wallet with crypto deposits, buy fixed-term mining
//! plans, and receive a daily ROI accrual. Every balance change goes
//! through a single settle path so money is never created or lost.
//!
//! # Modules
//!
//! - [`ledger`] - Domain model, plan table and the [`ledger::LedgerStore`] seam
//! - [`funding`] - Deposits, withdrawals and plan purchases
//! - [`distribution`] - Daily snapshot + ROI accrual
//! - [`oracle`] - Crypto → USD pricing
//! - [`user_auth`] - Registration, OTP login, JWT and capabilities
//! - [`admin`] - Reconciliation and audited overrides
//! - [`gateway`] - HTTP surface

pub mod admin;
pub mod config;
pub mod db;
pub mod distribution;
pub mod funding;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod oracle;
pub mod user_auth;

pub use funding::{FundsEngine, FundsError};
pub use ledger::{LedgerStore, MemoryLedgerStore, PgLedgerStore, Plan};
