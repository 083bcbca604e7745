//! Funds engine: deposits, withdrawals and plan purchases
//!
//! - [`engine`] - State machine and the shared settle path
//! - [`deposit`] / [`withdraw`] / [`invest`] - Operations per flow
//! - [`overview`] - Dashboard read models
//! - [`handlers`] - `/api/v1/wallet` routes

pub mod deposit;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod invest;
pub mod overview;
pub mod reference;
pub mod types;
pub mod withdraw;

pub use engine::FundsEngine;
pub use error::FundsError;
pub use types::{
    CompleteWithdrawalRequest, DepositRequest, InvestRequest, SourceFunds, WalletOverview,
    WithdrawalRequest,
};
