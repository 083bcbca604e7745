//! Funds engine error types

use rust_decimal::Decimal;
use thiserror::Error;

use crate::gateway::types::{ErrorCode, error_codes};
use crate::ledger::{StoreError, TransactionId, TxStatus, TxType};
use crate::user_auth::otp::OtpError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FundsError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Expected a {expected} transaction, got {actual}")]
    WrongType { expected: TxType, actual: TxType },

    #[error("Transaction is already {0}")]
    AlreadyFinalized(TxStatus),

    #[error(
        "Insufficient funds: available {available}, pending withdrawals {pending}, requested {requested}"
    )]
    InsufficientFunds {
        available: Decimal,
        pending: Decimal,
        requested: Decimal,
    },

    #[error("Invalid or expired verification code")]
    InvalidOtp,

    #[error("Not allowed to use this resource")]
    Unauthorized,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// OTP delivery problem, message passed through as is
    #[error("{0}")]
    Otp(String),

    #[error("Transaction {0} has no USD value yet; set the amount before approving")]
    NeedsReconciliation(TransactionId),

    /// Detail is logged, never shown to users
    #[error("Internal error")]
    Internal(String),
}

impl FundsError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        FundsError::NotFound(what.to_string())
    }
}

impl ErrorCode for FundsError {
    fn code(&self) -> i32 {
        match self {
            FundsError::NotFound(_) => error_codes::NOT_FOUND,
            FundsError::WrongType { .. } => error_codes::WRONG_TYPE,
            FundsError::AlreadyFinalized(_) => error_codes::ALREADY_FINALIZED,
            FundsError::InsufficientFunds { .. } => error_codes::INSUFFICIENT_FUNDS,
            FundsError::InvalidOtp => error_codes::INVALID_OTP,
            FundsError::Unauthorized => error_codes::FORBIDDEN,
            FundsError::InvalidAmount => error_codes::INVALID_AMOUNT,
            FundsError::Otp(_) => error_codes::RATE_LIMITED,
            FundsError::NeedsReconciliation(_) => error_codes::NEEDS_RECONCILIATION,
            FundsError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    fn http_status(&self) -> u16 {
        match self {
            FundsError::NotFound(_) => 404,
            FundsError::WrongType { .. } | FundsError::InvalidAmount | FundsError::InvalidOtp => {
                400
            }
            FundsError::Unauthorized => 403,
            FundsError::AlreadyFinalized(_) | FundsError::NeedsReconciliation(_) => 409,
            FundsError::InsufficientFunds { .. } => 422,
            FundsError::Otp(_) => 429,
            FundsError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for FundsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => FundsError::NotFound(what),
            StoreError::StatusConflict(status) => FundsError::AlreadyFinalized(status),
            StoreError::InsufficientFunds { available } => FundsError::InsufficientFunds {
                available,
                pending: Decimal::ZERO,
                requested: Decimal::ZERO,
            },
            other => {
                tracing::error!(error = %other, "[FUNDS] Store failure");
                FundsError::Internal(other.to_string())
            }
        }
    }
}

impl From<OtpError> for FundsError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::Invalid => FundsError::InvalidOtp,
            OtpError::RateLimited { .. } => FundsError::Otp(e.to_string()),
            OtpError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(FundsError::not_found("Transaction 1").http_status(), 404);
        assert_eq!(FundsError::AlreadyFinalized(TxStatus::Completed).http_status(), 409);
        assert_eq!(FundsError::Unauthorized.http_status(), 403);
        assert_eq!(FundsError::InvalidAmount.http_status(), 400);
        assert_eq!(FundsError::Internal("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err: FundsError = StoreError::Corrupt("status: BOGUS".to_string()).into();
        assert_eq!(err.to_string(), "Internal error");
    }

    #[test]
    fn test_rate_limit_message_passed_through() {
        let err: FundsError = OtpError::RateLimited { retry_after: 42 }.into();
        assert_eq!(
            err.to_string(),
            "Please wait 42 seconds before requesting a new code"
        );
        assert_eq!(err.http_status(), 429);
    }

    #[test]
    fn test_status_conflict_maps_to_already_finalized() {
        let err: FundsError = StoreError::StatusConflict(TxStatus::Failed).into();
        assert_eq!(err, FundsError::AlreadyFinalized(TxStatus::Failed));
    }
}
