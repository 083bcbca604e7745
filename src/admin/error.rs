use thiserror::Error;

use crate::distribution::DistributionError;
use crate::funding::FundsError;
use crate::gateway::types::{ErrorCode, error_codes};
use crate::ledger::StoreError;
use crate::user_auth::AuthError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Funds(#[from] FundsError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error("A justification is required for manual edits")]
    MissingJustification,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error")]
    Internal(String),
}

impl ErrorCode for AdminError {
    fn code(&self) -> i32 {
        match self {
            AdminError::Auth(e) => e.code(),
            AdminError::Funds(e) => e.code(),
            AdminError::Distribution(e) => e.code(),
            AdminError::MissingJustification | AdminError::InvalidInput(_) => {
                error_codes::INVALID_PARAMETER
            }
            AdminError::NotFound(_) => error_codes::NOT_FOUND,
            AdminError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    fn http_status(&self) -> u16 {
        match self {
            AdminError::Auth(e) => e.http_status(),
            AdminError::Funds(e) => e.http_status(),
            AdminError::Distribution(e) => e.http_status(),
            AdminError::MissingJustification | AdminError::InvalidInput(_) => 400,
            AdminError::NotFound(_) => 404,
            AdminError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AdminError::NotFound(what),
            other => {
                tracing::error!(error = %other, "[ADMIN] Store failure");
                AdminError::Internal(other.to_string())
            }
        }
    }
}
