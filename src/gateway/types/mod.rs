//! Gateway types module
//!
//! - [`response`]: Response wrapper, error codes and the `ErrorCode` mapping

pub mod response;

pub use response::{ApiError, ApiResponse, ApiResult, ErrorCode, api_error, error_codes};
