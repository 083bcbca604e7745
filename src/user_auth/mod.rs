//! Accounts: signup, OTP login, password reset and JWT principals

pub mod handlers;
pub mod middleware;
pub mod otp;
pub mod principal;
pub mod service;

pub use otp::{OtpChallenge, OtpError, OtpGate, OtpService};
pub use principal::{Capability, Principal};
pub use service::{AccountService, AuthError, AuthResponse, Claims};
