//! One-time codes for signup, login, withdrawal and password reset
//!
//! Codes are 6 digits, single use, and expire after the configured TTL. Only
//! the latest code of a (email, kind) pair is accepted. A new code cannot be
//! issued for the same pair within the resend interval.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ledger::models::{NewOtp, OtpKind};
use crate::ledger::{LedgerStore, StoreError};
use crate::notify::{Notifier, send_best_effort};

pub const OTP_DIGITS: usize = 6;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Please wait {retry_after} seconds before requesting a new code")]
    RateLimited { retry_after: i64 },

    #[error("Invalid or expired code")]
    Invalid,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Returned to the client after a code was sent
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpChallenge {
    pub email: String,
    pub kind: OtpKind,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait OtpGate: Send + Sync {
    /// Generate, persist and send a code; `context` is included in the email
    async fn issue(&self, email: &str, kind: OtpKind, context: &str)
    -> Result<OtpChallenge, OtpError>;

    /// Check and consume a code
    async fn verify(&self, email: &str, code: &str, kind: OtpKind) -> Result<(), OtpError>;
}

pub struct OtpService {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
    resend_interval: Duration,
    notify_timeout: std::time::Duration,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        ttl_secs: i64,
        resend_interval_secs: i64,
        notify_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            ttl: Duration::seconds(ttl_secs),
            resend_interval: Duration::seconds(resend_interval_secs),
            notify_timeout,
        }
    }
}

pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_DIGITS)
}

fn subject(kind: OtpKind) -> &'static str {
    match kind {
        OtpKind::Signup => "Verify your email",
        OtpKind::Login => "Your login code",
        OtpKind::Withdrawal => "Confirm your withdrawal",
        OtpKind::PasswordReset => "Reset your password",
    }
}

#[async_trait]
impl OtpGate for OtpService {
    async fn issue(
        &self,
        email: &str,
        kind: OtpKind,
        context: &str,
    ) -> Result<OtpChallenge, OtpError> {
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        if let Some(last) = self.store.latest_otp(&email, kind).await? {
            let elapsed = now - last.created_at;
            if elapsed < self.resend_interval {
                let retry_after = (self.resend_interval - elapsed).num_seconds().max(1);
                return Err(OtpError::RateLimited { retry_after });
            }
        }

        let code = generate_code();
        let record = self
            .store
            .insert_otp(NewOtp {
                email: email.clone(),
                code: code.clone(),
                kind,
                expires_at: now + self.ttl,
            })
            .await?;

        tracing::info!(email = %email, kind = %kind, "[OTP] Code issued");

        let body = format!(
            "Your code is {}. It expires in {} minutes. {}",
            code,
            self.ttl.num_minutes(),
            context
        );
        send_best_effort(
            &self.notifier,
            self.notify_timeout,
            &email,
            subject(kind),
            &body,
        )
        .await;

        Ok(OtpChallenge {
            email,
            kind,
            expires_at: record.expires_at,
        })
    }

    async fn verify(&self, email: &str, code: &str, kind: OtpKind) -> Result<(), OtpError> {
        let email = email.trim().to_lowercase();
        let record = self
            .store
            .latest_otp(&email, kind)
            .await?
            .ok_or(OtpError::Invalid)?;

        if record.used || record.expires_at <= Utc::now() || record.code != code.trim() {
            return Err(OtpError::Invalid);
        }

        // lost race with a concurrent verify
        if !self.store.consume_otp(record.id).await? {
            return Err(OtpError::Invalid);
        }
        Ok(())
    }
}
