//! Email notifications
//!
//! Sent after the ledger change they describe has committed. Delivery is best
//! effort: a failure is logged and never surfaces to the caller.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending mail
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, email: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(to = %email, subject = %subject, body = %body, "[NOTIFY] Email");
        Ok(())
    }
}

/// Send with a timeout; failures are logged and swallowed
pub async fn send_best_effort(
    notifier: &Arc<dyn Notifier>,
    timeout: Duration,
    email: &str,
    subject: &str,
    body: &str,
) {
    match tokio::time::timeout(timeout, notifier.notify(email, subject, body)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(to = %email, subject = %subject, error = %e, "[NOTIFY] Send failed");
        }
        Err(_) => {
            tracing::warn!(to = %email, subject = %subject, "[NOTIFY] Send timed out");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        send_best_effort(
            &notifier,
            Duration::from_millis(100),
            "a@example.com",
            "Deposit confirmed",
            "ok",
        )
        .await;
    }

    #[tokio::test]
    async fn test_message_delivered() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        send_best_effort(
            &notifier,
            Duration::from_millis(100),
            "a@example.com",
            "Deposit confirmed",
            "ok",
        )
        .await;
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }
}
