use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::job::{DistributionError, DistributionJob};

/// Fires [`DistributionJob::run`] once a day at a fixed UTC hour
pub struct DistributionScheduler {
    job: Arc<DistributionJob>,
    run_hour_utc: u32,
}

impl DistributionScheduler {
    pub fn new(job: Arc<DistributionJob>, run_hour_utc: u32) -> Self {
        Self {
            job,
            run_hour_utc: run_hour_utc.min(23),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_forever().await })
    }

    async fn run_forever(&self) {
        tracing::info!(hour_utc = self.run_hour_utc, "[SCHEDULER] Daily distribution enabled");
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.run_hour_utc);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next = %next, "[SCHEDULER] Sleeping until next run");
            tokio::time::sleep(wait).await;

            match self.job.run().await {
                Ok(report) => tracing::info!(
                    date = %report.date,
                    total_distributed = %report.accrual.total_distributed,
                    investments_updated = report.accrual.investments_updated,
                    "[SCHEDULER] Distribution completed"
                ),
                Err(DistributionError::AlreadyDistributed(date)) => {
                    tracing::info!(date = %date, "[SCHEDULER] Already distributed, skipping")
                }
                Err(e) => tracing::error!(error = %e, "[SCHEDULER] Distribution failed"),
            }
        }
    }
}

/// First instant strictly after `now` at `hour`:00 UTC
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 3, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, 6),
            Utc.with_ymd_and_hms(2026, 5, 1, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, 0),
            Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap()
        );
    }
}
