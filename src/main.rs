//! Minebank server
//!
//! ```text
//! minebank [--env dev] [--port 8080] [--memory]
//! minebank --distribute      # snapshot + accrual for today, then exit
//! minebank --snapshot        # portfolio snapshot only, then exit
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use minebank::admin::AdminService;
use minebank::config::AppConfig;
use minebank::db::Database;
use minebank::distribution::{DistributionJob, DistributionScheduler};
use minebank::funding::FundsEngine;
use minebank::gateway::{self, state::AppState};
use minebank::ledger::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use minebank::notify::{LogNotifier, Notifier};
use minebank::oracle::{HttpPriceFeed, PriceOracle};
use minebank::user_auth::{AccountService, OtpService};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

async fn open_store(
    config: &AppConfig,
    memory: bool,
) -> anyhow::Result<(Arc<dyn LedgerStore>, Option<Arc<Database>>)> {
    if memory {
        tracing::warn!("Using in-memory ledger; all data is lost on exit");
        return Ok((Arc::new(MemoryLedgerStore::new()), None));
    }

    let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is not set (use --memory for a throwaway ledger)")?;
    let db = Database::connect(url, config.postgres_max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.init_schema()
        .await
        .context("Failed to initialize schema")?;

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(db.pool().clone()));
    Ok((store, Some(Arc::new(db))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = minebank::logging::init_logging(&app_config);

    tracing::info!(
        "Starting Minebank {} in {} mode",
        env!("GIT_HASH"),
        env
    );

    let (store, pg_db) = open_store(&app_config, has_flag("--memory")).await?;
    let distribution = Arc::new(DistributionJob::new(store.clone()));

    // One-shot jobs for cron-driven deployments
    if has_flag("--distribute") {
        let report = distribution.run().await?;
        tracing::info!(
            date = %report.date,
            snapshots = report.snapshots_written,
            updated = report.accrual.investments_updated,
            total_distributed = %report.accrual.total_distributed,
            "Distribution finished"
        );
        return Ok(());
    }
    if has_flag("--snapshot") {
        let report = distribution.snapshot().await?;
        tracing::info!(
            date = %report.date,
            written = report.snapshots_written,
            "Snapshot finished"
        );
        return Ok(());
    }

    let notify_timeout = Duration::from_millis(app_config.notify.timeout_ms);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let feed = HttpPriceFeed::new(&app_config.price_feed)?;
    let oracle = Arc::new(PriceOracle::new(
        Arc::new(feed),
        app_config.price_feed.cache_ttl_secs,
    ));

    let otp = Arc::new(OtpService::new(
        store.clone(),
        notifier.clone(),
        app_config.otp.ttl_secs,
        app_config.otp.resend_interval_secs,
        notify_timeout,
    ));

    let accounts = Arc::new(AccountService::new(
        store.clone(),
        otp.clone(),
        app_config.jwt_secret.clone(),
        app_config.jwt_ttl_hours,
        app_config.admin_emails.clone(),
    ));

    let funds = Arc::new(FundsEngine::new(
        store.clone(),
        oracle,
        otp,
        notifier,
        notify_timeout,
    ));

    let admin = Arc::new(AdminService::new(
        funds.clone(),
        store.clone(),
        distribution.clone(),
    ));

    if app_config.distribution.scheduler_enabled {
        DistributionScheduler::new(distribution, app_config.distribution.run_hour_utc).spawn();
    }

    let state = Arc::new(AppState::new(store, funds, accounts, admin, pg_db));
    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, state).await
}
