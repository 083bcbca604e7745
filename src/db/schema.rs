//! PostgreSQL schema for the ledger
//!
//! Statements are idempotent (`IF NOT EXISTS`) and run once at start up.

use sqlx::PgPool;

/// Create all ledger tables and indexes
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing ledger schema...");

    for (name, stmt) in STATEMENTS {
        sqlx::query(stmt).execute(pool).await.map_err(|e| {
            tracing::error!("Failed to apply schema statement '{}': {}", name, e);
            e
        })?;
    }

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}

const STATEMENTS: &[(&str, &str)] = &[
    ("users", CREATE_USERS_TABLE),
    ("investments", CREATE_INVESTMENTS_TABLE),
    ("investments_one_active_plan", CREATE_ACTIVE_PLAN_INDEX),
    ("transactions", CREATE_TRANSACTIONS_TABLE),
    ("transactions_pending_source", CREATE_PENDING_SOURCE_INDEX),
    ("portfolio_history", CREATE_PORTFOLIO_HISTORY_TABLE),
    ("distribution_runs", CREATE_DISTRIBUTION_RUNS_TABLE),
    ("otps", CREATE_OTPS_TABLE),
    ("otps_lookup", CREATE_OTPS_INDEX),
    ("crypto_assets", CREATE_CRYPTO_ASSETS_TABLE),
    ("asset_networks", CREATE_ASSET_NETWORKS_TABLE),
];

// Money columns are NUMERIC; the CHECK constraints are the last line of
// defence behind the guarded updates in `ledger::pg`.
const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name          TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'USER',
    is_verified   BOOLEAN NOT NULL DEFAULT FALSE,
    balance       NUMERIC(30, 10) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    image         TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_INVESTMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS investments (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    plan       TEXT NOT NULL,
    daily_roi  NUMERIC(12, 6) NOT NULL,
    amount     NUMERIC(30, 10) NOT NULL CHECK (amount >= 0),
    profit     NUMERIC(30, 10) NOT NULL DEFAULT 0 CHECK (profit >= 0),
    status     TEXT NOT NULL DEFAULT 'ACTIVE',
    start_date TIMESTAMPTZ NOT NULL,
    end_date   TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_ACTIVE_PLAN_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS investments_one_active_plan
    ON investments (user_id, plan) WHERE status = 'ACTIVE'
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                   BIGSERIAL PRIMARY KEY,
    user_id              BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    tx_type              TEXT NOT NULL,
    amount               NUMERIC(30, 10) NOT NULL,
    asset_amount         NUMERIC(30, 10),
    currency             TEXT NOT NULL,
    network              TEXT,
    address              TEXT,
    status               TEXT NOT NULL DEFAULT 'PENDING',
    source               TEXT,
    reference            TEXT NOT NULL,
    needs_reconciliation BOOLEAN NOT NULL DEFAULT FALSE,
    created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_PENDING_SOURCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transactions_pending_source
    ON transactions (user_id, source) WHERE tx_type = 'WITHDRAWAL' AND status = 'PENDING'
"#;

const CREATE_PORTFOLIO_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS portfolio_history (
    user_id        BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    snapshot_date  DATE NOT NULL,
    total_value    NUMERIC(30, 10) NOT NULL,
    liquid_balance NUMERIC(30, 10) NOT NULL,
    total_invested NUMERIC(30, 10) NOT NULL,
    total_profit   NUMERIC(30, 10) NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, snapshot_date)
)
"#;

const CREATE_DISTRIBUTION_RUNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS distribution_runs (
    run_date            DATE PRIMARY KEY,
    total_distributed   NUMERIC(30, 10) NOT NULL DEFAULT 0,
    investments_updated BIGINT NOT NULL DEFAULT 0,
    users_affected      BIGINT NOT NULL DEFAULT 0,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_OTPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS otps (
    id         BIGSERIAL PRIMARY KEY,
    email      TEXT NOT NULL,
    code       TEXT NOT NULL,
    kind       TEXT NOT NULL,
    used       BOOLEAN NOT NULL DEFAULT FALSE,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_OTPS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS otps_lookup ON otps (email, kind, id DESC)
"#;

const CREATE_CRYPTO_ASSETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS crypto_assets (
    symbol    TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    icon      TEXT,
    is_active BOOLEAN NOT NULL DEFAULT TRUE
)
"#;

const CREATE_ASSET_NETWORKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS asset_networks (
    symbol          TEXT NOT NULL REFERENCES crypto_assets(symbol) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    deposit_address TEXT NOT NULL,
    PRIMARY KEY (symbol, name)
)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_idempotent() {
        for (name, stmt) in STATEMENTS {
            assert!(
                stmt.contains("IF NOT EXISTS"),
                "statement '{}' must be re-runnable",
                name
            );
        }
    }
}
