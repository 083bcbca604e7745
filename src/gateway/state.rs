use std::sync::Arc;

use crate::admin::AdminService;
use crate::db::Database;
use crate::funding::FundsEngine;
use crate::ledger::LedgerStore;
use crate::user_auth::AccountService;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub funds: Arc<FundsEngine>,
    pub accounts: Arc<AccountService>,
    pub admin: Arc<AdminService>,
    /// `None` in `--memory` mode
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        funds: Arc<FundsEngine>,
        accounts: Arc<AccountService>,
        admin: Arc<AdminService>,
        pg_db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            store,
            funds,
            accounts,
            admin,
            pg_db,
        }
    }
}
