#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use minebank::admin::AdminService;
use minebank::distribution::DistributionJob;
use minebank::funding::{DepositRequest, FundsEngine, WithdrawalRequest};
use minebank::gateway::state::AppState;
use minebank::ledger::{
    FundingSource, LedgerStore, MemoryLedgerStore, NewUser, OtpKind, Role, Transaction, User,
};
use minebank::notify::{LogNotifier, Notifier};
use minebank::oracle::{PriceOracle, StaticPriceFeed};
use minebank::user_auth::{AccountService, OtpService, Principal};

pub const JWT_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "admin@minebank.test";

/// Every service wired to one in-memory ledger
pub struct Harness {
    pub store: Arc<MemoryLedgerStore>,
    pub funds: Arc<FundsEngine>,
    pub accounts: Arc<AccountService>,
    pub admin: Arc<AdminService>,
    pub distribution: Arc<DistributionJob>,
    today: Arc<Mutex<NaiveDate>>,
}

impl Harness {
    pub fn new() -> Self {
        // BTC priced, anything else unknown
        let feed = StaticPriceFeed::new().with_price("BTC", Decimal::from(60_000));
        Self::with_feed(feed)
    }

    pub fn with_feed(feed: StaticPriceFeed) -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        let timeout = Duration::from_millis(100);

        // no resend interval so tests can request codes back to back
        let otp = Arc::new(OtpService::new(
            store.clone(),
            notifier.clone(),
            600,
            0,
            timeout,
        ));
        let oracle = Arc::new(PriceOracle::new(Arc::new(feed), 60));

        let accounts = Arc::new(AccountService::new(
            store.clone(),
            otp.clone(),
            JWT_SECRET.to_string(),
            24,
            vec![ADMIN_EMAIL.to_string()],
        ));
        let funds = Arc::new(FundsEngine::new(
            store.clone(),
            oracle,
            otp,
            notifier,
            timeout,
        ));
        let today = Arc::new(Mutex::new(first_day()));
        let clock = today.clone();
        let distribution = Arc::new(DistributionJob::with_clock(
            store.clone(),
            Arc::new(move || *clock.lock().unwrap()),
        ));
        let admin = Arc::new(AdminService::new(
            funds.clone(),
            store.clone(),
            distribution.clone(),
        ));

        Self {
            store,
            funds,
            accounts,
            admin,
            distribution,
            today,
        }
    }

    /// Business date seen by the distribution job
    pub fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }

    pub fn next_day(&self) -> NaiveDate {
        let mut today = self.today.lock().unwrap();
        *today = *today + Days::new(1);
        *today
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(
            self.store.clone(),
            self.funds.clone(),
            self.accounts.clone(),
            self.admin.clone(),
            None,
        ))
    }

    pub async fn user(&self, email: &str, role: Role) -> User {
        self.store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                name: "Test".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn admin_principal(&self) -> Principal {
        let admin = self.user(ADMIN_EMAIL, Role::Admin).await;
        Principal::new(admin.id, admin.role)
    }

    /// User whose wallet holds `usd` through a confirmed USDT deposit
    pub async fn funded_user(&self, email: &str, usd: i64) -> User {
        let user = self.user(email, Role::User).await;
        let tx = self
            .funds
            .request_deposit(user.id, deposit("USDT", Decimal::from(usd)))
            .await
            .unwrap();
        self.funds.confirm_deposit(tx.id).await.unwrap();
        self.store.user(user.id).await.unwrap().unwrap()
    }

    pub async fn balance_of(&self, user: &User) -> Decimal {
        self.store.user(user.id).await.unwrap().unwrap().balance
    }

    /// Both user steps of a withdrawal, reading the code from the store
    pub async fn withdraw(
        &self,
        user: &User,
        source: FundingSource,
        amount: Decimal,
    ) -> Result<Transaction, minebank::FundsError> {
        let req = withdrawal(source, amount);
        self.funds.request_withdrawal(user.id, &req).await?;
        let code = self
            .store
            .latest_otp(&user.email, OtpKind::Withdrawal)
            .await
            .unwrap()
            .unwrap()
            .code;
        self.funds.complete_withdrawal(user.id, &req, &code).await
    }
}

pub fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub fn deposit(currency: &str, asset_amount: Decimal) -> DepositRequest {
    DepositRequest {
        asset_amount,
        currency: currency.to_string(),
        network: "TRC20".to_string(),
        address: None,
        tx_hash: None,
    }
}

pub fn withdrawal(source: FundingSource, amount: Decimal) -> WithdrawalRequest {
    WithdrawalRequest {
        amount,
        currency: "USDT".to_string(),
        network: "TRC20".to_string(),
        address: "TXYZabcdefghijklmnop".to_string(),
        source,
    }
}

pub fn usd(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
