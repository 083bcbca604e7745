//! Price feed adapters

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::OracleError;
use crate::config::PriceFeedConfig;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// USD price of one unit of `symbol` (upper case)
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, OracleError>;
}

/// CoinGecko-compatible `/simple/price` client
pub struct HttpPriceFeed {
    client: reqwest::Client,
    base_url: String,
    ids: HashMap<String, String>,
}

impl HttpPriceFeed {
    pub fn new(config: &PriceFeedConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let ids = config
            .ids
            .iter()
            .map(|(symbol, id)| (symbol.to_uppercase(), id.clone()))
            .collect();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ids,
        })
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, OracleError> {
        let id = self
            .ids
            .get(symbol)
            .ok_or_else(|| OracleError::UnknownPriceFeed(symbol.to_string()))?;

        let url = format!("{}/simple/price", self.base_url);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .query(&[("ids", id.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| OracleError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        parse_simple_price(&body, id)
    }
}

/// Extract `body[id].usd` without going through f64
pub fn parse_simple_price(body: &serde_json::Value, id: &str) -> Result<Decimal, OracleError> {
    let raw = body
        .get(id)
        .and_then(|entry| entry.get("usd"))
        .ok_or_else(|| OracleError::InvalidResponse(format!("no usd price for {}", id)))?;

    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => {
            return Err(OracleError::InvalidResponse(format!(
                "unexpected price value: {}",
                other
            )));
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| OracleError::InvalidResponse(format!("{}: {}", text, e)))
}

/// Fixed price table
#[derive(Default)]
pub struct StaticPriceFeed {
    prices: HashMap<String, Decimal>,
    calls: AtomicUsize,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_uppercase(), price);
        self
    }

    /// Number of lookups served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| OracleError::UnknownPriceFeed(symbol.to_string()))
    }
}
