//! Price Oracle
//!
//! Converts an asset-denominated deposit amount to USD. Stablecoins are taken
//! at par without a lookup; everything else goes through a [`PriceFeed`]. A
//! failed lookup never fails the caller: the quote comes back as zero USD and
//! flagged for admin reconciliation.

pub mod feed;

use cached::{Cached, TimedCache};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use feed::{HttpPriceFeed, PriceFeed, StaticPriceFeed};

/// Symbols valued 1:1 against USD
pub const STABLECOINS: [&str; 3] = ["USDT", "USDC", "BUSD"];

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("No price feed for {0}")]
    UnknownPriceFeed(String),

    #[error("Price feed request failed: {0}")]
    Request(String),

    #[error("Invalid price feed response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdQuote {
    pub usd_amount: Decimal,
    pub needs_reconciliation: bool,
}

impl UsdQuote {
    fn priced(usd_amount: Decimal) -> Self {
        Self {
            usd_amount,
            needs_reconciliation: false,
        }
    }

    fn unpriced() -> Self {
        Self {
            usd_amount: Decimal::ZERO,
            needs_reconciliation: true,
        }
    }
}

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}

pub struct PriceOracle {
    feed: Arc<dyn PriceFeed>,
    cache: Mutex<TimedCache<String, Decimal>>,
}

impl PriceOracle {
    pub fn new(feed: Arc<dyn PriceFeed>, cache_ttl_secs: u64) -> Self {
        Self {
            feed,
            cache: Mutex::new(TimedCache::with_lifespan(cache_ttl_secs)),
        }
    }

    pub async fn resolve_usd_value(&self, symbol: &str, asset_amount: Decimal) -> UsdQuote {
        let symbol = symbol.trim().to_uppercase();
        if is_stablecoin(&symbol) {
            return UsdQuote::priced(asset_amount);
        }

        match self.price(&symbol).await {
            Ok(price) => UsdQuote::priced(asset_amount * price),
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol,
                    asset_amount = %asset_amount,
                    error = %e,
                    "[ORACLE] Price unavailable, deposit will need reconciliation"
                );
                UsdQuote::unpriced()
            }
        }
    }

    async fn price(&self, symbol: &str) -> Result<Decimal, OracleError> {
        if let Some(price) = self.cached(symbol) {
            return Ok(price);
        }

        let price = self.feed.usd_price(symbol).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.cache_set(symbol.to_string(), price);
        }
        tracing::debug!(symbol = %symbol, price = %price, "[ORACLE] Price fetched");
        Ok(price)
    }

    fn cached(&self, symbol: &str) -> Option<Decimal> {
        let mut cache = self.cache.lock().ok()?;
        cache.cache_get(&symbol.to_string()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(feed: Arc<StaticPriceFeed>) -> PriceOracle {
        PriceOracle::new(feed, 60)
    }

    #[tokio::test]
    async fn test_stablecoin_skips_feed() {
        let feed = Arc::new(StaticPriceFeed::new());
        let oracle = oracle(feed.clone());

        let quote = oracle
            .resolve_usd_value("usdt", Decimal::new(1000, 0))
            .await;
        assert_eq!(quote.usd_amount, Decimal::new(1000, 0));
        assert!(!quote.needs_reconciliation);
        assert_eq!(feed.calls(), 0);
    }

    #[tokio::test]
    async fn test_feed_price_applied() {
        let feed = Arc::new(StaticPriceFeed::new().with_price("BTC", Decimal::new(60000, 0)));
        let oracle = oracle(feed);

        let quote = oracle.resolve_usd_value("BTC", Decimal::new(5, 1)).await;
        assert_eq!(quote.usd_amount, Decimal::new(30000, 0));
        assert!(!quote.needs_reconciliation);
    }

    #[tokio::test]
    async fn test_unknown_symbol_flags_reconciliation() {
        let oracle = oracle(Arc::new(StaticPriceFeed::new()));

        let quote = oracle.resolve_usd_value("XYZ", Decimal::new(1, 2)).await;
        assert_eq!(quote.usd_amount, Decimal::ZERO);
        assert!(quote.needs_reconciliation);
    }

    #[tokio::test]
    async fn test_price_cached_between_lookups() {
        let feed = Arc::new(StaticPriceFeed::new().with_price("ETH", Decimal::new(3000, 0)));
        let oracle = oracle(feed.clone());

        oracle.resolve_usd_value("ETH", Decimal::ONE).await;
        oracle.resolve_usd_value("eth", Decimal::from(2)).await;
        assert_eq!(feed.calls(), 1);
    }
}
