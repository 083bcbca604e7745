//! TTL-based cache for reference data (crypto assets)
//!
//! Admin changes become visible within TTL_SECONDS without a restart.

use cached::proc_macro::cached;
use std::sync::Arc;

use crate::ledger::{CryptoAsset, LedgerStore};

/// TTL for config cache in seconds
pub const TTL_SECONDS: u64 = 5;

/// Active assets, cached for TTL_SECONDS
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "assets".to_string() }"#,
    result = true
)]
pub async fn load_active_assets_cached(
    store: Arc<dyn LedgerStore>,
) -> Result<Vec<CryptoAsset>, String> {
    tracing::debug!("[cache] Loading assets from store");
    store
        .list_assets()
        .await
        .map(|assets| assets.into_iter().filter(|a| a.is_active).collect())
        .map_err(|e| format!("Failed to load assets: {}", e))
}
