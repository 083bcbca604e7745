use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// Environment variable overriding `jwt_secret`
pub const JWT_SECRET_ENV: &str = "MINEBANK_JWT_SECRET";
/// Environment variable overriding `postgres_url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; `None` requires `--memory`
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,
    /// Accounts registered with these emails get the ADMIN role
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_max_connections() -> u32 {
    10
}

fn default_jwt_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// CoinGecko-compatible price feed
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PriceFeedConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    /// Symbol (upper case) to feed id
    pub ids: HashMap<String, String>,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        let ids = [
            ("BTC", "bitcoin"),
            ("ETH", "ethereum"),
            ("BNB", "binancecoin"),
            ("SOL", "solana"),
            ("TRX", "tron"),
            ("LTC", "litecoin"),
            ("XRP", "ripple"),
            ("DOGE", "dogecoin"),
        ]
        .into_iter()
        .map(|(s, id)| (s.to_string(), id.to_string()))
        .collect();

        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_ms: 3000,
            cache_ttl_secs: 30,
            ids,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OtpConfig {
    pub ttl_secs: i64,
    pub resend_interval_secs: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            resend_interval_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DistributionConfig {
    /// Run the daily job inside the server process
    pub scheduler_enabled: bool,
    /// UTC hour the scheduler fires at
    pub run_hour_utc: u32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            scheduler_enabled: false,
            run_hour_utc: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyConfig {
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                self.jwt_secret = secret;
            }
        }
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                self.postgres_url = Some(url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: minebank.log
use_json: false
rotation: daily
gateway:
  host: 127.0.0.1
  port: 8080
jwt_secret: dev-secret
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert!(config.postgres_url.is_none());
        assert_eq!(config.jwt_ttl_hours, 24);
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.otp.ttl_secs, 600);
        assert_eq!(config.otp.resend_interval_secs, 60);
        assert!(!config.distribution.scheduler_enabled);
        assert_eq!(
            config.price_feed.ids.get("BTC").map(String::as_str),
            Some("bitcoin")
        );
    }

    #[test]
    fn test_price_feed_section_overrides() {
        let yaml = format!(
            "{}price_feed:\n  base_url: http://localhost:9999\n  timeout_ms: 100\n  cache_ttl_secs: 5\n  ids:\n    XYZ: xyz-coin\n",
            MINIMAL
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.price_feed.timeout_ms, 100);
        assert_eq!(config.price_feed.ids.len(), 1);
    }
}
