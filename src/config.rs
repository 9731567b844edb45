use std::time::Duration;

use tracing::warn;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Fraction deducted when converting fiat into crypto (0.7% -> factor 0.993).
pub const DEFAULT_FEE_FRACTION: f64 = 0.007;

/// Unprefixed messages with more tokens than this are treated as ordinary chat and ignored.
pub const DEFAULT_IMPLICIT_MAX_TOKENS: usize = 2;

pub const DEFAULT_COINCAP_URL: &str = "https://coincap.io";
pub const DEFAULT_SHAPESHIFT_URL: &str = "https://shapeshift.io";
pub const DEFAULT_CEX_URL: &str = "https://cex.io/api";
pub const DEFAULT_JSE_URL: &str = "https://www.jamstockex.com/trading/trade-quotes/";
pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

pub const USER_AGENT: &str = concat!("pricebot/", env!("CARGO_PKG_VERSION"));

/// Runtime settings assembled from CLI flags, environment and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_currency: String,
    pub fee_fraction: f64,
    pub cache_ttl: Duration,
    pub implicit_max_tokens: usize,
    pub workers: usize,
    pub coincap_url: String,
    pub shapeshift_url: String,
    pub cex_url: String,
    pub jse_url: String,
    pub telegram_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            fee_fraction: DEFAULT_FEE_FRACTION,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            implicit_max_tokens: DEFAULT_IMPLICIT_MAX_TOKENS,
            workers: default_workers(),
            coincap_url: DEFAULT_COINCAP_URL.to_string(),
            shapeshift_url: DEFAULT_SHAPESHIFT_URL.to_string(),
            cex_url: DEFAULT_CEX_URL.to_string(),
            jse_url: DEFAULT_JSE_URL.to_string(),
            telegram_url: DEFAULT_TELEGRAM_URL.to_string(),
        }
    }
}

/// Worker count matching the host's available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Shared HTTP client settings for every upstream adapter.
///
/// Falls back to reqwest's defaults (no custom user agent) if the builder fails.
pub fn http_client() -> reqwest::Client {
    match reqwest::Client::builder().user_agent(USER_AGENT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "failed to build HTTP client, falling back to defaults");
            reqwest::Client::new()
        }
    }
}
