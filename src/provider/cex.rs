use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{PriceProvider, RawPrice};
use crate::config::{DEFAULT_CEX_URL, http_client};
use crate::error::{Error, Result};

/// CEX.IO ticker provider -- direct pair tickers, prices as decimal strings.
pub struct Cex {
    client: Client,
    base_url: String,
}

impl Cex {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_CEX_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Cex {
    fn default() -> Self {
        Self::new()
    }
}

/// `/ticker/{FIRST}/{SECOND}` response shape.
/// Example: `{ "pair": "BTC:USD", "last": "20000.5", "volume": "12.3" }`
/// Unlisted pairs come back as `{ "error": "Invalid Symbols Pair" }`.
#[derive(Debug, Deserialize)]
struct CexTicker {
    last: Option<String>,
}

#[async_trait]
impl PriceProvider for Cex {
    fn name(&self) -> &str {
        "CEX.IO"
    }

    fn id(&self) -> &str {
        "cex"
    }

    async fn get_price(&self, base: &str, quote: &str) -> Result<RawPrice> {
        let first = base.to_uppercase();
        let second = quote.to_uppercase();
        let url = format!("{}/ticker/{}/{}", self.base_url, first, second);

        debug!(url = %url, "fetching ticker from CEX.IO");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(status = %status, body_len = body.len(), "CEX.IO response");
        trace!(body = %body, "CEX.IO response body");

        if !status.is_success() {
            return Err(Error::Api(format!("CEX.IO returned {}: {}", status, body)));
        }

        let ticker: CexTicker =
            serde_json::from_str(&body).map_err(|e| Error::Parse(format!("CEX.IO JSON: {}", e)))?;

        let last = ticker
            .last
            .ok_or_else(|| Error::NotFound(format!("{}/{}", first, second)))?;
        let price: f64 = last
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("CEX.IO last price is not numeric: {}", last)))?;

        Ok(RawPrice::new(&first, &second, price, self.name()))
    }
}
