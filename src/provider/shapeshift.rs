use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{PriceProvider, RawPrice, parse_price_text};
use crate::config::{DEFAULT_SHAPESHIFT_URL, http_client};
use crate::error::{Error, Result};

/// ShapeShift rate provider -- crypto-to-crypto pairs named `first_second`.
pub struct ShapeShift {
    client: Client,
    base_url: String,
}

impl ShapeShift {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SHAPESHIFT_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn pair_name(base: &str, quote: &str) -> String {
        format!("{}_{}", base, quote).to_lowercase()
    }
}

impl Default for ShapeShift {
    fn default() -> Self {
        Self::new()
    }
}

/// Rates arrive as either a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateValue {
    Number(f64),
    Text(String),
}

/// `/rate/{pair}` response shape.
/// Example: `{ "pair": "btc_ltc", "rate": "70.1234" }` or `{ "error": "Unknown pair" }`
#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: Option<RateValue>,
    error: Option<String>,
}

#[async_trait]
impl PriceProvider for ShapeShift {
    fn name(&self) -> &str {
        "ShapeShift"
    }

    fn id(&self) -> &str {
        "shapeshift"
    }

    async fn get_price(&self, base: &str, quote: &str) -> Result<RawPrice> {
        let pair = Self::pair_name(base, quote);
        let url = format!("{}/rate/{}", self.base_url, pair);

        debug!(url = %url, "fetching rate from ShapeShift");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(status = %status, body_len = body.len(), "ShapeShift response");
        trace!(body = %body, "ShapeShift response body");

        if !status.is_success() {
            return Err(Error::Api(format!("ShapeShift returned {}: {}", status, body)));
        }

        let parsed: RateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("ShapeShift JSON: {}", e)))?;

        if let Some(message) = parsed.error.filter(|m| !m.is_empty()) {
            return Err(Error::NotQuotable { pair, message });
        }

        let rate = match parsed.rate {
            Some(RateValue::Number(n)) if n.is_finite() => n,
            Some(RateValue::Text(text)) => parse_price_text(&text).ok_or_else(|| {
                Error::Parse(format!("ShapeShift rate for {} is not numeric: {}", pair, text))
            })?,
            _ => return Err(Error::Parse(format!("ShapeShift response for {} has no rate", pair))),
        };

        Ok(RawPrice::new(base, quote, rate, self.name()))
    }
}
