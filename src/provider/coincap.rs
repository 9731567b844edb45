use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{PriceProvider, RawPrice};
use crate::config::{DEFAULT_COINCAP_URL, http_client};
use crate::error::{Error, Result};
use crate::quote::Fiat;

/// The service answers unknown tickers with `{}` and a 200 status.
const NOT_FOUND_BODY_LEN: usize = 2;

/// coincap.io price provider -- per-ticker records priced in several fiat currencies.
pub struct CoinCap {
    client: Client,
    base_url: String,
}

impl CoinCap {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_COINCAP_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for CoinCap {
    fn default() -> Self {
        Self::new()
    }
}

/// coincap `/page/{TICKER}` response shape (only the fields we read).
/// Example: `{ "id": "BTC", "price_usd": 20000.5, "price_eur": 18500.1 }`
#[derive(Debug, Deserialize)]
struct CoinRecord {
    price_usd: Option<f64>,
    price_eur: Option<f64>,
}

impl CoinRecord {
    fn price(&self, fiat: Fiat) -> Option<f64> {
        match fiat {
            Fiat::Usd => self.price_usd,
            Fiat::Eur => self.price_eur,
        }
    }
}

#[async_trait]
impl PriceProvider for CoinCap {
    fn name(&self) -> &str {
        "coincap.io"
    }

    fn id(&self) -> &str {
        "coincap"
    }

    async fn get_price(&self, base: &str, quote: &str) -> Result<RawPrice> {
        let fiat = Fiat::from_ticker(quote)
            .ok_or_else(|| Error::Input(format!("{} is not a supported fiat currency", quote)))?;
        let ticker = base.to_uppercase();
        let url = format!("{}/page/{}", self.base_url, ticker);

        debug!(url = %url, "fetching price record from coincap");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(status = %status, body_len = body.len(), "coincap response");
        trace!(body = %body, "coincap response body");

        if !status.is_success() {
            return Err(Error::Api(format!("coincap returned {}: {}", status, body)));
        }

        if body.len() == NOT_FOUND_BODY_LEN {
            return Err(Error::NotFound(ticker));
        }

        let record: CoinRecord =
            serde_json::from_str(&body).map_err(|e| Error::Parse(format!("coincap JSON: {}", e)))?;

        let price = record.price(fiat).ok_or_else(|| {
            Error::Parse(format!(
                "coincap record for {} has no {}",
                ticker,
                fiat.price_field()
            ))
        })?;

        Ok(RawPrice::new(&ticker, fiat.code(), price, self.name()))
    }
}
