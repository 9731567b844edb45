pub mod cache;
pub mod cex;
pub mod coincap;
pub mod jse;
pub mod shapeshift;

use async_trait::async_trait;

use crate::error::Result;

/// A single price as reported by one upstream: `1 symbol = price currency`.
#[derive(Debug, Clone)]
pub struct RawPrice {
    pub symbol: String,
    pub currency: String,
    pub price: f64,
    pub provider: String,
}

impl RawPrice {
    pub fn new(symbol: &str, currency: &str, price: f64, provider: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            currency: currency.to_uppercase(),
            price,
            provider: provider.to_string(),
        }
    }
}

/// One symbol/price pair found on a scraped listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub symbol: String,
    pub price: f64,
}

/// Trait implemented by every API-backed price source.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Fetch the price of one `base` unit denominated in `quote`.
    async fn get_price(&self, base: &str, quote: &str) -> Result<RawPrice>;
}

/// Trait implemented by sources that publish all their prices on one page.
#[async_trait]
pub trait ListingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn id(&self) -> &str;

    /// Currency every listed price is denominated in.
    fn currency(&self) -> &str;

    /// Fetch the listing page and return every row that parsed cleanly.
    async fn scrape(&self) -> Result<Vec<ListingRow>>;
}

/// Parse a price cell such as `"$1,234.50"` or `" 20000.5 "`.
pub(crate) fn parse_price_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '$')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}
