use std::time::Duration;

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::provider::cache::ScrapeCache;
use crate::provider::cex::Cex;
use crate::provider::coincap::CoinCap;
use crate::provider::jse::Jse;
use crate::provider::shapeshift::ShapeShift;
use crate::provider::{ListingProvider, PriceProvider};
use crate::quote::{Fiat, Quote};
use crate::router::Venue;

const EXCHANGE_CURRENCY: &str = "USD";

/// The upstream sources a [`Resolver`] consults, one per role.
pub struct Sources {
    /// Fiat/crypto prices, used whenever either side is fiat.
    pub fiat: Box<dyn PriceProvider>,
    /// Crypto/crypto rates, used when neither side is fiat.
    pub pairs: Box<dyn PriceProvider>,
    /// Centralized exchange tickers for `/cex`.
    pub exchange: Box<dyn PriceProvider>,
    /// Scraped stock listing for `/jse`.
    pub listing: Box<dyn ListingProvider>,
}

impl Sources {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            fiat: Box::new(CoinCap::with_base_url(settings.coincap_url.as_str())),
            pairs: Box::new(ShapeShift::with_base_url(settings.shapeshift_url.as_str())),
            exchange: Box::new(Cex::with_base_url(settings.cex_url.as_str())),
            listing: Box::new(Jse::with_url(settings.jse_url.as_str())),
        }
    }
}

/// Picks the authoritative source for a pair and turns its answer into a [`Quote`].
pub struct Resolver {
    sources: Sources,
    cache: ScrapeCache,
    fee_fraction: f64,
}

impl Resolver {
    pub fn new(sources: Sources, cache_ttl: Duration, fee_fraction: f64) -> Self {
        Self {
            sources,
            cache: ScrapeCache::new(cache_ttl),
            fee_fraction,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Sources::from_settings(settings),
            settings.cache_ttl,
            settings.fee_fraction,
        )
    }

    pub fn cache(&self) -> &ScrapeCache {
        &self.cache
    }

    /// Human-readable names of every configured source.
    pub fn source_names(&self) -> [&str; 4] {
        [
            self.sources.fiat.name(),
            self.sources.pairs.name(),
            self.sources.exchange.name(),
            self.sources.listing.name(),
        ]
    }

    /// Price `amount` units of `first` in `second`.
    ///
    /// Pairs with a fiat side go to the fiat source; when the fiat is `first`
    /// the crypto price is inverted and the conversion fee deducted. Pairs
    /// without fiat go to the crypto/crypto rate source.
    pub async fn resolve(&self, first: &str, second: &str, amount: f64) -> Result<Quote> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::Input(format!("amount must be positive, got {}", amount)));
        }

        let first = first.to_uppercase();
        let second = second.to_uppercase();

        let unit_price = match (Fiat::from_ticker(&first), Fiat::from_ticker(&second)) {
            (_, Some(_)) => {
                let raw = self.sources.fiat.get_price(&first, &second).await?;
                debug!(provider = %raw.provider, price = raw.price, "direct fiat price");
                raw.price
            }
            (Some(_), None) => {
                let raw = self.sources.fiat.get_price(&second, &first).await?;
                if raw.price <= 0.0 {
                    return Err(Error::Parse(format!(
                        "{} reported a non-positive price for {}",
                        raw.provider, second
                    )));
                }
                debug!(provider = %raw.provider, price = raw.price, fee = self.fee_fraction, "inverting fiat price");
                (1.0 - self.fee_fraction) / raw.price
            }
            (None, None) => {
                let raw = self.sources.pairs.get_price(&first, &second).await?;
                debug!(provider = %raw.provider, rate = raw.price, "pair rate");
                raw.price
            }
        };

        Ok(Quote::new(&first, &second, unit_price).with_amount(amount))
    }

    /// Quote a single ticker on an exchange-specific source. `/cex` always
    /// prices against USD.
    pub async fn resolve_on(&self, venue: Venue, ticker: &str) -> Result<Quote> {
        match venue {
            Venue::Cex => self.resolve_exchange(ticker).await,
            Venue::Jse => self.resolve_listed(ticker).await,
        }
    }

    async fn resolve_exchange(&self, ticker: &str) -> Result<Quote> {
        let exchange = &self.sources.exchange;
        let raw = exchange.get_price(ticker, EXCHANGE_CURRENCY).await?;
        Ok(Quote::new(&raw.symbol, &raw.currency, raw.price).with_source(exchange.name()))
    }

    async fn resolve_listed(&self, ticker: &str) -> Result<Quote> {
        let listing = &self.sources.listing;
        let symbol = ticker.to_uppercase();
        let quote = |price: f64| {
            Quote::new(&symbol, listing.currency(), price).with_source(listing.name())
        };

        if let Some(price) = self.cache.get(&symbol).await {
            debug!(symbol = %symbol, "listing cache hit");
            return Ok(quote(price));
        }

        let _refresh = self.cache.lock_refresh().await;

        // Another worker may have refreshed while we waited.
        if let Some(price) = self.cache.get(&symbol).await {
            debug!(symbol = %symbol, "listing cache filled by concurrent refresh");
            return Ok(quote(price));
        }

        let rows = listing.scrape().await?;
        info!(provider = listing.id(), rows = rows.len(), "refreshed listing cache");
        self.cache.insert_all(&rows).await;

        rows.iter()
            .rev()
            .find(|row| row.symbol == symbol)
            .map(|row| quote(row.price))
            .ok_or_else(|| Error::NotFound(symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::provider::{ListingRow, RawPrice};

    /// Fixed-price provider that records every `(base, quote)` it is asked for.
    #[derive(Clone, Default)]
    struct FakePrices {
        price: f64,
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakePrices {
        fn at(price: f64) -> Self {
            Self {
                price,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceProvider for FakePrices {
        fn name(&self) -> &str {
            "fake"
        }

        fn id(&self) -> &str {
            "fake"
        }

        async fn get_price(&self, base: &str, quote: &str) -> Result<RawPrice> {
            self.calls
                .lock()
                .unwrap()
                .push((base.to_string(), quote.to_string()));
            Ok(RawPrice::new(base, quote, self.price, "fake"))
        }
    }

    #[derive(Clone, Default)]
    struct FakeListing {
        rows: Vec<ListingRow>,
        scrapes: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl ListingProvider for FakeListing {
        fn name(&self) -> &str {
            "Fake Exchange"
        }

        fn id(&self) -> &str {
            "fake-listing"
        }

        fn currency(&self) -> &str {
            "JMD"
        }

        async fn scrape(&self) -> Result<Vec<ListingRow>> {
            self.scrapes.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.rows.clone())
        }
    }

    fn resolver(fiat: &FakePrices, pairs: &FakePrices, listing: &FakeListing) -> Resolver {
        resolver_with_ttl(fiat, pairs, listing, Duration::from_secs(300))
    }

    fn resolver_with_ttl(
        fiat: &FakePrices,
        pairs: &FakePrices,
        listing: &FakeListing,
        ttl: Duration,
    ) -> Resolver {
        Resolver::new(
            Sources {
                fiat: Box::new(fiat.clone()),
                pairs: Box::new(pairs.clone()),
                exchange: Box::new(FakePrices::at(1.0)),
                listing: Box::new(listing.clone()),
            },
            ttl,
            0.007,
        )
    }

    fn listing() -> FakeListing {
        FakeListing {
            rows: vec![
                ListingRow { symbol: "NCBFG".into(), price: 112.5 },
                ListingRow { symbol: "GK".into(), price: 75.0 },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn crypto_to_fiat_uses_price_directly() {
        let fiat = FakePrices::at(20000.0);
        let pairs = FakePrices::at(0.0);
        let quote = resolver(&fiat, &pairs, &listing())
            .resolve("btc", "usd", 2.0)
            .await
            .unwrap();

        assert_eq!(fiat.calls(), vec![("BTC".to_string(), "USD".to_string())]);
        assert!(pairs.calls().is_empty());
        assert!((quote.unit_price - 20000.0).abs() < f64::EPSILON);
        assert!((quote.total() - 40000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn fiat_to_crypto_inverts_with_fee() {
        let fiat = FakePrices::at(20000.0);
        let quote = resolver(&fiat, &FakePrices::at(0.0), &listing())
            .resolve("USD", "BTC", 100.0)
            .await
            .unwrap();

        assert_eq!(fiat.calls(), vec![("BTC".to_string(), "USD".to_string())]);
        assert!((quote.unit_price - 0.993 / 20000.0).abs() < 1e-15);
        assert!((quote.total() - 0.004965).abs() < 1e-12);
    }

    #[tokio::test]
    async fn same_fiat_on_both_sides_is_not_inverted() {
        for fiat_code in Fiat::ALL.iter().map(|f| f.code()) {
            let fiat = FakePrices::at(1.0);
            let quote = resolver(&fiat, &FakePrices::at(0.0), &listing())
                .resolve(fiat_code, fiat_code, 3.0)
                .await
                .unwrap();
            assert_eq!(fiat.calls(), vec![(fiat_code.to_string(), fiat_code.to_string())]);
            assert!((quote.unit_price - 1.0).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn crypto_pairs_go_to_rate_source() {
        let fiat = FakePrices::at(0.0);
        let pairs = FakePrices::at(70.5);
        let quote = resolver(&fiat, &pairs, &listing())
            .resolve("BTC", "LTC", 1.0)
            .await
            .unwrap();

        assert!(fiat.calls().is_empty());
        assert_eq!(pairs.calls(), vec![("BTC".to_string(), "LTC".to_string())]);
        assert!((quote.unit_price - 70.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn rejects_non_positive_amount() {
        let fiat = FakePrices::at(1.0);
        let result = resolver(&fiat, &FakePrices::at(1.0), &listing())
            .resolve("BTC", "USD", 0.0)
            .await;
        assert!(matches!(result, Err(Error::Input(_))));
        assert!(fiat.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn listing_scrape_is_cached_until_ttl() {
        let listing = listing();
        let resolver = resolver(&FakePrices::at(1.0), &FakePrices::at(1.0), &listing);

        let quote = resolver.resolve_on(Venue::Jse, "ncbfg").await.unwrap();
        assert_eq!(quote.second, "JMD");
        assert_eq!(quote.source.as_deref(), Some("Fake Exchange"));
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 1);

        // Every scraped symbol was cached, not just the requested one.
        resolver.resolve_on(Venue::Jse, "GK").await.unwrap();
        resolver.resolve_on(Venue::Jse, "NCBFG").await.unwrap();
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        resolver.resolve_on(Venue::Jse, "NCBFG").await.unwrap();
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listing_miss_after_scrape_is_not_found() {
        let listing = listing();
        let resolver = resolver(&FakePrices::at(1.0), &FakePrices::at(1.0), &listing);

        let result = resolver.resolve_on(Venue::Jse, "XYZ").await;
        assert!(matches!(result, Err(Error::NotFound(ref s)) if s == "XYZ"));
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exchange_quote_is_labelled() {
        let resolver = resolver(&FakePrices::at(1.0), &FakePrices::at(1.0), &listing());
        let quote = resolver.resolve_on(Venue::Cex, "eth").await.unwrap();
        assert_eq!(quote.first, "ETH");
        assert_eq!(quote.second, "USD");
        assert_eq!(quote.source.as_deref(), Some("fake"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_scrape() {
        let listing = FakeListing {
            delay: Duration::from_millis(50),
            ..listing()
        };
        let resolver = Arc::new(resolver(&FakePrices::at(1.0), &FakePrices::at(1.0), &listing));

        let lookups: Vec<_> = (0..8)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                let symbol = if i % 2 == 0 { "NCBFG" } else { "GK" };
                tokio::spawn(async move { resolver.resolve_on(Venue::Jse, symbol).await })
            })
            .collect();

        for lookup in futures::future::join_all(lookups).await {
            lookup.unwrap().unwrap();
        }
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn huge_cache_ttl_does_not_panic() {
        let listing = listing();
        let resolver = resolver_with_ttl(
            &FakePrices::at(1.0),
            &FakePrices::at(1.0),
            &listing,
            Duration::from_secs(u64::MAX),
        );

        let quote = resolver.resolve_on(Venue::Jse, "GK").await.unwrap();
        assert!((quote.unit_price - 75.0).abs() < f64::EPSILON);
        resolver.resolve_on(Venue::Jse, "NCBFG").await.unwrap();
        assert_eq!(listing.scrapes.load(Ordering::SeqCst), 1);
    }
}
