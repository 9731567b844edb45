//! Short-lived price cache for scraped listing pages.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;

use super::ListingRow;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    price: f64,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe symbol -> price cache with a fixed TTL.
///
/// Reads take a shared lock. Refreshes are serialized through a separate
/// mutex so only one scrape runs at a time; writers hold the map lock only
/// while inserting.
#[derive(Debug, Clone)]
pub struct ScrapeCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    refresh: Arc<Mutex<()>>,
    ttl: Duration,
}

impl ScrapeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            refresh: Arc::new(Mutex::new(())),
            ttl,
        }
    }

    /// Price for `symbol` if present and not expired.
    pub async fn get(&self, symbol: &str) -> Option<f64> {
        let entries = self.entries.read().await;
        entries
            .get(symbol)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.price)
    }

    /// Insert every scraped row; later writes win.
    pub async fn insert_all(&self, rows: &[ListingRow]) {
        if self.ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now().checked_add(self.ttl);
        let mut entries = self.entries.write().await;
        for row in rows {
            entries.insert(
                row.symbol.clone(),
                CacheEntry {
                    price: row.price,
                    expires_at,
                },
            );
        }
    }

    /// Hold this guard while scraping so concurrent misses wait for one refresh.
    pub async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh.lock().await
    }

    /// Drop expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
    }

    /// Number of entries, including expired ones not yet cleared.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
