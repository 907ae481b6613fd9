use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::error::DomainError;
use crate::domain::ports::quote_provider::{QuoteProvider, QuoteSnapshot};
use crate::domain::values::market_scope::MarketScope;

type CacheKey = (MarketScope, String);

/// Per-symbol TTL cache in front of another provider. Misses (`None`) are
/// cached as well; errors are not.
pub struct CachedQuoteProvider {
    inner: Arc<dyn QuoteProvider>,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Option<QuoteSnapshot>)>>,
}

impl CachedQuoteProvider {
    pub fn new(inner: Arc<dyn QuoteProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<QuoteSnapshot>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((stored, value)) if stored.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl QuoteProvider for CachedQuoteProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn snapshot(
        &self,
        scope: MarketScope,
        symbol: &str,
    ) -> Result<Option<QuoteSnapshot>, DomainError> {
        let key = (scope, symbol.to_string());
        if let Some(hit) = self.cached(&key) {
            debug!(symbol, "quote cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.snapshot(scope, symbol).await?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, (Instant::now(), fresh.clone()));
        Ok(fresh)
    }
}
