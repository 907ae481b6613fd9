//! Quote enrichment for Kr signals. Best effort and deadline aware.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::deadline::{Deadline, Elapsed};
use crate::domain::entities::normalized_signal::NormalizedSignal;
use crate::domain::ports::quote_provider::{QuoteProvider, QuoteSnapshot};
use crate::domain::values::signal_metadata::SignalMetadata;

const LOOKUP_CONCURRENCY: usize = 4;

#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichOutcome {
    pub requested: usize,
    pub resolved: usize,
    pub enriched_signals: usize,
    /// True when the run deadline cut resolution short.
    pub deadline_hit: bool,
}

pub struct MetadataEnricher {
    quotes: Arc<dyn QuoteProvider>,
    max_symbols: usize,
    quote_timeout: Duration,
}

impl MetadataEnricher {
    pub fn new(quotes: Arc<dyn QuoteProvider>, max_symbols: usize, quote_timeout: Duration) -> Self {
        Self {
            quotes,
            max_symbols,
            quote_timeout,
        }
    }

    /// Resolve quote snapshots for up to `max_symbols` distinct Kr symbols and
    /// fill metadata fields that are still empty.
    pub async fn enrich(&self, signals: &mut [NormalizedSignal], deadline: &Deadline) -> EnrichOutcome {
        let mut seen = HashSet::new();
        let targets: Vec<_> = signals
            .iter()
            .filter(|s| s.scope.has_quant_engine())
            .filter(|s| seen.insert(s.symbol.clone()))
            .map(|s| (s.scope, s.symbol.clone()))
            .take(self.max_symbols)
            .collect();

        let mut outcome = EnrichOutcome {
            requested: targets.len(),
            ..Default::default()
        };
        if targets.is_empty() {
            return outcome;
        }

        let lookups = stream::iter(targets)
            .map(|(scope, symbol)| async move {
                if deadline.is_expired() {
                    return (symbol, Err(Elapsed::Deadline));
                }
                let result = deadline
                    .race(self.quote_timeout, self.quotes.snapshot(scope, &symbol))
                    .await;
                (symbol, result)
            })
            .buffer_unordered(LOOKUP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut snapshots: HashMap<String, QuoteSnapshot> = HashMap::new();
        for (symbol, result) in lookups {
            match result {
                Ok(Ok(Some(snapshot))) => {
                    snapshots.insert(symbol, snapshot);
                }
                Ok(Ok(None)) => debug!(symbol = symbol.as_str(), "no quote"),
                Ok(Err(e)) => warn!(symbol = symbol.as_str(), error = %e, "quote lookup failed"),
                Err(Elapsed::Call(limit)) => {
                    warn!(symbol = symbol.as_str(), timeout_ms = limit.as_millis() as u64, "quote lookup timed out")
                }
                Err(Elapsed::Deadline) => outcome.deadline_hit = true,
            }
        }
        outcome.resolved = snapshots.len();

        for signal in signals.iter_mut() {
            if let Some(snapshot) = snapshots.get(&signal.symbol) {
                if fill_missing(&mut signal.metadata, snapshot) {
                    outcome.enriched_signals += 1;
                }
            }
        }

        info!(
            requested = outcome.requested,
            resolved = outcome.resolved,
            enriched = outcome.enriched_signals,
            deadline_hit = outcome.deadline_hit,
            "enrich complete"
        );
        outcome
    }
}

/// Copy quote values into empty metadata slots. Gatherer-provided values are
/// never overwritten. Returns whether anything was filled.
pub fn fill_missing(meta: &mut SignalMetadata, quote: &QuoteSnapshot) -> bool {
    fn fill<T: Copy>(slot: &mut Option<T>, value: Option<T>) -> bool {
        if slot.is_none() && value.is_some() {
            *slot = value;
            true
        } else {
            false
        }
    }
    let mut changed = false;
    changed |= fill(&mut meta.volume_ratio, quote.volume_ratio);
    changed |= fill(&mut meta.price_vs_ma5_pct, quote.price_vs_ma5_pct);
    changed |= fill(&mut meta.price_vs_ma20_pct, quote.price_vs_ma20_pct);
    changed |= fill(&mut meta.foreign_net_buy, quote.foreign_net_buy);
    changed |= fill(&mut meta.institution_net_buy, quote.institution_net_buy);
    changed |= fill(&mut meta.near_52w_high, quote.near_52w_high);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::values::market_scope::MarketScope;
    use crate::domain::values::signal_metadata::Engagement;
    use chrono::Utc;

    struct SlowForSome;

    #[async_trait::async_trait]
    impl QuoteProvider for SlowForSome {
        fn name(&self) -> &str {
            "slow"
        }

        async fn snapshot(
            &self,
            _scope: MarketScope,
            symbol: &str,
        ) -> Result<Option<QuoteSnapshot>, DomainError> {
            if symbol == "000660" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(Some(QuoteSnapshot {
                symbol: symbol.to_string(),
                price: 100.0,
                volume_ratio: Some(2.4),
                price_vs_ma5_pct: Some(1.5),
                price_vs_ma20_pct: Some(4.0),
                foreign_net_buy: None,
                institution_net_buy: None,
                near_52w_high: Some(false),
                fetched_at: Utc::now(),
            }))
        }
    }

    fn signal(symbol: &str, scope: MarketScope) -> NormalizedSignal {
        NormalizedSignal {
            raw_id: format!("raw-{symbol}"),
            source: "dart".into(),
            scope,
            symbol: symbol.into(),
            text: String::new(),
            published_at: None,
            engagement: Engagement::new(),
            metadata: SignalMetadata::default(),
        }
    }

    #[tokio::test]
    async fn applies_resolved_and_skips_rest_at_deadline() {
        let enricher = MetadataEnricher::new(Arc::new(SlowForSome), 10, Duration::from_secs(10));
        let mut signals = vec![
            signal("005930", MarketScope::Kr),
            signal("000660", MarketScope::Kr),
            signal("AAPL", MarketScope::Us),
        ];
        signals[0].metadata.volume_ratio = Some(0.9);

        let deadline = Deadline::after(Duration::from_millis(150));
        let outcome = enricher.enrich(&mut signals, &deadline).await;

        assert_eq!(outcome.requested, 2);
        assert_eq!(outcome.resolved, 1);
        assert!(outcome.deadline_hit);
        // Gatherer value wins over the quote.
        assert_eq!(signals[0].metadata.volume_ratio, Some(0.9));
        assert_eq!(signals[0].metadata.price_vs_ma20_pct, Some(4.0));
        assert!(signals[1].metadata.volume_ratio.is_none());
        assert!(signals[2].metadata.volume_ratio.is_none());
    }
}
