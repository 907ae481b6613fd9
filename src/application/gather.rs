//! Gather coordinator: fans out to every applicable source gatherer, isolates
//! their failures and merges the batches.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::application::deadline::{Deadline, Elapsed};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

#[derive(Debug, Default, Serialize)]
pub struct GatherOutcome {
    pub signals: Vec<RawSignal>,
    /// Kept signals per source. Failed sources are present with 0.
    pub counts: BTreeMap<String, usize>,
    pub failed_sources: Vec<String>,
}

pub struct GatherCoordinator {
    gatherers: Vec<Arc<dyn SourceGatherer>>,
    max_items_per_source: usize,
    gatherer_timeout: Duration,
}

impl GatherCoordinator {
    pub fn new(
        gatherers: Vec<Arc<dyn SourceGatherer>>,
        max_items_per_source: usize,
        gatherer_timeout: Duration,
    ) -> Self {
        Self {
            gatherers,
            max_items_per_source,
            gatherer_timeout,
        }
    }

    /// Run every gatherer that supports `scope` concurrently.
    ///
    /// A gatherer that errors or times out contributes a count of 0 and no
    /// signals. Duplicates by `(source, external_id)` are dropped, first seen wins.
    pub async fn gather(
        &self,
        scope: MarketScope,
        target_symbol: Option<&str>,
        deadline: &Deadline,
    ) -> GatherOutcome {
        let request = GatherRequest {
            scope,
            target_symbol: target_symbol.map(str::to_string),
            max_items: self.max_items_per_source,
        };

        let applicable: Vec<&Arc<dyn SourceGatherer>> = self
            .gatherers
            .iter()
            .filter(|g| g.supports(scope))
            .collect();

        let runs = applicable.iter().map(|gatherer| {
            let request = &request;
            async move {
                let result = deadline
                    .race(self.gatherer_timeout, gatherer.gather(request))
                    .await;
                (gatherer.name().to_string(), result)
            }
        });
        let results = join_all(runs).await;

        let mut outcome = GatherOutcome::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (name, result) in results {
            let batch = match result {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    warn!(source = name.as_str(), error = %e, "gatherer failed, contributing nothing");
                    outcome.counts.entry(name.clone()).or_insert(0);
                    outcome.failed_sources.push(name);
                    continue;
                }
                Err(Elapsed::Call(limit)) => {
                    warn!(source = name.as_str(), timeout_ms = limit.as_millis() as u64, "gatherer timed out");
                    outcome.counts.entry(name.clone()).or_insert(0);
                    outcome.failed_sources.push(name);
                    continue;
                }
                Err(Elapsed::Deadline) => {
                    warn!(source = name.as_str(), "run deadline reached while gathering");
                    outcome.counts.entry(name.clone()).or_insert(0);
                    outcome.failed_sources.push(name);
                    continue;
                }
            };

            let mut kept = 0usize;
            for signal in batch.into_iter().take(self.max_items_per_source) {
                let key = (signal.source.clone(), signal.external_id.clone());
                if seen.insert(key) {
                    kept += 1;
                    outcome.signals.push(signal);
                }
            }
            *outcome.counts.entry(name).or_insert(0) += kept;
        }

        info!(
            scope = %scope,
            sources = applicable.len(),
            failed = outcome.failed_sources.len(),
            signals = outcome.signals.len(),
            "gather complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::GatherError;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        ids: Vec<&'static str>,
    }

    #[async_trait]
    impl SourceGatherer for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn supports(&self, _scope: MarketScope) -> bool {
            true
        }
        async fn gather(&self, _r: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
            Ok(self
                .ids
                .iter()
                .map(|id| RawSignal::new(self.name, *id).with_title("post"))
                .collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl SourceGatherer for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn supports(&self, _scope: MarketScope) -> bool {
            true
        }
        async fn gather(&self, _r: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
            Err(GatherError::Network("connection reset".into()))
        }
    }

    struct UsOnly;

    #[async_trait]
    impl SourceGatherer for UsOnly {
        fn name(&self) -> &str {
            "us_only"
        }
        fn supports(&self, scope: MarketScope) -> bool {
            scope == MarketScope::Us
        }
        async fn gather(&self, _r: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
            Ok(vec![RawSignal::new("us_only", "1")])
        }
    }

    #[tokio::test]
    async fn truncates_dedups_and_isolates_failures() {
        let coordinator = GatherCoordinator::new(
            vec![
                Arc::new(Fixed {
                    name: "alpha",
                    ids: vec!["1", "1", "2", "3", "4"],
                }),
                Arc::new(Broken),
                Arc::new(UsOnly),
            ],
            3,
            Duration::from_secs(5),
        );
        let deadline = Deadline::after(Duration::from_secs(5));
        let outcome = coordinator.gather(MarketScope::Kr, None, &deadline).await;

        // "1" twice inside the first three, so only two survive.
        assert_eq!(outcome.counts.get("alpha"), Some(&2));
        assert_eq!(outcome.counts.get("broken"), Some(&0));
        assert!(!outcome.counts.contains_key("us_only"));
        assert_eq!(outcome.failed_sources, vec!["broken".to_string()]);
        assert_eq!(outcome.signals.len(), 2);
    }
}
