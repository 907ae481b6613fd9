use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::values::market_scope::MarketScope;
use async_trait::async_trait;

/// What the coordinator asks each gatherer for.
#[derive(Debug, Clone)]
pub struct GatherRequest {
    pub scope: MarketScope,
    /// Set for single-symbol on-demand runs.
    pub target_symbol: Option<String>,
    /// Gatherers may stop early once they have this many items.
    pub max_items: usize,
}

/// One external source. Handles its own retries and returns a finite batch.
#[async_trait]
pub trait SourceGatherer: Send + Sync {
    /// Source name; part of every produced signal's identity.
    fn name(&self) -> &str;

    fn supports(&self, scope: MarketScope) -> bool;

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError>;
}
