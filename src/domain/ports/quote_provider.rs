use crate::domain::error::DomainError;
use crate::domain::values::market_scope::MarketScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quantitative snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    /// Last volume over the 20-period average volume.
    pub volume_ratio: Option<f64>,
    /// Percent distance of price from the 5-period moving average.
    pub price_vs_ma5_pct: Option<f64>,
    /// Percent distance of price from the 20-period moving average.
    pub price_vs_ma20_pct: Option<f64>,
    pub foreign_net_buy: Option<f64>,
    pub institution_net_buy: Option<f64>,
    pub near_52w_high: Option<bool>,
    pub fetched_at: DateTime<Utc>,
}

/// Quote collaborator used by the metadata enricher.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the symbol has no quote.
    async fn snapshot(
        &self,
        scope: MarketScope,
        symbol: &str,
    ) -> Result<Option<QuoteSnapshot>, DomainError>;
}
