use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::signal_metadata::{Engagement, SignalMetadata};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A raw signal scoped to one symbol. Lives only for the duration of a run.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedSignal {
    pub raw_id: String,
    pub source: String,
    pub scope: MarketScope,
    pub symbol: String,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: Engagement,
    pub metadata: SignalMetadata,
}
