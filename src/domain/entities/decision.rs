use crate::domain::values::confidence::Confidence;
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::verdict::{TimeHorizon, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Research opinion for one symbol in one run. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub run_id: String,
    pub market_scope: MarketScope,
    pub symbol: String,
    pub verdict: Verdict,
    pub confidence: Confidence,
    pub time_horizon: TimeHorizon,
    pub thesis_summary: String,
    pub entry_trigger: String,
    pub invalidation: String,
    pub risk_notes: Vec<String>,
    pub bull_case: Vec<String>,
    pub bear_case: Vec<String>,
    pub red_flags: Vec<String>,
    pub catalysts: Vec<String>,
    /// Ids of the scored signals the decision was built from.
    pub sources_used: Vec<String>,
    pub model: String,
    pub prompt_version: String,
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
}
