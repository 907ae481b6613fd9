use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::run_status::{RunStatus, TriggerType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SKIPPED_TOO_SOON: &str = "run_skipped_too_soon";
pub const LOCK_UNAVAILABLE: &str = "lock_unavailable";

/// Append-only audit record of one orchestrator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: String,
    pub trigger_type: TriggerType,
    pub market_scope: MarketScope,
    pub strategy_key: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Signals kept per source after truncation and dedup.
    pub gathered_counts: BTreeMap<String, usize>,
    pub raw_count: usize,
    pub scored_count: usize,
    pub decided_count: usize,
    pub llm_calls: u32,
    pub llm_tokens_estimated: u64,
    pub stage_timings_ms: BTreeMap<String, u64>,
    pub error_summary: Option<String>,
    pub report_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AgentRun {
    pub fn start(
        trigger_type: TriggerType,
        market_scope: MarketScope,
        strategy_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            trigger_type,
            market_scope,
            strategy_key: strategy_key.into(),
            started_at: now,
            finished_at: None,
            status: RunStatus::Success,
            gathered_counts: BTreeMap::new(),
            raw_count: 0,
            scored_count: 0,
            decided_count: 0,
            llm_calls: 0,
            llm_tokens_estimated: 0,
            stage_timings_ms: BTreeMap::new(),
            error_summary: None,
            report_id: None,
            created_at: now,
        }
    }

    /// Short-circuited before any stage ran (throttle or lock contention).
    pub fn was_short_circuited(&self) -> bool {
        matches!(
            self.error_summary.as_deref(),
            Some(SKIPPED_TOO_SOON) | Some(LOCK_UNAVAILABLE)
        )
    }
}
