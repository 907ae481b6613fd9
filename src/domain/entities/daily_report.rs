use crate::domain::values::market_scope::MarketScope;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One narrative report per `(report_date, market_scope)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: String,
    pub report_date: NaiveDate,
    pub market_scope: MarketScope,
    pub summary_markdown: String,
    /// Decision ids, highest confidence first.
    pub top_buy_now: Vec<String>,
    pub top_watch: Vec<String>,
    pub themes: Vec<String>,
    pub risks: Vec<String>,
    /// Decision ids whose thesis was a placeholder.
    pub flagged_decisions: Vec<String>,
    pub created_at: DateTime<Utc>,
}
