use crate::domain::entities::agent_run::AgentRun;
use crate::domain::entities::daily_report::DailyReport;
use crate::domain::entities::decision::Decision;
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::entities::scored_signal::ScoredSignal;
use crate::domain::error::DomainError;
use crate::domain::values::market_scope::MarketScope;
use chrono::{DateTime, NaiveDate, Utc};

/// Persistence contract consumed by the pipeline.
pub trait SignalRepository: Send + Sync {
    /// Insert keyed by `(source, external_id)`. On conflict the stored metadata
    /// is merge-patched with the incoming one. Returns the stored row id.
    fn upsert_raw_signal(&self, signal: &RawSignal) -> Result<String, DomainError>;
    fn get_raw_signal(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<RawSignal>, DomainError>;
    fn count_raw_signals(&self) -> Result<usize, DomainError>;

    fn insert_scored_signal(&self, run_id: &str, signal: &ScoredSignal) -> Result<(), DomainError>;
    /// Scored signals with the given ids. Unknown ids are ignored.
    fn scored_signals_by_ids(&self, ids: &[String]) -> Result<Vec<ScoredSignal>, DomainError>;

    fn insert_decision(&self, decision: &Decision) -> Result<(), DomainError>;
    fn decisions_for_run(&self, run_id: &str) -> Result<Vec<Decision>, DomainError>;
    /// Decisions for `scope` created in `[from, until)`, oldest first.
    fn decisions_between(
        &self,
        scope: MarketScope,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Decision>, DomainError>;

    /// Keyed by `(report_date, market_scope)`. Returns the id of the stored row,
    /// which stays stable across upserts.
    fn upsert_report(&self, report: &DailyReport) -> Result<String, DomainError>;
    fn get_report(
        &self,
        date: NaiveDate,
        scope: MarketScope,
    ) -> Result<Option<DailyReport>, DomainError>;

    fn insert_run(&self, run: &AgentRun) -> Result<(), DomainError>;
    /// Most recent run for `scope` that actually executed stages. Runs that were
    /// short-circuited by throttling or lock contention are ignored.
    fn latest_run(&self, scope: MarketScope) -> Result<Option<AgentRun>, DomainError>;
    fn list_runs(&self, scope: MarketScope, limit: usize) -> Result<Vec<AgentRun>, DomainError>;
}
