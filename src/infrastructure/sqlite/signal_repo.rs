use crate::domain::entities::agent_run::{AgentRun, LOCK_UNAVAILABLE, SKIPPED_TOO_SOON};
use crate::domain::entities::daily_report::DailyReport;
use crate::domain::entities::decision::Decision;
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::entities::scored_signal::ScoredSignal;
use crate::domain::error::DomainError;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::values::confidence::Confidence;
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::signal_metadata::SignalMetadata;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::sync::Mutex;

const RAW_COLS: &str = "id, source, external_id, symbol_candidates, title, body, url, author, published_at, collected_at, engagement, metadata";
const DECISION_COLS: &str = "id, run_id, market_scope, symbol, verdict, confidence, time_horizon, thesis_summary, entry_trigger, invalidation, risk_notes, bull_case, bear_case, red_flags, catalysts, sources_used, model, prompt_version, schema_version, created_at";
const SCORED_COLS: &str = "id, raw_id, source, symbol, excerpt, sentiment_score, freshness_score, source_weight, event_score, final_score, axes, gates, quant_multiplier, reason_summary, scored_at";
const REPORT_COLS: &str = "id, report_date, market_scope, summary_markdown, top_buy_now, top_watch, themes, risks, flagged_decisions, created_at";
const RUN_COLS: &str = "id, trigger_type, market_scope, strategy_key, started_at, finished_at, status, gathered_counts, raw_count, scored_count, decided_count, llm_calls, llm_tokens_estimated, stage_timings_ms, error_summary, report_id, created_at";

/// Ids per `IN (...)` query, below SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

pub struct SqliteSignalRepo {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn json_col<T: DeserializeOwned + Default>(s: &str) -> T {
    serde_json::from_str(s).unwrap_or_default()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DomainError> {
    Ok(serde_json::to_string(value)?)
}

/// Map an enum column through `FromStr`, surfacing bad rows as conversion errors.
fn enum_col<T: std::str::FromStr<Err = String>>(idx: usize, s: String) -> Result<T, rusqlite::Error> {
    s.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })
}

impl SqliteSignalRepo {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DomainError> {
        self.conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))
    }

    fn row_to_raw(row: &rusqlite::Row) -> Result<RawSignal, rusqlite::Error> {
        let candidates: String = row.get(3)?;
        let published: Option<String> = row.get(8)?;
        let collected: String = row.get(9)?;
        let engagement: String = row.get(10)?;
        let metadata: String = row.get(11)?;
        Ok(RawSignal {
            id: row.get(0)?,
            source: row.get(1)?,
            external_id: row.get(2)?,
            symbol_candidates: json_col(&candidates),
            title: row.get(4)?,
            body: row.get(5)?,
            url: row.get(6)?,
            author: row.get(7)?,
            published_at: published.as_deref().map(parse_ts),
            collected_at: parse_ts(&collected),
            engagement: json_col(&engagement),
            metadata: json_col(&metadata),
        })
    }

    fn row_to_scored(row: &rusqlite::Row) -> Result<ScoredSignal, rusqlite::Error> {
        let axes: Option<String> = row.get(10)?;
        let gates: Option<String> = row.get(11)?;
        let scored: String = row.get(14)?;
        Ok(ScoredSignal {
            id: row.get(0)?,
            raw_id: row.get(1)?,
            source: row.get(2)?,
            symbol: row.get(3)?,
            excerpt: row.get(4)?,
            sentiment_score: row.get(5)?,
            freshness_score: row.get(6)?,
            source_weight: row.get(7)?,
            event_score: row.get(8)?,
            final_score: row.get(9)?,
            axes: axes.and_then(|a| serde_json::from_str(&a).ok()),
            gates: gates.and_then(|g| serde_json::from_str(&g).ok()),
            quant_multiplier: row.get(12)?,
            reason_summary: row.get(13)?,
            scored_at: parse_ts(&scored),
        })
    }

    fn row_to_decision(row: &rusqlite::Row) -> Result<Decision, rusqlite::Error> {
        let confidence: f64 = row.get(5)?;
        let created: String = row.get(19)?;
        Ok(Decision {
            id: row.get(0)?,
            run_id: row.get(1)?,
            market_scope: enum_col(2, row.get(2)?)?,
            symbol: row.get(3)?,
            verdict: enum_col(4, row.get(4)?)?,
            confidence: Confidence::new(confidence.clamp(0.0, 1.0))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Real, e.into()))?,
            time_horizon: enum_col(6, row.get(6)?)?,
            thesis_summary: row.get(7)?,
            entry_trigger: row.get(8)?,
            invalidation: row.get(9)?,
            risk_notes: json_col(&row.get::<_, String>(10)?),
            bull_case: json_col(&row.get::<_, String>(11)?),
            bear_case: json_col(&row.get::<_, String>(12)?),
            red_flags: json_col(&row.get::<_, String>(13)?),
            catalysts: json_col(&row.get::<_, String>(14)?),
            sources_used: json_col(&row.get::<_, String>(15)?),
            model: row.get(16)?,
            prompt_version: row.get(17)?,
            schema_version: row.get(18)?,
            created_at: parse_ts(&created),
        })
    }

    fn row_to_report(row: &rusqlite::Row) -> Result<DailyReport, rusqlite::Error> {
        let date: String = row.get(1)?;
        let created: String = row.get(9)?;
        Ok(DailyReport {
            id: row.get(0)?,
            report_date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?,
            market_scope: enum_col(2, row.get(2)?)?,
            summary_markdown: row.get(3)?,
            top_buy_now: json_col(&row.get::<_, String>(4)?),
            top_watch: json_col(&row.get::<_, String>(5)?),
            themes: json_col(&row.get::<_, String>(6)?),
            risks: json_col(&row.get::<_, String>(7)?),
            flagged_decisions: json_col(&row.get::<_, String>(8)?),
            created_at: parse_ts(&created),
        })
    }

    fn row_to_run(row: &rusqlite::Row) -> Result<AgentRun, rusqlite::Error> {
        let started: String = row.get(4)?;
        let finished: Option<String> = row.get(5)?;
        let created: String = row.get(16)?;
        Ok(AgentRun {
            id: row.get(0)?,
            trigger_type: enum_col(1, row.get(1)?)?,
            market_scope: enum_col(2, row.get(2)?)?,
            strategy_key: row.get(3)?,
            started_at: parse_ts(&started),
            finished_at: finished.as_deref().map(parse_ts),
            status: enum_col(6, row.get(6)?)?,
            gathered_counts: json_col(&row.get::<_, String>(7)?),
            raw_count: row.get::<_, i64>(8)? as usize,
            scored_count: row.get::<_, i64>(9)? as usize,
            decided_count: row.get::<_, i64>(10)? as usize,
            llm_calls: row.get::<_, i64>(11)? as u32,
            llm_tokens_estimated: row.get::<_, i64>(12)? as u64,
            stage_timings_ms: json_col(&row.get::<_, String>(13)?),
            error_summary: row.get(14)?,
            report_id: row.get(15)?,
            created_at: parse_ts(&created),
        })
    }
}

impl SignalRepository for SqliteSignalRepo {
    fn upsert_raw_signal(&self, signal: &RawSignal) -> Result<String, DomainError> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                &format!(
                    "INSERT INTO raw_signals ({RAW_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(source, external_id) DO NOTHING"
                ),
                params![
                    signal.id,
                    signal.source,
                    signal.external_id,
                    to_json(&signal.symbol_candidates)?,
                    signal.title,
                    signal.body,
                    signal.url,
                    signal.author,
                    signal.published_at.as_ref().map(ts),
                    ts(&signal.collected_at),
                    to_json(&signal.engagement)?,
                    to_json(&signal.metadata)?,
                ],
            )
            .map_err(|e| DomainError::Database(format!("Failed to insert raw signal: {e}")))?;
        if inserted > 0 {
            return Ok(signal.id.clone());
        }

        // Re-collected: merge-patch metadata, refresh engagement and collection time.
        let (id, stored_meta): (String, String) = conn.query_row(
            "SELECT id, metadata FROM raw_signals WHERE source = ?1 AND external_id = ?2",
            params![signal.source, signal.external_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let mut metadata: SignalMetadata = json_col(&stored_meta);
        metadata.merge_patch(&signal.metadata);
        conn.execute(
            "UPDATE raw_signals SET metadata = ?1, engagement = ?2, collected_at = ?3 WHERE id = ?4",
            params![
                to_json(&metadata)?,
                to_json(&signal.engagement)?,
                ts(&signal.collected_at),
                id
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to merge raw signal: {e}")))?;
        Ok(id)
    }

    fn get_raw_signal(&self, source: &str, external_id: &str) -> Result<Option<RawSignal>, DomainError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!("SELECT {RAW_COLS} FROM raw_signals WHERE source = ?1 AND external_id = ?2"),
                params![source, external_id],
                Self::row_to_raw,
            )
            .optional()?;
        Ok(found)
    }

    fn count_raw_signals(&self) -> Result<usize, DomainError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM raw_signals", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn insert_scored_signal(&self, run_id: &str, signal: &ScoredSignal) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scored_signals (id, run_id, raw_id, source, symbol, excerpt, sentiment_score, freshness_score, source_weight, event_score, final_score, axes, gates, quant_multiplier, reason_summary, scored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                signal.id,
                run_id,
                signal.raw_id,
                signal.source,
                signal.symbol,
                signal.excerpt,
                signal.sentiment_score,
                signal.freshness_score,
                signal.source_weight,
                signal.event_score,
                signal.final_score,
                signal.axes.as_ref().map(to_json).transpose()?,
                signal.gates.as_ref().map(to_json).transpose()?,
                signal.quant_multiplier,
                signal.reason_summary,
                ts(&signal.scored_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to insert scored signal: {e}")))?;
        Ok(())
    }

    fn scored_signals_by_ids(&self, ids: &[String]) -> Result<Vec<ScoredSignal>, DomainError> {
        let conn = self.conn()?;
        let mut found = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCORED_COLS} FROM scored_signals WHERE id IN ({placeholders})"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), Self::row_to_scored)?
                .collect::<Result<Vec<_>, _>>()?;
            found.extend(rows);
        }
        Ok(found)
    }

    fn insert_decision(&self, d: &Decision) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO decisions ({DECISION_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
            ),
            params![
                d.id,
                d.run_id,
                d.market_scope.as_str(),
                d.symbol,
                d.verdict.to_string(),
                d.confidence.value(),
                d.time_horizon.to_string(),
                d.thesis_summary,
                d.entry_trigger,
                d.invalidation,
                to_json(&d.risk_notes)?,
                to_json(&d.bull_case)?,
                to_json(&d.bear_case)?,
                to_json(&d.red_flags)?,
                to_json(&d.catalysts)?,
                to_json(&d.sources_used)?,
                d.model,
                d.prompt_version,
                d.schema_version,
                ts(&d.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to insert decision: {e}")))?;
        Ok(())
    }

    fn decisions_for_run(&self, run_id: &str) -> Result<Vec<Decision>, DomainError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLS} FROM decisions WHERE run_id = ?1 ORDER BY confidence DESC, symbol ASC"
        ))?;
        let decisions = stmt
            .query_map(params![run_id], Self::row_to_decision)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    fn decisions_between(
        &self,
        scope: MarketScope,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Decision>, DomainError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLS} FROM decisions
             WHERE market_scope = ?1 AND created_at >= ?2 AND created_at < ?3
             ORDER BY created_at ASC"
        ))?;
        let decisions = stmt
            .query_map(params![scope.as_str(), ts(&from), ts(&until)], Self::row_to_decision)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    fn upsert_report(&self, report: &DailyReport) -> Result<String, DomainError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO daily_reports ({REPORT_COLS}, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(report_date, market_scope) DO UPDATE SET
                    summary_markdown = excluded.summary_markdown,
                    top_buy_now = excluded.top_buy_now,
                    top_watch = excluded.top_watch,
                    themes = excluded.themes,
                    risks = excluded.risks,
                    flagged_decisions = excluded.flagged_decisions,
                    updated_at = excluded.updated_at"
            ),
            params![
                report.id,
                report.report_date.format("%Y-%m-%d").to_string(),
                report.market_scope.as_str(),
                report.summary_markdown,
                to_json(&report.top_buy_now)?,
                to_json(&report.top_watch)?,
                to_json(&report.themes)?,
                to_json(&report.risks)?,
                to_json(&report.flagged_decisions)?,
                ts(&report.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to upsert report: {e}")))?;
        let id: String = conn.query_row(
            "SELECT id FROM daily_reports WHERE report_date = ?1 AND market_scope = ?2",
            params![
                report.report_date.format("%Y-%m-%d").to_string(),
                report.market_scope.as_str()
            ],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn get_report(&self, date: NaiveDate, scope: MarketScope) -> Result<Option<DailyReport>, DomainError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {REPORT_COLS} FROM daily_reports WHERE report_date = ?1 AND market_scope = ?2"
                ),
                params![date.format("%Y-%m-%d").to_string(), scope.as_str()],
                Self::row_to_report,
            )
            .optional()?;
        Ok(found)
    }

    fn insert_run(&self, run: &AgentRun) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO agent_runs ({RUN_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                run.id,
                run.trigger_type.to_string(),
                run.market_scope.as_str(),
                run.strategy_key,
                ts(&run.started_at),
                run.finished_at.as_ref().map(ts),
                run.status.to_string(),
                to_json(&run.gathered_counts)?,
                run.raw_count as i64,
                run.scored_count as i64,
                run.decided_count as i64,
                run.llm_calls as i64,
                run.llm_tokens_estimated as i64,
                to_json(&run.stage_timings_ms)?,
                run.error_summary,
                run.report_id,
                ts(&run.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to insert run: {e}")))?;
        Ok(())
    }

    fn latest_run(&self, scope: MarketScope) -> Result<Option<AgentRun>, DomainError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLS} FROM agent_runs
                     WHERE market_scope = ?1 AND (error_summary IS NULL OR error_summary NOT IN (?2, ?3))
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![scope.as_str(), SKIPPED_TOO_SOON, LOCK_UNAVAILABLE],
                Self::row_to_run,
            )
            .optional()?;
        Ok(found)
    }

    fn list_runs(&self, scope: MarketScope, limit: usize) -> Result<Vec<AgentRun>, DomainError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLS} FROM agent_runs WHERE market_scope = ?1 ORDER BY started_at DESC LIMIT ?2"
        ))?;
        let runs = stmt
            .query_map(params![scope.as_str(), limit as i64], Self::row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::run_status::{RunStatus, TriggerType};
    use crate::infrastructure::sqlite::migrations::run_migrations;
    use chrono::Duration;

    fn repo() -> SqliteSignalRepo {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        SqliteSignalRepo::new(conn)
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc::now();
        let late = early + Duration::milliseconds(1500);
        assert!(ts(&early) < ts(&late));
        assert_eq!(ts(&early).len(), ts(&late).len());
    }

    #[test]
    fn latest_run_skips_short_circuited() {
        let repo = repo();
        let mut real = AgentRun::start(TriggerType::Scheduled, MarketScope::Kr, "default");
        real.started_at = Utc::now() - Duration::minutes(30);
        repo.insert_run(&real).unwrap();

        let mut skipped = AgentRun::start(TriggerType::Scheduled, MarketScope::Kr, "default");
        skipped.status = RunStatus::Partial;
        skipped.error_summary = Some(SKIPPED_TOO_SOON.into());
        repo.insert_run(&skipped).unwrap();

        let latest = repo.latest_run(MarketScope::Kr).unwrap().unwrap();
        assert_eq!(latest.id, real.id);
        assert!(repo.latest_run(MarketScope::Us).unwrap().is_none());
        assert_eq!(repo.list_runs(MarketScope::Kr, 10).unwrap().len(), 2);
    }
}
