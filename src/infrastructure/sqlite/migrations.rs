use crate::domain::error::DomainError;
use rusqlite::Connection;

/// Idempotent schema setup; safe to run on every start.
pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS raw_signals (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            external_id TEXT NOT NULL,
            symbol_candidates TEXT NOT NULL DEFAULT '[]',
            title TEXT,
            body TEXT,
            url TEXT,
            author TEXT,
            published_at TEXT,
            collected_at TEXT NOT NULL,
            engagement TEXT NOT NULL DEFAULT '{}',
            metadata TEXT NOT NULL DEFAULT '{}',
            UNIQUE(source, external_id)
        );

        CREATE TABLE IF NOT EXISTS scored_signals (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            raw_id TEXT NOT NULL,
            source TEXT NOT NULL,
            symbol TEXT NOT NULL,
            excerpt TEXT NOT NULL,
            sentiment_score REAL NOT NULL,
            freshness_score REAL NOT NULL,
            source_weight REAL NOT NULL,
            event_score REAL NOT NULL,
            final_score REAL NOT NULL,
            axes TEXT,
            gates TEXT,
            quant_multiplier REAL NOT NULL,
            reason_summary TEXT NOT NULL,
            scored_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS decisions (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            market_scope TEXT NOT NULL,
            symbol TEXT NOT NULL,
            verdict TEXT NOT NULL,
            confidence REAL NOT NULL,
            time_horizon TEXT NOT NULL,
            thesis_summary TEXT NOT NULL,
            entry_trigger TEXT NOT NULL,
            invalidation TEXT NOT NULL,
            risk_notes TEXT NOT NULL DEFAULT '[]',
            bull_case TEXT NOT NULL DEFAULT '[]',
            bear_case TEXT NOT NULL DEFAULT '[]',
            red_flags TEXT NOT NULL DEFAULT '[]',
            catalysts TEXT NOT NULL DEFAULT '[]',
            sources_used TEXT NOT NULL DEFAULT '[]',
            model TEXT NOT NULL,
            prompt_version TEXT NOT NULL,
            schema_version TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(run_id, symbol)
        );

        CREATE TABLE IF NOT EXISTS daily_reports (
            id TEXT PRIMARY KEY,
            report_date TEXT NOT NULL,
            market_scope TEXT NOT NULL,
            summary_markdown TEXT NOT NULL,
            top_buy_now TEXT NOT NULL DEFAULT '[]',
            top_watch TEXT NOT NULL DEFAULT '[]',
            themes TEXT NOT NULL DEFAULT '[]',
            risks TEXT NOT NULL DEFAULT '[]',
            flagged_decisions TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(report_date, market_scope)
        );

        CREATE TABLE IF NOT EXISTS agent_runs (
            id TEXT PRIMARY KEY,
            trigger_type TEXT NOT NULL,
            market_scope TEXT NOT NULL,
            strategy_key TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            status TEXT NOT NULL,
            gathered_counts TEXT NOT NULL DEFAULT '{}',
            raw_count INTEGER NOT NULL DEFAULT 0,
            scored_count INTEGER NOT NULL DEFAULT 0,
            decided_count INTEGER NOT NULL DEFAULT 0,
            llm_calls INTEGER NOT NULL DEFAULT 0,
            llm_tokens_estimated INTEGER NOT NULL DEFAULT 0,
            stage_timings_ms TEXT NOT NULL DEFAULT '{}',
            error_summary TEXT,
            report_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS run_locks (
            key TEXT PRIMARY KEY,
            token TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scored_run ON scored_signals(run_id);
        CREATE INDEX IF NOT EXISTS idx_scored_symbol ON scored_signals(symbol);
        CREATE INDEX IF NOT EXISTS idx_decisions_run ON decisions(run_id);
        CREATE INDEX IF NOT EXISTS idx_decisions_scope_created ON decisions(market_scope, created_at);
        CREATE INDEX IF NOT EXISTS idx_runs_scope_started ON agent_runs(market_scope, started_at);
        ",
    )
    .map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('raw_signals', 'scored_signals', 'decisions', 'daily_reports', 'agent_runs', 'run_locks')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
