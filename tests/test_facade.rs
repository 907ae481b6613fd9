//! The library facade wired the way the binary wires it, minus the network.

mod common;

use common::*;
use std::sync::Arc;
use stockpulse::application::pipeline::RunOptions;
use stockpulse::config::PipelineConfig;
use stockpulse::domain::values::market_scope::MarketScope;
use stockpulse::domain::values::run_status::RunStatus;
use stockpulse::infrastructure::universe::in_memory::InMemoryTickerUniverse;
use stockpulse::{Components, StockPulse};

#[tokio::test]
async fn facade_runs_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pulse.db");
    let components = Components {
        gatherers: vec![Arc::new(StubGatherer {
            name: "dart",
            scope: MarketScope::Kr,
            signals: vec![dart_filing("r1", "005930", "삼성전자", "단일판매ㆍ공급계약체결")],
        })],
        universe: Arc::new(InMemoryTickerUniverse::new()),
        quotes: Arc::new(StubQuotes::default()),
        reasoners: vec![StubReasoner::new("stub", WATCH_ANSWER)],
    };
    let sp = StockPulse::with_components(db.to_str().unwrap(), components, PipelineConfig::default())
        .unwrap();

    let outcome = sp.run_pipeline(RunOptions::new(MarketScope::Kr)).await;
    assert_eq!(outcome.status, RunStatus::Success, "{:?}", outcome.error_summary);

    let runs = sp.list_runs(MarketScope::Kr, 5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, outcome.run_id);

    let decisions = sp.decisions_for_run(&outcome.run_id).unwrap();
    assert_eq!(decisions.len(), 1);

    let report = sp.report(MarketScope::Kr, None).unwrap().unwrap();
    assert_eq!(Some(report.id), outcome.report_id);
    assert!(sp.report(MarketScope::Us, None).unwrap().is_none());
}

#[test]
fn construction_requires_a_reasoner() {
    let components = Components {
        gatherers: vec![],
        universe: Arc::new(InMemoryTickerUniverse::new()),
        quotes: Arc::new(StubQuotes::default()),
        reasoners: vec![],
    };
    assert!(StockPulse::with_components(":memory:", components, PipelineConfig::default()).is_err());
}
