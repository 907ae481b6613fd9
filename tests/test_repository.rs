mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::memory_repo;
use stockpulse::domain::entities::daily_report::DailyReport;
use stockpulse::domain::entities::decision::Decision;
use stockpulse::domain::entities::raw_signal::RawSignal;
use stockpulse::domain::entities::scored_signal::{AxisScores, ScoredSignal};
use stockpulse::domain::ports::signal_repository::SignalRepository;
use stockpulse::domain::values::confidence::Confidence;
use stockpulse::domain::values::market_scope::MarketScope;
use stockpulse::domain::values::verdict::{TimeHorizon, Verdict};

fn decision(run_id: &str, symbol: &str, confidence: f64) -> Decision {
    Decision {
        id: uuid::Uuid::new_v4().to_string(),
        run_id: run_id.into(),
        market_scope: MarketScope::Kr,
        symbol: symbol.into(),
        verdict: Verdict::Watch,
        confidence: Confidence::new(confidence).unwrap(),
        time_horizon: TimeHorizon::Swing,
        thesis_summary: "thesis".into(),
        entry_trigger: "trigger".into(),
        invalidation: "invalidation".into(),
        risk_notes: vec!["risk".into()],
        bull_case: vec![],
        bear_case: vec![],
        red_flags: vec![],
        catalysts: vec!["수주".into()],
        sources_used: vec!["s1".into()],
        model: "stub-model".into(),
        prompt_version: "p".into(),
        schema_version: "s".into(),
        created_at: Utc::now(),
    }
}

fn report(date: NaiveDate, summary: &str) -> DailyReport {
    DailyReport {
        id: uuid::Uuid::new_v4().to_string(),
        report_date: date,
        market_scope: MarketScope::Kr,
        summary_markdown: summary.into(),
        top_buy_now: vec![],
        top_watch: vec!["d1".into()],
        themes: vec!["수주".into()],
        risks: vec![],
        flagged_decisions: vec![],
        created_at: Utc::now(),
    }
}

#[test]
fn raw_upsert_is_idempotent_and_merges_metadata() {
    let repo = memory_repo();

    let mut first = RawSignal::new("dart", "20260302000123").with_title("[삼성전자] 공급계약");
    first.metadata.filing_type = Some("단일판매ㆍ공급계약체결".into());
    first.metadata.extra.insert("corp_cls".into(), serde_json::json!("Y"));
    let id = repo.upsert_raw_signal(&first).unwrap();

    let mut again = RawSignal::new("dart", "20260302000123").with_title("[삼성전자] 공급계약");
    again.metadata.volume_ratio = Some(2.5);
    again.engagement.insert("views".into(), 10.0);
    let second_id = repo.upsert_raw_signal(&again).unwrap();

    assert_eq!(id, second_id);
    assert_eq!(repo.count_raw_signals().unwrap(), 1);

    let stored = repo.get_raw_signal("dart", "20260302000123").unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.metadata.filing_type.as_deref(), Some("단일판매ㆍ공급계약체결"));
    assert_eq!(stored.metadata.volume_ratio, Some(2.5));
    assert_eq!(stored.metadata.extra.get("corp_cls"), Some(&serde_json::json!("Y")));
    assert_eq!(stored.engagement.get("views"), Some(&10.0));

    assert!(repo.get_raw_signal("dart", "missing").unwrap().is_none());
}

#[test]
fn same_external_id_from_different_sources_is_distinct() {
    let repo = memory_repo();
    repo.upsert_raw_signal(&RawSignal::new("reddit", "abc")).unwrap();
    repo.upsert_raw_signal(&RawSignal::new("stocktwits", "abc")).unwrap();
    assert_eq!(repo.count_raw_signals().unwrap(), 2);
}

#[test]
fn decisions_list_by_confidence_and_reject_duplicates() {
    let repo = memory_repo();
    repo.insert_decision(&decision("run-1", "000660", 0.4)).unwrap();
    repo.insert_decision(&decision("run-1", "005930", 0.7)).unwrap();
    repo.insert_decision(&decision("run-2", "005930", 0.9)).unwrap();

    let listed = repo.decisions_for_run("run-1").unwrap();
    let symbols: Vec<_> = listed.iter().map(|d| d.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["005930", "000660"]);
    assert_eq!(listed[0].catalysts, vec!["수주"]);

    assert!(repo.insert_decision(&decision("run-1", "005930", 0.5)).is_err());
}

#[test]
fn report_upsert_keeps_one_row_per_day_and_scope() {
    let repo = memory_repo();
    let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let id = repo.upsert_report(&report(date, "first")).unwrap();
    let again = repo.upsert_report(&report(date, "second")).unwrap();
    assert_eq!(id, again);

    let stored = repo.get_report(date, MarketScope::Kr).unwrap().unwrap();
    assert_eq!(stored.summary_markdown, "second");
    assert_eq!(stored.top_watch, vec!["d1"]);
    assert!(repo.get_report(date, MarketScope::Us).unwrap().is_none());
}

#[test]
fn decisions_between_covers_one_kst_day() {
    let repo = memory_repo();
    let date = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    let (start, end) = MarketScope::Kr.day_bounds(date);

    let mut before = decision("run-0", "035420", 0.5);
    before.created_at = start - Duration::seconds(1);
    let mut first = decision("run-1", "005930", 0.6);
    first.created_at = start;
    let mut later = decision("run-2", "000660", 0.6);
    later.created_at = Utc.with_ymd_and_hms(2026, 3, 3, 6, 0, 0).unwrap();
    let mut next_day = decision("run-3", "005930", 0.6);
    next_day.created_at = end;
    let mut other_scope = decision("run-2", "AAPL", 0.6);
    other_scope.market_scope = MarketScope::Us;
    other_scope.created_at = later.created_at;
    for d in [&before, &later, &first, &next_day, &other_scope] {
        repo.insert_decision(d).unwrap();
    }

    let day = repo.decisions_between(MarketScope::Kr, start, end).unwrap();
    let ids: Vec<_> = day.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), later.id.as_str()]);
}

#[test]
fn scored_signals_load_by_id() {
    let repo = memory_repo();
    let signal = ScoredSignal {
        id: "sc-1".into(),
        raw_id: "raw-1".into(),
        source: "dart".into(),
        symbol: "005930".into(),
        excerpt: "[삼성전자] 단일판매ㆍ공급계약체결".into(),
        sentiment_score: 0.4,
        freshness_score: 1.0,
        source_weight: 1.3,
        event_score: 0.8,
        final_score: 1.1,
        axes: Some(AxisScores {
            social: 0.2,
            event: 0.8,
            ..Default::default()
        }),
        gates: None,
        quant_multiplier: 0.95,
        reason_summary: "공시".into(),
        scored_at: Utc::now(),
    };
    repo.insert_scored_signal("run-1", &signal).unwrap();

    let found = repo
        .scored_signals_by_ids(&["sc-1".into(), "missing".into()])
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].excerpt, signal.excerpt);
    assert_eq!(found[0].axes.map(|a| a.event), Some(0.8));
    assert!(found[0].gates.is_none());
    assert!(repo.scored_signals_by_ids(&[]).unwrap().is_empty());
}
