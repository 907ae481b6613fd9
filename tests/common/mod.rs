//! Shared test helpers: stub collaborators and an in-memory orchestrator.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stockpulse::application::pipeline::{PipelineOrchestrator, PipelineParts};
use stockpulse::config::PipelineConfig;
use stockpulse::domain::entities::raw_signal::RawSignal;
use stockpulse::domain::error::{DomainError, GatherError};
use stockpulse::domain::ports::quote_provider::{QuoteProvider, QuoteSnapshot};
use stockpulse::domain::ports::reasoning::ReasoningService;
use stockpulse::domain::ports::run_lock::RunLock;
use stockpulse::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use stockpulse::domain::values::market_scope::MarketScope;
use stockpulse::infrastructure::memory_lock::InMemoryRunLock;
use stockpulse::infrastructure::sqlite::migrations::run_migrations;
use stockpulse::infrastructure::sqlite::signal_repo::SqliteSignalRepo;
use stockpulse::infrastructure::universe::in_memory::InMemoryTickerUniverse;

pub const BUY_NOW_ANSWER: &str = r#"{
    "verdict": "BUY_NOW",
    "confidence": 0.82,
    "time_horizon": "swing",
    "thesis_summary": "Supply contract lifts the earnings outlook.",
    "entry_trigger": "Break above the prior high on volume.",
    "invalidation": "Close below the 20-day average.",
    "risk_notes": ["Guidance could be revised."],
    "bull_case": ["Large contract"],
    "bear_case": ["Valuation stretched"],
    "red_flags": [],
    "catalysts": ["supply contract"]
}"#;

pub const WATCH_ANSWER: &str = r#"{
    "verdict": "WATCH",
    "confidence": 0.55,
    "time_horizon": "intraday",
    "thesis_summary": "Chatter without confirmation.",
    "entry_trigger": "Wait for a filing.",
    "invalidation": "Story fades.",
    "risk_notes": [],
    "bull_case": [],
    "bear_case": [],
    "catalysts": ["earnings"]
}"#;

/// Gatherer returning a fixed batch for one scope.
pub struct StubGatherer {
    pub name: &'static str,
    pub scope: MarketScope,
    pub signals: Vec<RawSignal>,
}

#[async_trait]
impl SourceGatherer for StubGatherer {
    fn name(&self) -> &str {
        self.name
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == self.scope
    }

    async fn gather(&self, _request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        Ok(self.signals.clone())
    }
}

/// Gatherer that always fails.
pub struct FailingGatherer;

#[async_trait]
impl SourceGatherer for FailingGatherer {
    fn name(&self) -> &str {
        "always_down"
    }

    fn supports(&self, _scope: MarketScope) -> bool {
        true
    }

    async fn gather(&self, _request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        Err(GatherError::Network("upstream unavailable".into()))
    }
}

/// Reasoner replying with a canned answer and counting calls.
pub struct StubReasoner {
    pub name: &'static str,
    pub answer: String,
    pub calls: AtomicUsize,
}

impl StubReasoner {
    pub fn new(name: &'static str, answer: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningService for StubReasoner {
    fn name(&self) -> &str {
        self.name
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }

    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
        _model: &str,
    ) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Quotes from a fixed table; unknown symbols have none.
#[derive(Default)]
pub struct StubQuotes {
    pub table: HashMap<String, QuoteSnapshot>,
}

#[async_trait]
impl QuoteProvider for StubQuotes {
    fn name(&self) -> &str {
        "stub"
    }

    async fn snapshot(
        &self,
        _scope: MarketScope,
        symbol: &str,
    ) -> Result<Option<QuoteSnapshot>, DomainError> {
        Ok(self.table.get(symbol).cloned())
    }
}

pub fn strong_quote(symbol: &str) -> QuoteSnapshot {
    QuoteSnapshot {
        symbol: symbol.to_string(),
        price: 71_000.0,
        volume_ratio: Some(3.2),
        price_vs_ma5_pct: Some(2.0),
        price_vs_ma20_pct: Some(6.5),
        foreign_net_buy: Some(1.5e10),
        institution_net_buy: Some(4.0e9),
        near_52w_high: Some(false),
        fetched_at: Utc::now(),
    }
}

pub fn dart_filing(id: &str, code: &str, corp: &str, report: &str) -> RawSignal {
    let mut signal = RawSignal::new("dart", id)
        .with_title(format!("[{corp}] {report}"))
        .with_candidates([code])
        .published(Utc::now());
    signal.metadata.filing_type = Some(report.to_string());
    signal
}

pub fn reddit_post(id: &str, title: &str) -> RawSignal {
    let mut signal = RawSignal::new("reddit", id).with_title(title).published(Utc::now());
    signal.metadata.community = Some("stocks".into());
    signal.engagement.insert("score".into(), 420.0);
    signal
}

pub fn memory_repo() -> Arc<SqliteSignalRepo> {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    Arc::new(SqliteSignalRepo::new(conn))
}

pub struct Harness {
    pub orchestrator: PipelineOrchestrator,
    pub repo: Arc<SqliteSignalRepo>,
}

pub struct HarnessBuilder {
    pub gatherers: Vec<Arc<dyn SourceGatherer>>,
    pub reasoners: Vec<Arc<dyn ReasoningService>>,
    pub universe: Arc<InMemoryTickerUniverse>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub lock: Arc<dyn RunLock>,
    pub config: PipelineConfig,
}

impl HarnessBuilder {
    pub fn new(reasoner: Arc<dyn ReasoningService>) -> Self {
        Self {
            gatherers: Vec::new(),
            reasoners: vec![reasoner],
            universe: Arc::new(InMemoryTickerUniverse::new()),
            quotes: Arc::new(StubQuotes::default()),
            lock: Arc::new(InMemoryRunLock::new()),
            config: PipelineConfig::default(),
        }
    }

    pub fn gatherer(mut self, gatherer: impl SourceGatherer + 'static) -> Self {
        self.gatherers.push(Arc::new(gatherer));
        self
    }

    pub fn build(self) -> Harness {
        let repo = memory_repo();
        let orchestrator = PipelineOrchestrator::new(
            PipelineParts {
                repo: repo.clone(),
                lock: self.lock,
                gatherers: self.gatherers,
                universe: self.universe,
                quotes: self.quotes,
                reasoners: self.reasoners,
            },
            self.config,
        )
        .unwrap();
        Harness { orchestrator, repo }
    }
}
