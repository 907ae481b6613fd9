//! Pipeline orchestrator: owns the run lifecycle from throttle check to the
//! persisted run record.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::application::deadline::Deadline;
use crate::application::decide::Decider;
use crate::application::enrich::MetadataEnricher;
use crate::application::gather::GatherCoordinator;
use crate::application::normalize::{normalize_candidate, Normalizer};
use crate::application::report::{latest_per_symbol, ReportBuilder};
use crate::application::scoring::Scorer;
use crate::config::PipelineConfig;
use crate::domain::entities::agent_run::{AgentRun, LOCK_UNAVAILABLE, SKIPPED_TOO_SOON};
use crate::domain::error::DomainError;
use crate::domain::ports::quote_provider::QuoteProvider;
use crate::domain::ports::reasoning::ReasoningService;
use crate::domain::ports::run_lock::RunLock;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::source_gatherer::SourceGatherer;
use crate::domain::ports::ticker_universe::TickerUniverse;
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::run_status::{RunStatus, TriggerType};

pub const DEFAULT_STRATEGY: &str = "default";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub trigger_type: TriggerType,
    pub market_scope: MarketScope,
    pub strategy_key: String,
    /// Reasoning provider by name; unknown names fall back to the default.
    pub reasoning_provider: Option<String>,
    /// Restrict the run to one symbol. Gets the longer time budget.
    pub target_symbol: Option<String>,
    pub ignore_min_interval: bool,
}

impl RunOptions {
    pub fn new(market_scope: MarketScope) -> Self {
        Self {
            trigger_type: TriggerType::default(),
            market_scope,
            strategy_key: DEFAULT_STRATEGY.to_string(),
            reasoning_provider: None,
            target_symbol: None,
            ignore_min_interval: false,
        }
    }
}

/// What callers get back. Degraded outcomes are carried by `status` and
/// `error_summary`, never by an error.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub market_scope: MarketScope,
    pub strategy_key: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    pub raw_count: usize,
    pub scored_count: usize,
    pub decided_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

impl From<&AgentRun> for PipelineOutcome {
    fn from(run: &AgentRun) -> Self {
        Self {
            run_id: run.id.clone(),
            market_scope: run.market_scope,
            strategy_key: run.strategy_key.clone(),
            status: run.status,
            error_summary: run.error_summary.clone(),
            raw_count: run.raw_count,
            scored_count: run.scored_count,
            decided_count: run.decided_count,
            report_id: run.report_id.clone(),
        }
    }
}

/// Collaborators the orchestrator is assembled from.
pub struct PipelineParts {
    pub repo: Arc<dyn SignalRepository>,
    pub lock: Arc<dyn RunLock>,
    pub gatherers: Vec<Arc<dyn SourceGatherer>>,
    pub universe: Arc<dyn TickerUniverse>,
    pub quotes: Arc<dyn QuoteProvider>,
    /// The first entry is the default provider.
    pub reasoners: Vec<Arc<dyn ReasoningService>>,
}

pub struct PipelineOrchestrator {
    repo: Arc<dyn SignalRepository>,
    lock: Arc<dyn RunLock>,
    universe: Arc<dyn TickerUniverse>,
    reasoners: Vec<Arc<dyn ReasoningService>>,
    gather: GatherCoordinator,
    normalizer: Normalizer,
    enricher: MetadataEnricher,
    scorer: Scorer,
    reporter: ReportBuilder,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(parts: PipelineParts, config: PipelineConfig) -> Result<Self, DomainError> {
        if parts.reasoners.is_empty() {
            return Err(DomainError::InvalidInput(
                "at least one reasoning service is required".into(),
            ));
        }
        Ok(Self {
            gather: GatherCoordinator::new(
                parts.gatherers,
                config.max_items_per_source,
                config.gatherer_timeout,
            ),
            normalizer: Normalizer::new(parts.universe.clone()),
            enricher: MetadataEnricher::new(
                parts.quotes,
                config.enrich_max_symbols,
                config.quote_timeout,
            ),
            scorer: Scorer::new(&config),
            reporter: ReportBuilder::new(config.report_top_n, config.evidence_per_decision),
            repo: parts.repo,
            lock: parts.lock,
            universe: parts.universe,
            reasoners: parts.reasoners,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline once. Always records an [`AgentRun`] and never fails.
    pub async fn run(&self, options: RunOptions) -> PipelineOutcome {
        let scope = options.market_scope;
        let mut run = AgentRun::start(options.trigger_type, scope, options.strategy_key.clone());
        info!(
            run_id = run.id.as_str(),
            scope = %scope,
            trigger = %options.trigger_type,
            target = options.target_symbol.as_deref().unwrap_or("-"),
            "run started"
        );

        if !options.ignore_min_interval {
            match self.too_soon(scope) {
                Ok(true) => return self.finish_short(run, SKIPPED_TOO_SOON),
                Ok(false) => {}
                Err(e) => return self.finish(run, Err(e)),
            }
        }

        let single = options.target_symbol.is_some();
        let handle = match self.lock.acquire(&scope.lock_key(), self.config.lock_ttl(single)).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return self.finish_short(run, LOCK_UNAVAILABLE),
            Err(e) => return self.finish(run, Err(e)),
        };

        let deadline = Deadline::after(self.config.run_budget(single));
        let result = self.execute(&mut run, &options, &deadline).await;
        let outcome = self.finish(run, result);

        match self.lock.release(&handle).await {
            Ok(true) => debug!(key = handle.key.as_str(), "lock released"),
            Ok(false) => warn!(key = handle.key.as_str(), "lock was no longer held at release"),
            Err(e) => warn!(key = handle.key.as_str(), error = %e, "lock release failed"),
        }
        outcome
    }

    fn too_soon(&self, scope: MarketScope) -> Result<bool, DomainError> {
        let Some(previous) = self.repo.latest_run(scope)? else {
            return Ok(false);
        };
        let elapsed = (Utc::now() - previous.started_at).to_std().unwrap_or_default();
        Ok(elapsed < self.config.min_interval)
    }

    async fn execute(
        &self,
        run: &mut AgentRun,
        options: &RunOptions,
        deadline: &Deadline,
    ) -> Result<(), DomainError> {
        let scope = options.market_scope;
        let target = match options.target_symbol.as_deref() {
            Some(raw) => Some(normalize_candidate(scope, raw).ok_or_else(|| {
                DomainError::InvalidInput(format!("'{raw}' is not a valid {scope} symbol"))
            })?),
            None => None,
        };

        // gather
        deadline.check("gather")?;
        let started = Instant::now();
        let gathered = self.gather.gather(scope, target.as_deref(), deadline).await;
        record(run, "gather", started);
        run.gathered_counts = gathered.counts;
        let mut raw = gathered.signals;

        // raw-persist; partial gather output is kept even past the deadline
        let started = Instant::now();
        for signal in raw.iter_mut() {
            signal.id = self.repo.upsert_raw_signal(signal)?;
        }
        run.raw_count = raw.len();
        record(run, "raw_persist", started);
        deadline.check("gather")?;

        // normalize
        deadline.check("normalize")?;
        let started = Instant::now();
        let mut normalized = self.normalizer.normalize(scope, &raw, target.as_deref());
        record(run, "normalize", started);
        debug!(raw = raw.len(), normalized = normalized.len(), "normalized");

        // enrich
        if scope.has_quant_engine() {
            let started = Instant::now();
            let enriched = deadline
                .timebox("enrich", async {
                    Ok(self.enricher.enrich(&mut normalized, deadline).await)
                })
                .await?;
            record(run, "enrich", started);
            if enriched.deadline_hit {
                return Err(DomainError::TimeboxExceeded { stage: "enrich" });
            }
        }

        // score
        deadline.check("score")?;
        let started = Instant::now();
        let scored = self.scorer.score(&normalized, Utc::now());
        record(run, "score", started);

        // scored-persist
        let started = Instant::now();
        for signal in &scored {
            self.repo.insert_scored_signal(&run.id, signal)?;
        }
        run.scored_count = scored.len();
        record(run, "scored_persist", started);

        // decide, with a reserve kept back for persistence
        deadline.check("decide")?;
        let started = Instant::now();
        let decide_deadline = deadline.shortened_by(self.config.decide_reserve);
        let decider = Decider::new(
            self.reasoner_for(options.reasoning_provider.as_deref()),
            self.universe.clone(),
            &self.config,
        );
        let decided = decider.decide(&run.id, scope, &scored, &decide_deadline).await;
        run.llm_calls = decided.llm_calls;
        run.llm_tokens_estimated = decided.tokens_estimated;
        record(run, "decide", started);

        // decision-persist
        let started = Instant::now();
        for decision in &decided.decisions {
            self.repo.insert_decision(decision)?;
        }
        run.decided_count = decided.decisions.len();
        record(run, "decision_persist", started);

        // report
        if decided.decisions.is_empty() {
            info!(run_id = run.id.as_str(), "no decisions, report skipped");
        } else {
            deadline.check("report")?;
            let started = Instant::now();
            let now = Utc::now();
            let report_date = scope.report_date(now);
            let (day_start, day_end) = scope.day_bounds(report_date);
            // Earlier runs of the same day stay in the report.
            let day = latest_per_symbol(self.repo.decisions_between(scope, day_start, day_end)?);
            let evidence_ids: Vec<String> = day
                .iter()
                .flat_map(|d| d.sources_used.iter().cloned())
                .collect();
            let evidence = self.repo.scored_signals_by_ids(&evidence_ids)?;
            let report = self.reporter.build(scope, report_date, &day, &evidence, now);
            run.report_id = Some(self.repo.upsert_report(&report)?);
            record(run, "report", started);
        }

        if decided.deadline_hit {
            return Err(DomainError::TimeboxExceeded { stage: "decide" });
        }
        Ok(())
    }

    fn reasoner_for(&self, name: Option<&str>) -> Arc<dyn ReasoningService> {
        let default = &self.reasoners[0];
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return default.clone();
        };
        match self.reasoners.iter().find(|r| r.name().eq_ignore_ascii_case(name)) {
            Some(reasoner) => reasoner.clone(),
            None => {
                warn!(
                    requested = name,
                    fallback = default.name(),
                    "unknown reasoning provider, using default"
                );
                default.clone()
            }
        }
    }

    fn finish_short(&self, mut run: AgentRun, reason: &'static str) -> PipelineOutcome {
        info!(run_id = run.id.as_str(), scope = %run.market_scope, reason, "run short-circuited");
        run.status = RunStatus::Partial;
        run.error_summary = Some(reason.to_string());
        run.finished_at = Some(Utc::now());
        self.persist_run(&run);
        PipelineOutcome::from(&run)
    }

    /// Classify the result, stamp the run and write the record.
    fn finish(&self, mut run: AgentRun, result: Result<(), DomainError>) -> PipelineOutcome {
        match result {
            Ok(()) => run.status = RunStatus::Success,
            Err(e) if e.is_timebox() => {
                warn!(run_id = run.id.as_str(), error = %e, "run exceeded its time budget");
                run.status = RunStatus::Partial;
                run.error_summary = Some(e.to_string());
            }
            Err(e) => {
                error!(run_id = run.id.as_str(), error = %e, "run failed");
                run.status = RunStatus::Failed;
                run.error_summary = Some(e.to_string());
            }
        }
        run.finished_at = Some(Utc::now());
        self.persist_run(&run);

        info!(
            run_id = run.id.as_str(),
            scope = %run.market_scope,
            status = %run.status,
            raw = run.raw_count,
            scored = run.scored_count,
            decided = run.decided_count,
            llm_calls = run.llm_calls,
            "run finished"
        );
        PipelineOutcome::from(&run)
    }

    fn persist_run(&self, run: &AgentRun) {
        if let Err(e) = self.repo.insert_run(run) {
            error!(run_id = run.id.as_str(), error = %e, "failed to record run");
        }
    }
}

fn record(run: &mut AgentRun, stage: &str, started: Instant) {
    let elapsed = started.elapsed().as_millis() as u64;
    *run.stage_timings_ms.entry(stage.to_string()).or_insert(0) += elapsed;
}

