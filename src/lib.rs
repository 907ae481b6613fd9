pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineParts, RunOptions};
use crate::config::PipelineConfig;
use crate::domain::entities::agent_run::AgentRun;
use crate::domain::entities::daily_report::DailyReport;
use crate::domain::entities::decision::Decision;
use crate::domain::error::DomainError;
use crate::domain::ports::quote_provider::QuoteProvider;
use crate::domain::ports::reasoning::ReasoningService;
use crate::domain::ports::run_lock::RunLock;
use crate::domain::ports::signal_repository::SignalRepository;
use crate::domain::ports::source_gatherer::SourceGatherer;
use crate::domain::ports::ticker_universe::TickerUniverse;
use crate::domain::values::market_scope::MarketScope;
use crate::infrastructure::gatherers::{default_gatherers, SourceCredentials};
use crate::infrastructure::quotes::cache::CachedQuoteProvider;
use crate::infrastructure::quotes::yahoo::YahooQuoteProvider;
use crate::infrastructure::reasoning::anthropic::AnthropicReasoner;
use crate::infrastructure::reasoning::noop::NoopReasoner;
use crate::infrastructure::reasoning::openai::OpenAiReasoner;
use crate::infrastructure::sqlite::run_lock::SqliteRunLock;
use crate::infrastructure::sqlite::signal_repo::SqliteSignalRepo;
use crate::infrastructure::universe::in_memory::InMemoryTickerUniverse;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::warn;

/// Everything except storage and locking, which are opened from the db path.
pub struct Components {
    pub gatherers: Vec<Arc<dyn SourceGatherer>>,
    pub universe: Arc<dyn TickerUniverse>,
    pub quotes: Arc<dyn QuoteProvider>,
    /// The first entry is the default reasoning provider.
    pub reasoners: Vec<Arc<dyn ReasoningService>>,
}

pub struct StockPulse {
    orchestrator: PipelineOrchestrator,
    repo: Arc<dyn SignalRepository>,
}

impl StockPulse {
    pub fn new(db_path: &str) -> Result<Self, DomainError> {
        let config = PipelineConfig::from_env();

        let universe = InMemoryTickerUniverse::new();
        if let Ok(path) = std::env::var("STOCKPULSE_UNIVERSE_PATH") {
            universe.load_json_file(&path)?;
        }

        let quotes: Arc<dyn QuoteProvider> = Arc::new(CachedQuoteProvider::new(
            Arc::new(YahooQuoteProvider::new()),
            config.quote_cache_ttl,
        ));

        let components = Components {
            gatherers: default_gatherers(&config, SourceCredentials::from_env()),
            universe: Arc::new(universe),
            quotes,
            reasoners: reasoners_from_env(),
        };
        Self::with_components(db_path, components, config)
    }

    pub fn with_components(
        db_path: &str,
        components: Components,
        config: PipelineConfig,
    ) -> Result<Self, DomainError> {
        let repo: Arc<dyn SignalRepository> =
            Arc::new(SqliteSignalRepo::new(infrastructure::sqlite::open(db_path)?));
        let lock: Arc<dyn RunLock> =
            Arc::new(SqliteRunLock::new(infrastructure::sqlite::open(db_path)?)?);

        let orchestrator = PipelineOrchestrator::new(
            PipelineParts {
                repo: repo.clone(),
                lock,
                gatherers: components.gatherers,
                universe: components.universe,
                quotes: components.quotes,
                reasoners: components.reasoners,
            },
            config,
        )?;
        Ok(Self { orchestrator, repo })
    }

    pub async fn run_pipeline(&self, options: RunOptions) -> PipelineOutcome {
        self.orchestrator.run(options).await
    }

    pub fn list_runs(&self, scope: MarketScope, limit: usize) -> Result<Vec<AgentRun>, DomainError> {
        self.repo.list_runs(scope, limit)
    }

    /// Report for `date`, or for today in the scope's market calendar.
    pub fn report(
        &self,
        scope: MarketScope,
        date: Option<NaiveDate>,
    ) -> Result<Option<DailyReport>, DomainError> {
        let date = date.unwrap_or_else(|| scope.report_date(Utc::now()));
        self.repo.get_report(date, scope)
    }

    pub fn decisions_for_run(&self, run_id: &str) -> Result<Vec<Decision>, DomainError> {
        self.repo.decisions_for_run(run_id)
    }
}

/// Providers with configured keys plus the noop fallback. The one named by
/// `STOCKPULSE_REASONING_PROVIDER` goes first.
fn reasoners_from_env() -> Vec<Arc<dyn ReasoningService>> {
    let key = |name: &str| std::env::var(name).ok().filter(|k| !k.trim().is_empty());

    let mut reasoners: Vec<Arc<dyn ReasoningService>> = Vec::new();
    if let Some(api_key) = key("STOCKPULSE_OPENAI_API_KEY") {
        reasoners.push(Arc::new(OpenAiReasoner::new(api_key, None)));
    }
    if let Some(api_key) = key("STOCKPULSE_ANTHROPIC_API_KEY") {
        reasoners.push(Arc::new(AnthropicReasoner::new(api_key, None)));
    }
    reasoners.push(Arc::new(NoopReasoner));

    if let Some(preferred) = key("STOCKPULSE_REASONING_PROVIDER") {
        match reasoners
            .iter()
            .position(|r| r.name().eq_ignore_ascii_case(preferred.trim()))
        {
            Some(pos) => reasoners[..=pos].rotate_right(1),
            None => warn!(
                provider = preferred.as_str(),
                "reasoning provider not configured, using {}",
                reasoners[0].name()
            ),
        }
    }
    reasoners
}
