//! Decider: turns the top-scored signals into one validated decision per
//! symbol.

pub mod prompt;
pub mod safety_gate;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::deadline::{Deadline, Elapsed};
use crate::config::PipelineConfig;
use crate::domain::entities::decision::Decision;
use crate::domain::entities::scored_signal::{QuantThresholds, ScoredSignal};
use crate::domain::ports::reasoning::ReasoningService;
use crate::domain::ports::ticker_universe::TickerUniverse;
use crate::domain::values::market_scope::MarketScope;

use self::prompt::{estimate_tokens, Prompt, PROMPT_VERSION};
use self::safety_gate::QuantRollup;
use self::schema::{parse_payload, DecisionPayload, SCHEMA_VERSION};

/// One fresh retry after an invalid answer.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Default, Serialize)]
pub struct DecideOutcome {
    pub decisions: Vec<Decision>,
    pub llm_calls: u32,
    pub tokens_estimated: u64,
    /// Symbols whose answer never validated.
    pub skipped_symbols: Vec<String>,
    /// Decisions forced from BUY_NOW to WATCH.
    pub downgraded: usize,
    /// The decide sub-deadline passed before every group was handled.
    pub deadline_hit: bool,
}

pub struct Decider {
    reasoner: Arc<dyn ReasoningService>,
    universe: Arc<dyn TickerUniverse>,
    model: String,
    max_tokens: u32,
    reasoning_timeout: Duration,
    signal_limit: usize,
    max_calls: usize,
    thresholds: QuantThresholds,
}

impl Decider {
    pub fn new(
        reasoner: Arc<dyn ReasoningService>,
        universe: Arc<dyn TickerUniverse>,
        config: &PipelineConfig,
    ) -> Self {
        let model = config
            .model_override
            .clone()
            .unwrap_or_else(|| reasoner.default_model().to_string());
        Self {
            reasoner,
            universe,
            model,
            max_tokens: config.max_tokens,
            reasoning_timeout: config.reasoning_timeout,
            signal_limit: config.decide_limit.min(config.llm_signal_limit),
            max_calls: config.max_llm_calls_per_run,
            thresholds: config.thresholds,
        }
    }

    /// Top signals grouped by symbol, best group first. Every group needs at
    /// least one call, so at most `max_calls` groups are kept.
    pub fn select_groups<'a>(&self, scored: &'a [ScoredSignal]) -> Vec<(String, Vec<&'a ScoredSignal>)> {
        let mut ranked: Vec<&ScoredSignal> = scored.iter().collect();
        ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        ranked.truncate(self.signal_limit);

        let mut groups: Vec<(String, Vec<&ScoredSignal>)> = Vec::new();
        for signal in ranked {
            match groups.iter_mut().find(|(symbol, _)| *symbol == signal.symbol) {
                Some((_, members)) => members.push(signal),
                None => groups.push((signal.symbol.clone(), vec![signal])),
            }
        }
        groups.truncate(self.max_calls);
        groups
    }

    pub async fn decide(
        &self,
        run_id: &str,
        scope: MarketScope,
        scored: &[ScoredSignal],
        deadline: &Deadline,
    ) -> DecideOutcome {
        let mut outcome = DecideOutcome::default();

        for (symbol, group) in self.select_groups(scored) {
            if deadline.is_expired() {
                warn!(symbol = symbol.as_str(), "decide deadline passed, skipping remaining symbols");
                outcome.deadline_hit = true;
                break;
            }
            if self.budget_spent(&outcome) {
                warn!(
                    symbol = symbol.as_str(),
                    max_calls = self.max_calls,
                    "reasoning call budget spent, skipping remaining symbols"
                );
                break;
            }

            let rollup = QuantRollup::from_group(&group, &self.thresholds);
            let name = self.universe.name_for(scope, &symbol);
            let prompt = prompt::build(scope, &symbol, name.as_deref(), &group, rollup.as_ref());

            let Some(payload) = self.ask(&symbol, &prompt, deadline, &mut outcome).await else {
                if !outcome.deadline_hit {
                    outcome.skipped_symbols.push(symbol);
                }
                continue;
            };

            let mut decision = self.to_decision(run_id, scope, &symbol, &group, payload);
            let reasons = safety_gate::enforce(&mut decision, rollup.as_ref(), &self.thresholds);
            if !reasons.is_empty() {
                warn!(
                    symbol = symbol.as_str(),
                    reasons = reasons.join("; ").as_str(),
                    "BUY_NOW downgraded to WATCH by safety gate"
                );
                outcome.downgraded += 1;
            }
            outcome.decisions.push(decision);
        }

        info!(
            decisions = outcome.decisions.len(),
            skipped = outcome.skipped_symbols.len(),
            downgraded = outcome.downgraded,
            llm_calls = outcome.llm_calls,
            deadline_hit = outcome.deadline_hit,
            "decide complete"
        );
        outcome
    }

    /// Retries draw from the same per-run budget as first attempts.
    fn budget_spent(&self, outcome: &DecideOutcome) -> bool {
        outcome.llm_calls as usize >= self.max_calls
    }

    /// Call the reasoning service up to `MAX_ATTEMPTS` times until the answer
    /// validates. Every failure mode is absorbed here.
    async fn ask(
        &self,
        symbol: &str,
        prompt: &Prompt,
        deadline: &Deadline,
        outcome: &mut DecideOutcome,
    ) -> Option<DecisionPayload> {
        for attempt in 1..=MAX_ATTEMPTS {
            if deadline.is_expired() {
                outcome.deadline_hit = true;
                return None;
            }
            if self.budget_spent(outcome) {
                debug!(symbol, attempt, "no reasoning calls left for a retry");
                return None;
            }
            outcome.llm_calls += 1;
            outcome.tokens_estimated += prompt.estimated_tokens();

            let call = self
                .reasoner
                .complete(&prompt.system, &prompt.user, self.max_tokens, &self.model);
            match deadline.race(self.reasoning_timeout, call).await {
                Ok(Ok(text)) => {
                    outcome.tokens_estimated += estimate_tokens(&text);
                    match parse_payload(&text) {
                        Ok(payload) => {
                            debug!(symbol, attempt, "reasoning answer validated");
                            return Some(payload);
                        }
                        Err(e) => warn!(symbol, attempt, error = %e, "invalid reasoning answer"),
                    }
                }
                Ok(Err(e)) => warn!(symbol, attempt, error = %e, "reasoning call failed"),
                Err(Elapsed::Call(limit)) => warn!(
                    symbol,
                    attempt,
                    timeout_ms = limit.as_millis() as u64,
                    "reasoning call timed out"
                ),
                Err(Elapsed::Deadline) => {
                    warn!(symbol, "decide deadline reached mid-call");
                    outcome.deadline_hit = true;
                    return None;
                }
            }
        }
        None
    }

    fn to_decision(
        &self,
        run_id: &str,
        scope: MarketScope,
        symbol: &str,
        group: &[&ScoredSignal],
        p: DecisionPayload,
    ) -> Decision {
        Decision {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            market_scope: scope,
            symbol: symbol.to_string(),
            verdict: p.verdict,
            confidence: p.confidence,
            time_horizon: p.time_horizon,
            thesis_summary: p.thesis_summary,
            entry_trigger: p.entry_trigger,
            invalidation: p.invalidation,
            risk_notes: p.risk_notes,
            bull_case: p.bull_case,
            bear_case: p.bear_case,
            red_flags: p.red_flags,
            catalysts: p.catalysts,
            sources_used: group.iter().map(|s| s.id.clone()).collect(),
            model: self.model.clone(),
            prompt_version: PROMPT_VERSION.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::universe::in_memory::InMemoryTickerUniverse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WATCH: &str = r#"{
        "verdict": "WATCH",
        "confidence": 0.55,
        "time_horizon": "swing",
        "thesis_summary": "Momentum without confirmation.",
        "entry_trigger": "Wait for a filing.",
        "invalidation": "Story fades.",
        "risk_notes": [],
        "bull_case": [],
        "bear_case": [],
        "catalysts": ["earnings"]
    }"#;

    /// Answers the first `fast` calls at once, then stalls.
    struct Stalling {
        fast: usize,
        answer: &'static str,
        calls: AtomicUsize,
    }

    impl Stalling {
        fn new(fast: usize, answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                fast,
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ReasoningService for Stalling {
        fn name(&self) -> &str {
            "stalling"
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
        ) -> Result<String, crate::domain::error::DomainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fast {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(self.answer.to_string())
        }
    }

    fn scored(id: &str, symbol: &str, score: f64) -> ScoredSignal {
        ScoredSignal {
            id: id.into(),
            raw_id: format!("raw-{id}"),
            source: "reddit".into(),
            symbol: symbol.into(),
            excerpt: format!("${symbol} chatter"),
            sentiment_score: 0.3,
            freshness_score: 1.0,
            source_weight: 1.0,
            event_score: 0.2,
            final_score: score,
            axes: None,
            gates: None,
            quant_multiplier: 1.0,
            reason_summary: String::new(),
            scored_at: Utc::now(),
        }
    }

    fn signals() -> Vec<ScoredSignal> {
        vec![
            scored("s1", "AAPL", 1.2),
            scored("s2", "TSLA", 1.0),
            scored("s3", "AAPL", 0.9),
            scored("s4", "NVDA", 0.8),
        ]
    }

    fn decider(reasoner: Arc<dyn ReasoningService>, config: &PipelineConfig) -> Decider {
        Decider::new(reasoner, Arc::new(InMemoryTickerUniverse::new()), config)
    }

    #[test]
    fn groups_respect_signal_and_call_limits() {
        let scored = signals();
        let mut config = PipelineConfig {
            decide_limit: 3,
            llm_signal_limit: 10,
            ..PipelineConfig::default()
        };
        let groups = decider(Stalling::new(0, WATCH), &config).select_groups(&scored);
        let shape: Vec<(&str, usize)> = groups.iter().map(|(s, g)| (s.as_str(), g.len())).collect();
        assert_eq!(shape, vec![("AAPL", 2), ("TSLA", 1)]);

        config.decide_limit = 30;
        config.llm_signal_limit = 1;
        assert_eq!(decider(Stalling::new(0, WATCH), &config).select_groups(&scored).len(), 1);

        config.llm_signal_limit = 40;
        config.max_llm_calls_per_run = 2;
        let groups = decider(Stalling::new(0, WATCH), &config).select_groups(&scored);
        let symbols: Vec<&str> = groups.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "TSLA"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_deadline_and_keeps_finished_decisions() {
        let config = PipelineConfig::default();
        let reasoner = Stalling::new(1, WATCH);
        let started = tokio::time::Instant::now();
        let deadline = Deadline::after(Duration::from_secs(10)).shortened_by(Duration::from_secs(8));

        let outcome = decider(reasoner.clone(), &config)
            .decide("run-1", MarketScope::Us, &signals(), &deadline)
            .await;

        assert!(outcome.deadline_hit);
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].symbol, "AAPL");
        assert_eq!(outcome.llm_calls, 2);
        // NVDA was never attempted and TSLA was cut, not skipped as invalid.
        assert_eq!(reasoner.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.skipped_symbols.is_empty());
        // The reserve came off the budget.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3), "{waited:?}");
    }

    #[tokio::test]
    async fn retries_count_against_the_call_budget() {
        let config = PipelineConfig {
            max_llm_calls_per_run: 3,
            ..PipelineConfig::default()
        };
        let reasoner = Stalling::new(usize::MAX, "not json at all");
        let deadline = Deadline::after(Duration::from_secs(60));

        let outcome = decider(reasoner.clone(), &config)
            .decide("run-1", MarketScope::Us, &signals(), &deadline)
            .await;

        assert_eq!(outcome.llm_calls, 3);
        assert_eq!(reasoner.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.decisions.is_empty());
        assert_eq!(outcome.skipped_symbols, vec!["AAPL", "TSLA"]);
        assert!(!outcome.deadline_hit);
    }
}
