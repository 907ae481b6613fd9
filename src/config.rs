//! Pipeline configuration loaded from `STOCKPULSE_*` environment variables.
//!
//! Every numeric threshold of the scoring engine is exposed here as a default.
//! The values are domain-tuned and kept for behavioral compatibility.

use crate::domain::entities::scored_signal::QuantThresholds;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Blend weights of the scoring engines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Composite quant = volume * w + flow * w + technical * w.
    pub quant_volume: f64,
    pub quant_flow: f64,
    pub quant_technical: f64,
    /// Kr: sentiment vs quant composite.
    pub quant_sentiment_share: f64,
    /// Us: sentiment vs event score.
    pub general_sentiment_share: f64,
    /// Multiplier applied when the hard filter passes.
    pub gate_boost: f64,
    /// Multiplier applied when the hard filter fails.
    pub gate_penalty: f64,
    /// How much full context risk dampens the score.
    pub context_risk_damping: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            quant_volume: 0.45,
            quant_flow: 0.35,
            quant_technical: 0.20,
            quant_sentiment_share: 0.40,
            general_sentiment_share: 0.35,
            gate_boost: 1.08,
            gate_penalty: 0.94,
            context_risk_damping: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Run budget
    pub run_timeout: Duration,
    pub single_symbol_timeout: Duration,
    pub min_interval: Duration,
    /// Carved out of the decide stage so persistence is not starved.
    pub decide_reserve: Duration,
    pub lock_ttl_slack: Duration,

    // Per-call timeouts
    /// Hard timeout of one HTTP request made by a gatherer.
    pub source_timeout: Duration,
    /// Upper bound on one gatherer's whole batch, retries included.
    pub gatherer_timeout: Duration,
    pub reasoning_timeout: Duration,
    pub quote_timeout: Duration,

    // Gather
    pub max_items_per_source: usize,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,

    // Enrich
    pub enrich_max_symbols: usize,
    pub quote_cache_ttl: Duration,

    // Score
    pub freshness_half_life_hours: f64,
    pub thresholds: QuantThresholds,
    pub weights: ScoreWeights,

    // Decide
    pub decide_limit: usize,
    pub llm_signal_limit: usize,
    pub max_llm_calls_per_run: usize,
    pub max_tokens: u32,
    pub model_override: Option<String>,

    // Report
    pub report_top_n: usize,
    pub evidence_per_decision: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(240),
            single_symbol_timeout: Duration::from_secs(420),
            min_interval: Duration::from_secs(900),
            decide_reserve: Duration::from_secs(8),
            lock_ttl_slack: Duration::from_secs(60),
            source_timeout: Duration::from_secs(15),
            gatherer_timeout: Duration::from_secs(45),
            reasoning_timeout: Duration::from_secs(45),
            quote_timeout: Duration::from_secs(6),
            max_items_per_source: 50,
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(400),
            enrich_max_symbols: 20,
            quote_cache_ttl: Duration::from_secs(300),
            freshness_half_life_hours: 24.0,
            thresholds: QuantThresholds::default(),
            weights: ScoreWeights::default(),
            decide_limit: 30,
            llm_signal_limit: 40,
            max_llm_calls_per_run: 8,
            max_tokens: 1200,
            model_override: None,
            report_top_n: 5,
            evidence_per_decision: 3,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by any `STOCKPULSE_*` variables that are set.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            run_timeout: secs_or("STOCKPULSE_RUN_TIMEOUT_SECS", d.run_timeout),
            single_symbol_timeout: secs_or(
                "STOCKPULSE_SINGLE_SYMBOL_TIMEOUT_SECS",
                d.single_symbol_timeout,
            ),
            min_interval: secs_or("STOCKPULSE_MIN_INTERVAL_SECS", d.min_interval),
            decide_reserve: secs_or("STOCKPULSE_DECIDE_RESERVE_SECS", d.decide_reserve),
            source_timeout: secs_or("STOCKPULSE_SOURCE_TIMEOUT_SECS", d.source_timeout),
            gatherer_timeout: secs_or("STOCKPULSE_GATHERER_TIMEOUT_SECS", d.gatherer_timeout),
            reasoning_timeout: secs_or("STOCKPULSE_REASONING_TIMEOUT_SECS", d.reasoning_timeout),
            max_items_per_source: parse_or("STOCKPULSE_MAX_ITEMS_PER_SOURCE", d.max_items_per_source),
            enrich_max_symbols: parse_or("STOCKPULSE_ENRICH_MAX_SYMBOLS", d.enrich_max_symbols),
            freshness_half_life_hours: parse_or(
                "STOCKPULSE_FRESHNESS_HALF_LIFE_HOURS",
                d.freshness_half_life_hours,
            ),
            decide_limit: parse_or("STOCKPULSE_DECIDE_LIMIT", d.decide_limit),
            llm_signal_limit: parse_or("STOCKPULSE_LLM_SIGNAL_LIMIT", d.llm_signal_limit),
            max_llm_calls_per_run: parse_or("STOCKPULSE_MAX_LLM_CALLS", d.max_llm_calls_per_run),
            max_tokens: parse_or("STOCKPULSE_MAX_TOKENS", d.max_tokens),
            model_override: env::var("STOCKPULSE_MODEL").ok().filter(|m| !m.trim().is_empty()),
            ..d
        }
    }

    /// Wall-clock budget for a run.
    pub fn run_budget(&self, single_symbol: bool) -> Duration {
        if single_symbol {
            self.single_symbol_timeout
        } else {
            self.run_timeout
        }
    }

    pub fn lock_ttl(&self, single_symbol: bool) -> Duration {
        self.run_budget(single_symbol) + self.lock_ttl_slack
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = raw.as_str(), "unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn secs_or(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(key, default.as_secs()))
}
