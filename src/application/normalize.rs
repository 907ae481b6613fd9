//! Normalizer: maps raw signals to symbol-scoped records.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::domain::entities::normalized_signal::NormalizedSignal;
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::ports::ticker_universe::TickerUniverse;
use crate::domain::values::market_scope::MarketScope;

static CASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z]{1,5}(?:\.[A-Za-z])?)\b").expect("valid cashtag regex")
});

/// `(NASDAQ: AAPL)`, `NYSE:BRK.B`
static EXCHANGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:NYSE|NASDAQ|Nasdaq|AMEX|NYSEARCA)\s*:\s*([A-Z]{1,5}(?:\.[A-Z])?)\b")
        .expect("valid exchange regex")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit regex"));

static US_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,5}(?:\.[A-Z])?$").expect("valid symbol regex"));

/// Tokens that look like tickers but almost never are.
const US_BLACKLIST: &[&str] = &[
    "A", "I", "AI", "ALL", "AM", "ATH", "ATM", "BE", "BUY", "CALL", "CEO", "CFO", "CPI", "DD",
    "DOW", "EOD", "EPS", "ETF", "EU", "EV", "FAQ", "FBI", "FD", "FED", "FOMO", "FOR", "FY", "GDP",
    "GO", "HODL", "HOLD", "IMO", "IPO", "IRS", "IT", "LOL", "MOON", "NEW", "NOW", "OMG", "ONE",
    "OP", "OTC", "PE", "PM", "PT", "PUT", "QE", "ROI", "RSI", "SEC", "SELL", "SO", "TA", "TLDR",
    "USA", "USD", "WSB", "YOLO", "YTD",
];

const KR_BLACKLIST: &[&str] = &["000000", "999999", "123456"];

/// Canonical form of a candidate symbol, or `None` if it cannot be one.
pub fn normalize_candidate(scope: MarketScope, raw: &str) -> Option<String> {
    let upper = raw.trim().trim_start_matches('$').to_uppercase();
    match scope {
        MarketScope::Us => {
            let symbol = upper.strip_suffix(".US").unwrap_or(&upper).to_string();
            if !US_SYMBOL.is_match(&symbol) || US_BLACKLIST.contains(&symbol.as_str()) {
                return None;
            }
            Some(symbol)
        }
        MarketScope::Kr => {
            let mut code = upper.as_str();
            for suffix in [".KS", ".KQ", ".KRX"] {
                if let Some(stripped) = code.strip_suffix(suffix) {
                    code = stripped;
                }
            }
            if code.len() == 7 {
                code = code.strip_prefix('A').unwrap_or(code);
            }
            if code.len() != 6
                || !code.chars().all(|c| c.is_ascii_digit())
                || KR_BLACKLIST.contains(&code)
            {
                return None;
            }
            Some(code.to_string())
        }
    }
}

/// Symbol-looking tokens in free text: cashtags first, then exchange tags.
pub fn extract_lexical(scope: MarketScope, text: &str) -> Vec<String> {
    let raw: Vec<&str> = match scope {
        MarketScope::Us => CASHTAG
            .captures_iter(text)
            .chain(EXCHANGE_TAG.captures_iter(text))
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect(),
        MarketScope::Kr => DIGIT_RUN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|s| s.len() == 6)
            .collect(),
    };
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|c| normalize_candidate(scope, c))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

pub struct Normalizer {
    universe: Arc<dyn TickerUniverse>,
}

impl Normalizer {
    pub fn new(universe: Arc<dyn TickerUniverse>) -> Self {
        Self { universe }
    }

    /// Candidate symbols for one raw signal after universe filtering.
    pub fn symbols_for(&self, scope: MarketScope, signal: &RawSignal) -> Vec<String> {
        let text = signal.text();
        let candidates: Vec<String> = if signal.symbol_candidates.is_empty() {
            let mut found = extract_lexical(scope, &text);
            found.extend(self.universe.extract_candidates(scope, &text));
            found
        } else {
            signal.symbol_candidates.clone()
        };

        // A cold universe accepts everything syntactically valid.
        let loaded = self.universe.is_loaded(scope);
        let mut seen = HashSet::new();
        candidates
            .iter()
            .filter_map(|c| normalize_candidate(scope, c))
            .filter(|s| !loaded || self.universe.contains(scope, s))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    /// Fan each raw signal out into one record per valid symbol, deduplicated
    /// by `(raw_id, symbol)`. With `target` set, only that symbol is kept.
    pub fn normalize(
        &self,
        scope: MarketScope,
        signals: &[RawSignal],
        target: Option<&str>,
    ) -> Vec<NormalizedSignal> {
        let target = target.and_then(|t| normalize_candidate(scope, t));
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut out = Vec::new();

        for signal in signals {
            let symbols = self.symbols_for(scope, signal);
            if symbols.is_empty() {
                debug!(source = signal.source.as_str(), id = signal.external_id.as_str(), "no symbols");
                continue;
            }
            let text = signal.text();
            for symbol in symbols {
                if target.as_deref().is_some_and(|t| t != symbol) {
                    continue;
                }
                if !seen.insert((signal.id.clone(), symbol.clone())) {
                    continue;
                }
                out.push(NormalizedSignal {
                    raw_id: signal.id.clone(),
                    source: signal.source.clone(),
                    scope,
                    symbol,
                    text: text.clone(),
                    published_at: signal.published_at,
                    engagement: signal.engagement.clone(),
                    metadata: signal.metadata.clone(),
                });
            }
        }
        out
    }
}
