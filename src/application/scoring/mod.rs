//! Scorer: a pure function from normalized signals to scored signals.

pub mod lexicon;
pub mod quant;
pub mod weights;

use chrono::{DateTime, Utc};

use crate::config::{PipelineConfig, ScoreWeights};
use crate::domain::entities::normalized_signal::NormalizedSignal;
use crate::domain::entities::scored_signal::{QuantThresholds, ScoredSignal, FINAL_SCORE_MAX};
use crate::domain::values::freshness::freshness;
use self::quant::QuantResult;
use self::weights::SourceWeights;

const EXCERPT_CHARS: usize = 200;

pub struct Scorer {
    half_life_hours: f64,
    thresholds: QuantThresholds,
    weights: ScoreWeights,
    source_weights: SourceWeights,
}

impl Scorer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            half_life_hours: config.freshness_half_life_hours,
            thresholds: config.thresholds,
            weights: config.weights,
            source_weights: SourceWeights::default(),
        }
    }

    pub fn with_source_weights(mut self, source_weights: SourceWeights) -> Self {
        self.source_weights = source_weights;
        self
    }

    pub fn score(&self, signals: &[NormalizedSignal], now: DateTime<Utc>) -> Vec<ScoredSignal> {
        signals.iter().map(|s| self.score_one(s, now)).collect()
    }

    pub fn score_one(&self, signal: &NormalizedSignal, now: DateTime<Utc>) -> ScoredSignal {
        let sentiment = signal
            .metadata
            .sentiment
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(-1.0, 1.0))
            .unwrap_or_else(|| lexicon::lexical_sentiment(signal.scope, &signal.text));
        let fresh = freshness(signal.published_at, now, self.half_life_hours);
        let weight = self.source_weights.weight_for(&signal.source, &signal.metadata);
        let unit_sentiment = (sentiment + 1.0) / 2.0;

        let (event, raw_final, quant, multiplier) = if signal.scope.has_quant_engine() {
            let q = quant::evaluate(signal, sentiment, &self.thresholds, &self.weights);
            let share = self.weights.quant_sentiment_share;
            let blended = share * unit_sentiment + (1.0 - share) * q.axes.quant;
            (q.axes.event, blended * fresh * weight * q.multiplier, Some(q), q.multiplier)
        } else {
            let event = quant::event_axis(signal.scope, &signal.source, &signal.text);
            let share = self.weights.general_sentiment_share;
            let blended = share * unit_sentiment + (1.0 - share) * event;
            (event, blended * fresh * weight, None, 1.0)
        };
        let final_score = if raw_final.is_finite() {
            raw_final.clamp(0.0, FINAL_SCORE_MAX)
        } else {
            0.0
        };

        let reason_summary = match &quant {
            Some(q) => kr_rationale(sentiment, fresh, weight, q, final_score),
            None => us_rationale(sentiment, fresh, weight, event, final_score),
        };

        ScoredSignal {
            id: uuid::Uuid::new_v4().to_string(),
            raw_id: signal.raw_id.clone(),
            source: signal.source.clone(),
            symbol: signal.symbol.clone(),
            excerpt: excerpt(&signal.text),
            sentiment_score: sentiment,
            freshness_score: fresh,
            source_weight: weight,
            event_score: event,
            final_score,
            axes: quant.map(|q| q.axes),
            gates: quant.map(|q| q.gates),
            quant_multiplier: multiplier,
            reason_summary,
            scored_at: now,
        }
    }
}

fn pass(flag: bool) -> &'static str {
    if flag {
        "통과"
    } else {
        "미통과"
    }
}

fn kr_rationale(sentiment: f64, fresh: f64, weight: f64, q: &QuantResult, final_score: f64) -> String {
    let a = &q.axes;
    format!(
        "감성 {sentiment:+.2} · 신선도 {fresh:.2} · 출처가중치 {weight:.2} · 소셜 {:.2} · 이벤트 {:.2} · \
         거래량 {:.2}({}) · 수급 {:.2}({}) · 기술 {:.2}({}) · 퀀트 {:.2} · 과열위험 {:.2} · \
         하드필터 {} · 트리플크라운 {} · 배수 {:.3} · 최종 {final_score:.3}",
        a.social,
        a.event,
        a.volume,
        q.volume_basis.tag(),
        a.flow,
        q.flow_basis.tag(),
        a.technical,
        q.technical_basis.tag(),
        a.quant,
        a.context_risk,
        pass(q.gates.hard_filter_passed),
        pass(q.gates.triple_crown_passed),
        q.multiplier,
    )
}

fn us_rationale(sentiment: f64, fresh: f64, weight: f64, event: f64, final_score: f64) -> String {
    format!(
        "sentiment {sentiment:+.2} · freshness {fresh:.2} · source weight {weight:.2} · \
         event {event:.2} · final {final_score:.3}"
    )
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
