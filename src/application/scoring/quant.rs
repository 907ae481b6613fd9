//! Quantitative engine for Kr signals: five axes, the composite,
//! gates and the context-risk dampener.

use crate::config::ScoreWeights;
use crate::domain::entities::normalized_signal::NormalizedSignal;
use crate::domain::entities::scored_signal::{AxisScores, GateFlags, QuantThresholds};
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::signal_metadata::{engagement_total, SignalMetadata};
use crate::domain::values::source_class::SourceClass;

use super::lexicon;

/// Engagement total at which the social axis saturates.
const ENGAGEMENT_SATURATION: f64 = 500.0;

/// Where an axis value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisBasis {
    Metric,
    Lexical,
}

impl AxisBasis {
    pub fn tag(&self) -> &'static str {
        match self {
            AxisBasis::Metric => "지표",
            AxisBasis::Lexical => "텍스트",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuantResult {
    pub axes: AxisScores,
    pub gates: GateFlags,
    pub volume_basis: AxisBasis,
    pub flow_basis: AxisBasis,
    pub technical_basis: AxisBasis,
    /// Gate boost or penalty times the context-risk dampener.
    pub multiplier: f64,
}

pub fn social_axis(signal: &NormalizedSignal, sentiment: f64) -> f64 {
    let total = engagement_total(&signal.engagement);
    let engagement = ((1.0 + total).ln() / (1.0 + ENGAGEMENT_SATURATION).ln()).clamp(0.0, 1.0);
    let community = if SourceClass::of(&signal.source) == SourceClass::Community {
        0.2
    } else {
        0.0
    };
    (0.5 * sentiment.abs() + 0.3 * engagement + community).clamp(0.0, 1.0)
}

/// Catalyst density on top of a per-source-class base. Shared with the
/// general-market engine.
pub fn event_axis(scope: MarketScope, source: &str, text: &str) -> f64 {
    let base = match SourceClass::of(source) {
        SourceClass::Filing => 0.45,
        SourceClass::News => 0.3,
        SourceClass::Community => 0.15,
        SourceClass::Other => 0.2,
    };
    let hits = lexicon::catalyst_hits(scope, text) as f64;
    (base + 0.15 * hits).clamp(0.0, 1.0)
}

pub fn volume_axis(meta: &SignalMetadata, text: &str) -> (f64, AxisBasis) {
    if let Some(ratio) = meta.volume_ratio.filter(|r| r.is_finite()) {
        let score = if ratio >= 3.0 {
            1.0
        } else if ratio >= 2.0 {
            0.85
        } else if ratio >= 1.5 {
            0.75
        } else if ratio >= 1.0 {
            0.5
        } else {
            0.25
        };
        return (score, AxisBasis::Metric);
    }
    let score = match lexicon::count_hits(text, lexicon::VOLUME_CUES) {
        0 => 0.3,
        1 => 0.6,
        _ => 0.75,
    };
    (score, AxisBasis::Lexical)
}

pub fn flow_axis(meta: &SignalMetadata, text: &str) -> (f64, AxisBasis) {
    if meta.has_flow() {
        let foreign = meta.foreign_net_buy.unwrap_or(0.0);
        let institution = meta.institution_net_buy.unwrap_or(0.0);
        let net = foreign + institution;
        let score = if foreign > 0.0 && institution > 0.0 {
            1.0
        } else if net > 0.0 {
            0.7
        } else if net == 0.0 {
            0.45
        } else {
            0.2
        };
        return (score, AxisBasis::Metric);
    }
    let buying = lexicon::count_hits(text, lexicon::FLOW_POSITIVE);
    let selling = lexicon::count_hits(text, lexicon::FLOW_NEGATIVE);
    let score = if buying > selling {
        if buying >= 2 {
            0.8
        } else {
            0.6
        }
    } else if selling > buying {
        0.2
    } else {
        0.4
    };
    (score, AxisBasis::Lexical)
}

pub fn technical_axis(meta: &SignalMetadata, text: &str) -> (f64, AxisBasis) {
    if meta.has_moving_averages() {
        let score = match (meta.price_vs_ma5_pct, meta.price_vs_ma20_pct) {
            (Some(ma5), Some(ma20)) => match (ma5 > 0.0, ma20 > 0.0) {
                // Price above both with MA5 above MA20.
                (true, true) if ma20 > ma5 => 1.0,
                (true, true) => 0.85,
                (false, true) => 0.6,
                (true, false) => 0.45,
                (false, false) => 0.15,
            },
            (Some(pct), None) | (None, Some(pct)) => {
                if pct > 0.0 {
                    0.6
                } else {
                    0.25
                }
            }
            (None, None) => 0.4,
        };
        return (score, AxisBasis::Metric);
    }
    let up = lexicon::count_hits(text, lexicon::TECH_POSITIVE);
    let down = lexicon::count_hits(text, lexicon::TECH_NEGATIVE);
    let score = if down > up {
        0.2
    } else if up >= 2 {
        0.8
    } else if up == 1 {
        0.6
    } else {
        0.4
    };
    (score, AxisBasis::Lexical)
}

/// Combined overheating risk: `1 - Π(1 - c)` over the active components.
pub fn context_risk(meta: &SignalMetadata, text: &str, volume: f64, flow: f64, technical: f64) -> f64 {
    let mut components = Vec::with_capacity(3);
    if meta.near_52w_high == Some(true) || lexicon::count_hits(text, lexicon::OVERHEAT) > 0 {
        components.push(0.6);
    }
    if (flow - technical).abs() >= 0.5 {
        components.push(0.5);
    }
    if volume >= 0.85 && flow < 0.4 {
        components.push(0.7);
    }
    let survive: f64 = components.iter().map(|c| 1.0 - c).product();
    (1.0 - survive).clamp(0.0, 1.0)
}

pub fn evaluate(
    signal: &NormalizedSignal,
    sentiment: f64,
    thresholds: &QuantThresholds,
    weights: &ScoreWeights,
) -> QuantResult {
    let text = signal.text.as_str();
    let meta = &signal.metadata;

    let (volume, volume_basis) = volume_axis(meta, text);
    let (flow, flow_basis) = flow_axis(meta, text);
    let (technical, technical_basis) = technical_axis(meta, text);
    let quant = (weights.quant_volume * volume
        + weights.quant_flow * flow
        + weights.quant_technical * technical)
        .clamp(0.0, 1.0);

    let axes = AxisScores {
        social: social_axis(signal, sentiment),
        event: event_axis(signal.scope, &signal.source, text),
        volume,
        flow,
        technical,
        quant,
        context_risk: context_risk(meta, text, volume, flow, technical),
    };
    let gates = GateFlags::evaluate(&axes, thresholds);

    let gate = if gates.hard_filter_passed {
        weights.gate_boost
    } else {
        weights.gate_penalty
    };
    let damp = 1.0 - weights.context_risk_damping * axes.context_risk;

    QuantResult {
        axes,
        gates,
        volume_basis,
        flow_basis,
        technical_basis,
        multiplier: gate * damp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::signal_metadata::Engagement;

    fn kr_signal(source: &str, text: &str, meta: SignalMetadata) -> NormalizedSignal {
        NormalizedSignal {
            raw_id: "raw".into(),
            source: source.into(),
            scope: MarketScope::Kr,
            symbol: "005930".into(),
            text: text.into(),
            published_at: None,
            engagement: Engagement::new(),
            metadata: meta,
        }
    }

    #[test]
    fn metric_axes_take_precedence_over_text() {
        let meta = SignalMetadata {
            volume_ratio: Some(3.2),
            foreign_net_buy: Some(1_000.0),
            institution_net_buy: Some(500.0),
            price_vs_ma5_pct: Some(1.0),
            price_vs_ma20_pct: Some(3.0),
            ..Default::default()
        };
        let text = "외국인 순매도 데드크로스";
        assert_eq!(volume_axis(&meta, text), (1.0, AxisBasis::Metric));
        assert_eq!(flow_axis(&meta, text), (1.0, AxisBasis::Metric));
        assert_eq!(technical_axis(&meta, text), (1.0, AxisBasis::Metric));
    }

    #[test]
    fn lexical_fallbacks() {
        let meta = SignalMetadata::default();
        assert_eq!(volume_axis(&meta, "조용한 하루").0, 0.3);
        assert_eq!(volume_axis(&meta, "거래량 급증에 대량거래").0, 0.75);
        assert_eq!(flow_axis(&meta, "외국인 순매도 지속").0, 0.2);
        assert_eq!(technical_axis(&meta, "골든크로스 임박").0, 0.6);
    }

    #[test]
    fn bubble_pattern_raises_context_risk() {
        let calm = context_risk(&SignalMetadata::default(), "", 0.5, 0.5, 0.5);
        assert_eq!(calm, 0.0);
        let bubble = context_risk(&SignalMetadata::default(), "", 1.0, 0.2, 0.3);
        assert!((bubble - 0.7).abs() < 1e-9);
        let meta = SignalMetadata {
            near_52w_high: Some(true),
            ..Default::default()
        };
        // 1 - 0.4 * 0.5 * 0.3
        let stacked = context_risk(&meta, "", 1.0, 0.2, 0.9);
        assert!((stacked - 0.94).abs() < 1e-9);
    }

    #[test]
    fn hard_filter_failure_applies_penalty() {
        let weights = ScoreWeights::default();
        let thresholds = QuantThresholds::default();
        let weak = evaluate(&kr_signal("news_rss", "평범한 기사", SignalMetadata::default()), 0.0, &thresholds, &weights);
        assert!(!weak.gates.hard_filter_passed);
        assert!((weak.multiplier - weights.gate_penalty).abs() < 1e-9);

        let meta = SignalMetadata {
            volume_ratio: Some(2.5),
            foreign_net_buy: Some(10.0),
            institution_net_buy: Some(5.0),
            price_vs_ma5_pct: Some(2.0),
            price_vs_ma20_pct: Some(6.0),
            ..Default::default()
        };
        let strong = evaluate(&kr_signal("dart", "공급계약 체결 공시", meta), 0.5, &thresholds, &weights);
        assert!(strong.gates.hard_filter_passed);
        assert_eq!(strong.axes.context_risk, 0.0);
        assert!((strong.multiplier - weights.gate_boost).abs() < 1e-9);
    }
}
