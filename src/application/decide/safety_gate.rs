//! Deterministic BUY_NOW downgrade applied after the reasoning service answers.

use serde::Serialize;

use crate::domain::entities::decision::Decision;
use crate::domain::entities::scored_signal::{AxisScores, GateFlags, QuantThresholds, ScoredSignal};
use crate::domain::values::verdict::Verdict;

pub const DOWNGRADE_CONFIDENCE_CAP: f64 = 0.59;

/// Quant picture of one symbol group: axes averaged over the group, gates
/// recomputed from the averages, context risk taken at its worst.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuantRollup {
    pub axes: AxisScores,
    pub gates: GateFlags,
    pub signal_count: usize,
}

impl QuantRollup {
    /// `None` when no signal in the group went through the quant engine.
    pub fn from_group(group: &[&ScoredSignal], thresholds: &QuantThresholds) -> Option<Self> {
        let axes: Vec<&AxisScores> = group.iter().filter_map(|s| s.axes.as_ref()).collect();
        if axes.is_empty() {
            return None;
        }
        let n = axes.len() as f64;
        let mean = |f: fn(&AxisScores) -> f64| axes.iter().map(|a| f(a)).sum::<f64>() / n;
        let rolled = AxisScores {
            social: mean(|a| a.social),
            event: mean(|a| a.event),
            volume: mean(|a| a.volume),
            flow: mean(|a| a.flow),
            technical: mean(|a| a.technical),
            quant: mean(|a| a.quant),
            context_risk: axes.iter().map(|a| a.context_risk).fold(0.0, f64::max),
        };
        Some(Self {
            axes: rolled,
            gates: GateFlags::evaluate(&rolled, thresholds),
            signal_count: axes.len(),
        })
    }

    /// Every reason BUY_NOW is not allowed, in a fixed order.
    pub fn blocking_reasons(&self, t: &QuantThresholds) -> Vec<String> {
        let a = &self.axes;
        let g = &self.gates;
        let mut reasons = Vec::new();
        if !g.hard_filter_passed {
            reasons.push("안전게이트 hard_filter 미통과".to_string());
        }
        let checks = [
            (g.volume_guard_passed, "volume_guard", a.volume, t.volume),
            (g.flow_guard_passed, "flow_guard", a.flow, t.flow),
            (g.technical_guard_passed, "technical_guard", a.technical, t.technical),
            (g.social_layer_passed, "social_layer", a.social, t.social),
            (g.event_layer_passed, "event_layer", a.event, t.event),
        ];
        for (passed, name, value, threshold) in checks {
            if !passed {
                reasons.push(format!("안전게이트 {name} 미통과 ({value:.2} < {threshold:.2})"));
            }
        }
        if a.context_risk >= t.context_risk {
            reasons.push(format!(
                "안전게이트 context_risk 과열 ({:.2} ≥ {:.2})",
                a.context_risk, t.context_risk
            ));
        }
        reasons
    }
}

/// Downgrade a BUY_NOW to WATCH when the rollup blocks it. Returns the
/// reasons applied; empty when the decision was left alone.
pub fn enforce(
    decision: &mut Decision,
    rollup: Option<&QuantRollup>,
    thresholds: &QuantThresholds,
) -> Vec<String> {
    let Some(rollup) = rollup else {
        return Vec::new();
    };
    if decision.verdict != Verdict::BuyNow {
        return Vec::new();
    }
    let reasons = rollup.blocking_reasons(thresholds);
    if reasons.is_empty() {
        return reasons;
    }

    decision.verdict = Verdict::Watch;
    decision.confidence = decision.confidence.capped(DOWNGRADE_CONFIDENCE_CAP);

    let joined = reasons.join(", ");
    decision.thesis_summary = annotate(&decision.thesis_summary, &format!("[BUY_NOW→WATCH 강등: {joined}]"));
    decision.entry_trigger = annotate(&decision.entry_trigger, &format!("[선행조건: {joined} 해소]"));
    for reason in &reasons {
        push_unique(&mut decision.risk_notes, reason);
        push_unique(&mut decision.red_flags, reason);
    }
    reasons
}

fn annotate(text: &str, note: &str) -> String {
    if text.contains(note) {
        text.to_string()
    } else if text.trim().is_empty() {
        note.to_string()
    } else {
        format!("{} {note}", text.trim_end())
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
