use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FINAL_SCORE_MAX: f64 = 1.5;

/// Per-axis scores of the quantitative engine, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub social: f64,
    pub event: f64,
    pub volume: f64,
    pub flow: f64,
    pub technical: f64,
    /// Weighted blend of volume, flow and technical.
    pub quant: f64,
    /// Overheating risk. Dampens the score, never gates it.
    pub context_risk: f64,
}

/// Thresholds the gates are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantThresholds {
    pub volume: f64,
    pub flow: f64,
    pub technical: f64,
    pub social: f64,
    pub event: f64,
    /// Context risk at or above this blocks a BUY_NOW verdict.
    pub context_risk: f64,
}

impl Default for QuantThresholds {
    fn default() -> Self {
        Self {
            volume: 0.75,
            flow: 0.5,
            technical: 0.5,
            social: 0.7,
            event: 0.5,
            context_risk: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFlags {
    pub volume_guard_passed: bool,
    pub flow_guard_passed: bool,
    pub technical_guard_passed: bool,
    pub hard_filter_passed: bool,
    pub social_layer_passed: bool,
    pub event_layer_passed: bool,
    pub triple_crown_passed: bool,
}

impl GateFlags {
    /// Derive every gate from the axes. `triple_crown ⇒ hard_filter ⇒ all guards`
    /// holds by construction.
    pub fn evaluate(axes: &AxisScores, t: &QuantThresholds) -> Self {
        let volume_guard_passed = axes.volume >= t.volume;
        let flow_guard_passed = axes.flow >= t.flow;
        let technical_guard_passed = axes.technical >= t.technical;
        let hard_filter_passed =
            volume_guard_passed && flow_guard_passed && technical_guard_passed;
        let social_layer_passed = axes.social >= t.social;
        let event_layer_passed = axes.event >= t.event;
        Self {
            volume_guard_passed,
            flow_guard_passed,
            technical_guard_passed,
            hard_filter_passed,
            social_layer_passed,
            event_layer_passed,
            triple_crown_passed: hard_filter_passed && social_layer_passed && event_layer_passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub id: String,
    pub raw_id: String,
    pub source: String,
    pub symbol: String,
    /// Leading slice of the signal text, kept as report evidence.
    pub excerpt: String,
    pub sentiment_score: f64,
    pub freshness_score: f64,
    pub source_weight: f64,
    pub event_score: f64,
    pub final_score: f64,
    /// Present only when the quantitative engine ran.
    pub axes: Option<AxisScores>,
    /// Present only when the quantitative engine ran.
    pub gates: Option<GateFlags>,
    pub quant_multiplier: f64,
    pub reason_summary: String,
    pub scored_at: DateTime<Utc>,
}
