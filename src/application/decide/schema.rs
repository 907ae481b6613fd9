//! Strict validation of the reasoning service's structured answer.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::values::confidence::Confidence;
use crate::domain::values::verdict::{TimeHorizon, Verdict};

pub const SCHEMA_VERSION: &str = "decision-v2";

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("response is not a JSON object: {0}")]
    NotJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown verdict '{0}'")]
    InvalidVerdict(String),

    #[error("unknown time horizon '{0}', expected {}", TimeHorizon::ALLOWED)]
    InvalidHorizon(String),

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Validated decision body, before run bookkeeping is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPayload {
    pub verdict: Verdict,
    pub confidence: Confidence,
    pub time_horizon: TimeHorizon,
    pub thesis_summary: String,
    pub entry_trigger: String,
    pub invalidation: String,
    pub risk_notes: Vec<String>,
    pub bull_case: Vec<String>,
    pub bear_case: Vec<String>,
    pub red_flags: Vec<String>,
    pub catalysts: Vec<String>,
}

/// The JSON object inside a completion, tolerating code fences and chatter
/// around it.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_payload(text: &str) -> Result<DecisionPayload, ValidationError> {
    let body = extract_json(text).ok_or_else(|| ValidationError::NotJson(preview(text)))?;
    let value: Value =
        serde_json::from_str(body).map_err(|e| ValidationError::NotJson(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::NotJson(preview(text)))?;

    let verdict_raw = required_str(obj, "verdict")?;
    let verdict: Verdict = verdict_raw
        .parse()
        .map_err(|_| ValidationError::InvalidVerdict(verdict_raw.to_string()))?;

    let confidence = obj
        .get("confidence")
        .ok_or(ValidationError::MissingField("confidence"))?
        .as_f64()
        .ok_or(ValidationError::WrongType {
            field: "confidence",
            expected: "a number",
        })?;
    let confidence =
        Confidence::new(confidence).map_err(|_| ValidationError::ConfidenceOutOfRange(confidence))?;

    let horizon_raw = required_str(obj, "time_horizon")?;
    let time_horizon: TimeHorizon = horizon_raw
        .parse()
        .map_err(|_| ValidationError::InvalidHorizon(horizon_raw.to_string()))?;

    Ok(DecisionPayload {
        verdict,
        confidence,
        time_horizon,
        thesis_summary: required_str(obj, "thesis_summary")?.trim().to_string(),
        entry_trigger: required_str(obj, "entry_trigger")?.trim().to_string(),
        invalidation: required_str(obj, "invalidation")?.trim().to_string(),
        risk_notes: string_list(obj, "risk_notes", true)?,
        bull_case: string_list(obj, "bull_case", true)?,
        bear_case: string_list(obj, "bear_case", true)?,
        red_flags: string_list(obj, "red_flags", false)?,
        catalysts: string_list(obj, "catalysts", false)?,
    })
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn string_list(
    obj: &Map<String, Value>,
    field: &'static str,
    required: bool,
) -> Result<Vec<String>, ValidationError> {
    let items = match obj.get(field) {
        None | Some(Value::Null) if required => return Err(ValidationError::MissingField(field)),
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::WrongType {
                field,
                expected: "an array of strings",
            })
        }
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or(ValidationError::WrongType {
                    field,
                    expected: "an array of strings",
                })
        })
        .filter(|s| !matches!(s, Ok(s) if s.is_empty()))
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
