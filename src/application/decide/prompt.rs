//! Market-appropriate prompts for the reasoning service.

use std::fmt::Write;

use crate::domain::entities::scored_signal::ScoredSignal;
use crate::domain::values::market_scope::MarketScope;
use crate::domain::values::verdict::TimeHorizon;

use super::safety_gate::QuantRollup;

pub const PROMPT_VERSION: &str = "pulse-decide-v4";

const EVIDENCE_CHARS: usize = 280;

pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Rough token count used for run accounting.
    pub fn estimated_tokens(&self) -> u64 {
        estimate_tokens(&self.system) + estimate_tokens(&self.user)
    }
}

/// Four characters per token, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

fn schema_block() -> String {
    format!(
        r#"{{
  "verdict": "BUY_NOW | WATCH | AVOID",
  "confidence": 0.0-1.0,
  "time_horizon": "{}",
  "thesis_summary": "string",
  "entry_trigger": "string",
  "invalidation": "string",
  "risk_notes": ["string"],
  "bull_case": ["string"],
  "bear_case": ["string"],
  "red_flags": ["string"],
  "catalysts": ["string"]
}}"#,
        TimeHorizon::ALLOWED
    )
}

pub fn build(
    scope: MarketScope,
    symbol: &str,
    name: Option<&str>,
    group: &[&ScoredSignal],
    rollup: Option<&QuantRollup>,
) -> Prompt {
    match scope {
        MarketScope::Kr => build_kr(symbol, name, group, rollup),
        MarketScope::Us => build_us(symbol, name, group),
    }
}

fn build_kr(symbol: &str, name: Option<&str>, group: &[&ScoredSignal], rollup: Option<&QuantRollup>) -> Prompt {
    let system = format!(
        "당신은 한국 주식시장 리서치 애널리스트입니다. 제공된 신호만 근거로 판단하고, \
         근거가 부족하면 WATCH 또는 AVOID를 선택하세요. 거래량·수급·기술 하드필터를 통과하지 못한 \
         종목에 BUY_NOW를 주지 마세요. 반드시 아래 스키마의 JSON 객체 하나만 출력하세요.\n{}",
        schema_block()
    );

    let mut user = String::new();
    let label = name.map(|n| format!("{n} ({symbol})")).unwrap_or_else(|| symbol.to_string());
    let _ = writeln!(user, "종목: {label}");
    match rollup {
        Some(r) => {
            let a = &r.axes;
            let g = &r.gates;
            let _ = writeln!(
                user,
                "퀀트 요약 (신호 {}건 평균): 소셜 {:.2}, 이벤트 {:.2}, 거래량 {:.2}, 수급 {:.2}, 기술 {:.2}, \
                 퀀트 {:.2}, 과열위험 {:.2}",
                r.signal_count, a.social, a.event, a.volume, a.flow, a.technical, a.quant, a.context_risk
            );
            let _ = writeln!(
                user,
                "게이트: 하드필터 {}, 소셜레이어 {}, 이벤트레이어 {}, 트리플크라운 {}",
                ox(g.hard_filter_passed),
                ox(g.social_layer_passed),
                ox(g.event_layer_passed),
                ox(g.triple_crown_passed)
            );
        }
        None => {
            let _ = writeln!(user, "퀀트 요약: 없음");
        }
    }
    let _ = writeln!(user, "\n신호:");
    write_evidence(&mut user, group);
    Prompt { system, user }
}

fn build_us(symbol: &str, name: Option<&str>, group: &[&ScoredSignal]) -> Prompt {
    let system = format!(
        "You are an equity research analyst. Judge only from the signals provided; \
         prefer WATCH or AVOID when evidence is thin or one-sided. Output exactly one JSON \
         object matching this schema and nothing else.\n{}",
        schema_block()
    );

    let mut user = String::new();
    let label = name.map(|n| format!("{n} (${symbol})")).unwrap_or_else(|| format!("${symbol}"));
    let _ = writeln!(user, "Symbol: {label}");
    let _ = writeln!(user, "\nSignals:");
    write_evidence(&mut user, group);
    Prompt { system, user }
}

fn write_evidence(out: &mut String, group: &[&ScoredSignal]) {
    for (i, s) in group.iter().enumerate() {
        let text: String = s.excerpt.chars().take(EVIDENCE_CHARS).collect();
        let _ = writeln!(
            out,
            "{}. [{} | score {:.2} | sentiment {:+.2}] {}\n   {}",
            i + 1,
            s.source,
            s.final_score,
            s.sentiment_score,
            text.replace('\n', " "),
            s.reason_summary
        );
    }
}

fn ox(passed: bool) -> &'static str {
    if passed {
        "O"
    } else {
        "X"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scored(symbol: &str, excerpt: &str) -> ScoredSignal {
        ScoredSignal {
            id: "s".into(),
            raw_id: "r".into(),
            source: "reddit".into(),
            symbol: symbol.into(),
            excerpt: excerpt.into(),
            sentiment_score: 0.4,
            freshness_score: 1.0,
            source_weight: 0.9,
            event_score: 0.3,
            final_score: 0.7,
            axes: None,
            gates: None,
            quant_multiplier: 1.0,
            reason_summary: "sentiment +0.40".into(),
            scored_at: Utc::now(),
        }
    }

    #[test]
    fn us_prompt_carries_schema_and_evidence() {
        let s = scored("AAPL", "Earnings beat\nguidance raised");
        let p = build(MarketScope::Us, "AAPL", Some("Apple Inc."), &[&s], None);
        assert!(p.system.contains("\"verdict\""));
        assert!(p.system.contains("LONG_TERM"));
        assert!(p.user.contains("Apple Inc. ($AAPL)"));
        assert!(p.user.contains("Earnings beat guidance raised"));
    }

    #[test]
    fn kr_prompt_is_korean() {
        let s = scored("005930", "공급계약 체결");
        let p = build(MarketScope::Kr, "005930", None, &[&s], None);
        assert!(p.system.contains("하드필터"));
        assert!(p.user.contains("퀀트 요약: 없음"));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
