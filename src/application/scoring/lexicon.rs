//! Keyword sets for lexical scoring. Korean terms match as substrings,
//! single ASCII words match whole tokens.

use crate::domain::values::market_scope::MarketScope;

pub const BULLISH_EN: &[&str] = &[
    "buy", "bull", "bullish", "long", "calls", "moon", "breakout", "beat", "beats", "upgrade",
    "upgraded", "surge", "surges", "rally", "undervalued", "outperform", "record", "strong",
    "raised", "soar", "soars",
];

pub const BEARISH_EN: &[&str] = &[
    "sell", "bear", "bearish", "short", "puts", "dump", "crash", "miss", "misses", "downgrade",
    "downgraded", "plunge", "plunges", "overvalued", "underperform", "weak", "lawsuit",
    "bankruptcy", "fraud", "dilution", "cut",
];

pub const BULLISH_KO: &[&str] = &[
    "매수", "상승", "급등", "호재", "돌파", "신고가", "흑자", "수주", "강세", "반등", "상향", "저평가",
];

pub const BEARISH_KO: &[&str] = &[
    "매도", "하락", "급락", "악재", "적자", "약세", "손실", "소송", "유상증자", "하한가", "하향",
    "고평가", "횡령",
];

pub const CATALYST_EN: &[&str] = &[
    "earnings", "guidance", "contract", "approval", "fda", "acquisition", "acquire", "merger",
    "buyback", "dividend", "partnership", "launch", "patent", "8-k", "offering", "split",
];

pub const CATALYST_KO: &[&str] = &[
    "공시", "수주", "공급계약", "실적", "승인", "인수", "합병", "자사주", "배당", "특허", "임상",
    "신규시설", "무상증자", "계약",
];

pub const VOLUME_CUES: &[&str] = &[
    "거래량 급증", "거래량 폭발", "대량거래", "거래대금", "volume spike", "unusual volume",
    "heavy volume",
];

pub const FLOW_POSITIVE: &[&str] = &[
    "외국인 순매수", "기관 순매수", "쌍끌이", "외인 매수", "net buying", "institutional buying",
];

pub const FLOW_NEGATIVE: &[&str] = &[
    "외국인 순매도", "기관 순매도", "외인 매도", "net selling", "institutional selling",
];

pub const TECH_POSITIVE: &[&str] = &[
    "골든크로스", "정배열", "저항선 돌파", "이평선 돌파", "golden cross", "breakout",
];

pub const TECH_NEGATIVE: &[&str] = &[
    "데드크로스", "역배열", "지지선 이탈", "이평선 이탈", "death cross", "breakdown",
];

pub const OVERHEAT: &[&str] = &[
    "52주 신고가", "52주 최고", "역대 최고가", "과열", "52-week high", "all-time high",
];

/// Occurrences of any keyword in `text`.
pub fn count_hits(text: &str, keywords: &[&str]) -> usize {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|t| !t.is_empty())
        .collect();
    keywords
        .iter()
        .map(|kw| {
            if kw.is_ascii() && !kw.contains(' ') {
                tokens.iter().filter(|t| **t == *kw).count()
            } else {
                lower.matches(kw).count()
            }
        })
        .sum()
}

/// Lexical sentiment in `[-1, 1]`; 0 when no keyword hits.
pub fn lexical_sentiment(scope: MarketScope, text: &str) -> f64 {
    let (mut bull, mut bear) = (count_hits(text, BULLISH_EN), count_hits(text, BEARISH_EN));
    if scope == MarketScope::Kr {
        bull += count_hits(text, BULLISH_KO);
        bear += count_hits(text, BEARISH_KO);
    }
    let total = bull + bear;
    if total == 0 {
        return 0.0;
    }
    ((bull as f64 - bear as f64) / total as f64).clamp(-1.0, 1.0)
}

pub fn catalyst_hits(scope: MarketScope, text: &str) -> usize {
    let en = count_hits(text, CATALYST_EN);
    match scope {
        MarketScope::Us => en,
        MarketScope::Kr => en + count_hits(text, CATALYST_KO),
    }
}
