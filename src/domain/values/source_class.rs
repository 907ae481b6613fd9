use serde::{Deserialize, Serialize};

/// Coarse kind of an external source, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceClass {
    /// Social posts and message boards.
    Community,
    /// Regulatory disclosures.
    Filing,
    /// Editorial news and headlines.
    News,
    Other,
}

impl SourceClass {
    pub fn of(source: &str) -> Self {
        match source {
            "reddit" | "stocktwits" | "naver_board" => SourceClass::Community,
            "sec_filings" | "dart" => SourceClass::Filing,
            "news_rss" => SourceClass::News,
            s if s.ends_with("_board") || s.ends_with("_community") => SourceClass::Community,
            s if s.ends_with("_news") => SourceClass::News,
            _ => SourceClass::Other,
        }
    }
}
