use std::collections::HashMap;

use crate::domain::values::signal_metadata::SignalMetadata;

/// Trust weight per source, with optional `source:sub_key` overrides for
/// sub-communities and filing types.
#[derive(Debug, Clone)]
pub struct SourceWeights {
    base: HashMap<String, f64>,
    sub: HashMap<String, f64>,
    fallback: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        let base = [
            ("reddit", 0.9),
            ("stocktwits", 0.85),
            ("sec_filings", 1.25),
            ("news_rss", 1.0),
            ("dart", 1.3),
        ];
        let sub = [
            ("reddit:wallstreetbets", 0.8),
            ("reddit:stocks", 1.0),
            ("reddit:investing", 1.05),
            ("reddit:securityanalysis", 1.1),
            ("sec_filings:8-k", 1.3),
            ("sec_filings:4", 1.2),
            ("sec_filings:10-q", 1.15),
            ("sec_filings:10-k", 1.15),
            ("dart:주요사항보고서", 1.35),
            ("dart:단일판매ㆍ공급계약체결", 1.4),
        ];
        Self {
            base: base.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            sub: sub.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            fallback: 1.0,
        }
    }
}

impl SourceWeights {
    pub fn with_base(mut self, source: &str, weight: f64) -> Self {
        self.base.insert(source.to_lowercase(), weight);
        self
    }

    pub fn weight_for(&self, source: &str, metadata: &SignalMetadata) -> f64 {
        let source = source.to_lowercase();
        if let Some(sub_key) = metadata.source_sub_key() {
            let key = format!("{source}:{}", normalize_sub_key(sub_key));
            if let Some(w) = self.sub.get(&key) {
                return *w;
            }
            // DART report names carry a bracketed prefix, e.g. "[기재정정]주요사항보고서".
            if let Some(w) = self
                .sub
                .iter()
                .filter(|(k, _)| k.starts_with(&format!("{source}:")))
                .find(|(k, _)| key.ends_with(k.split_once(':').map(|(_, s)| s).unwrap_or("")))
                .map(|(_, w)| *w)
            {
                return w;
            }
        }
        self.base.get(&source).copied().unwrap_or(self.fallback)
    }
}

fn normalize_sub_key(raw: &str) -> String {
    raw.trim().trim_start_matches("r/").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(community: Option<&str>, filing: Option<&str>) -> SignalMetadata {
        SignalMetadata {
            community: community.map(String::from),
            filing_type: filing.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn sub_key_overrides_base() {
        let w = SourceWeights::default();
        assert_eq!(w.weight_for("reddit", &meta(Some("WallStreetBets"), None)), 0.8);
        assert_eq!(w.weight_for("reddit", &meta(Some("r/investing"), None)), 1.05);
        assert_eq!(w.weight_for("reddit", &meta(Some("pennystocks"), None)), 0.9);
        assert_eq!(w.weight_for("sec_filings", &meta(None, Some("8-K"))), 1.3);
    }

    #[test]
    fn bracketed_dart_report_names_match() {
        let w = SourceWeights::default();
        assert_eq!(
            w.weight_for("dart", &meta(None, Some("[기재정정]주요사항보고서"))),
            1.35
        );
    }

    #[test]
    fn unknown_source_uses_fallback() {
        let w = SourceWeights::default();
        assert_eq!(w.weight_for("carrier_pigeon", &SignalMetadata::default()), 1.0);
    }
}
