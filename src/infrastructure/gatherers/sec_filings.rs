use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::Entry;

use super::http::{or_skip, HttpFetcher, RetryPolicy};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

const EDGAR_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar";
const DEFAULT_FORMS: &[&str] = &["8-K", "4", "10-Q"];

/// EDGAR filing feeds (Atom). EDGAR rejects requests without a contact
/// user agent, so one must be configured.
pub struct SecFilingsGatherer {
    http: Option<HttpFetcher>,
    forms: Vec<String>,
}

impl SecFilingsGatherer {
    pub fn new(user_agent: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            http: user_agent
                .filter(|ua| !ua.trim().is_empty())
                .map(|ua| HttpFetcher::new(&ua, policy)),
            forms: DEFAULT_FORMS.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn feed_url(form: &str, target: Option<&str>, count: usize) -> String {
        match target {
            Some(symbol) => format!(
                "{EDGAR_URL}?action=getcompany&CIK={symbol}&type={form}&dateb=&owner=include&count={count}&output=atom"
            ),
            None => format!(
                "{EDGAR_URL}?action=getcurrent&type={form}&company=&dateb=&owner=include&start=0&count={count}&output=atom"
            ),
        }
    }
}

/// `"8-K - Apple Inc. (0000320193) (Filer)"` → form and company.
fn split_title(title: &str) -> (Option<&str>, &str) {
    match title.split_once(" - ") {
        Some((form, rest)) => {
            let company = rest.split(" (").next().unwrap_or(rest);
            (Some(form.trim()), company.trim())
        }
        None => (None, title.trim()),
    }
}

fn to_signal(entry: Entry, fallback_form: &str) -> RawSignal {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let (form, company) = split_title(&title);
    let form = entry
        .categories
        .first()
        .map(|c| c.term.clone())
        .or_else(|| form.map(str::to_string))
        .unwrap_or_else(|| fallback_form.to_string());
    let summary = entry.summary.map(|s| s.content);

    let mut signal = RawSignal::new("sec_filings", entry.id.clone())
        .with_title(format!("{form} filing: {company}"));
    if let Some(summary) = summary {
        signal = signal.with_body(summary);
    }
    if let Some(at) = entry.updated.or(entry.published) {
        signal = signal.published(at.with_timezone(&Utc));
    }
    signal.url = entry.links.first().map(|l| l.href.clone());
    signal.metadata.filing_type = Some(form);
    signal
}

pub fn parse_feed(bytes: &[u8], fallback_form: &str) -> Result<Vec<RawSignal>, GatherError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| GatherError::Parse(e.to_string()))?;
    Ok(feed
        .entries
        .into_iter()
        .map(|e| to_signal(e, fallback_form))
        .collect())
}

#[async_trait]
impl SourceGatherer for SecFilingsGatherer {
    fn name(&self) -> &str {
        "sec_filings"
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == MarketScope::Us
    }

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| GatherError::Config("STOCKPULSE_SEC_USER_AGENT is not set".into()))?;
        let target = request.target_symbol.as_deref();
        let count = request.max_items.clamp(10, 100);
        let mut signals = Vec::new();

        for form in &self.forms {
            let url = Self::feed_url(form, target, count);
            let fetched = http.get_bytes(form, |c| c.get(&url)).await;
            let Some(bytes) = or_skip("sec_filings", form, fetched) else {
                continue;
            };
            let Some(batch) = or_skip("sec_filings", form, parse_feed(&bytes, form)) else {
                continue;
            };
            signals.extend(batch);
        }

        if let Some(symbol) = target {
            for signal in signals.iter_mut() {
                signal.symbol_candidates = vec![symbol.to_string()];
            }
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<feed xmlns="http://www.w3.org/2005/Atom">
<title>Latest Filings</title>
<id>urn:tag:sec.gov,2008:feed</id>
<updated>2026-03-02T16:00:00-05:00</updated>
<entry>
<title>8-K - Apple Inc. (0000320193) (Filer)</title>
<link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/320193/x-index.htm"/>
<summary type="html">Item 2.02 Results of Operations</summary>
<updated>2026-03-02T16:01:00-05:00</updated>
<category scheme="https://www.sec.gov/" label="form type" term="8-K"/>
<id>urn:tag:sec.gov,2008:accession-number=0000320193-26-000010</id>
</entry>
</feed>"#;

    #[test]
    fn atom_entries_become_filings() {
        let signals = parse_feed(ATOM.as_bytes(), "8-K").unwrap();
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.source, "sec_filings");
        assert!(s.external_id.contains("0000320193-26-000010"));
        assert_eq!(s.metadata.filing_type.as_deref(), Some("8-K"));
        assert_eq!(s.title.as_deref(), Some("8-K filing: Apple Inc."));
        assert!(s.published_at.is_some());
    }

    #[tokio::test]
    async fn missing_user_agent_is_a_config_error() {
        let g = SecFilingsGatherer::new(None, RetryPolicy::default());
        let req = GatherRequest {
            scope: MarketScope::Us,
            target_symbol: None,
            max_items: 10,
        };
        assert!(matches!(g.gather(&req).await, Err(GatherError::Config(_))));
    }

    #[test]
    fn title_split() {
        assert_eq!(
            split_title("4 - Doe John (0001234567) (Reporting)"),
            (Some("4"), "Doe John")
        );
        assert_eq!(split_title("odd"), (None, "odd"));
    }
}
