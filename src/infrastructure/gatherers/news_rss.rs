use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::Entry;

use super::http::{or_skip, HttpFetcher, RetryPolicy};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

const US_FEEDS: &[&str] = &[
    "https://www.cnbc.com/id/100003114/device/rss/rss.html",
    "https://feeds.content.dowjones.io/public/rss/mw_topstories",
];
const YAHOO_HEADLINES: &str = "https://feeds.finance.yahoo.com/rss/2.0/headline";
const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";
const KR_DEFAULT_QUERY: &str = "특징주";

/// Headline RSS/Atom feeds for either market.
pub struct NewsRssGatherer {
    scope: MarketScope,
    http: HttpFetcher,
}

enum FeedSpec {
    Plain(String),
    Query(&'static str, Vec<(&'static str, String)>),
}

impl NewsRssGatherer {
    pub fn new(scope: MarketScope, policy: RetryPolicy) -> Self {
        Self {
            scope,
            http: HttpFetcher::new("Mozilla/5.0 (compatible; stockpulse/0.1)", policy),
        }
    }

    fn feeds(&self, target: Option<&str>) -> Vec<FeedSpec> {
        match (self.scope, target) {
            (MarketScope::Us, Some(symbol)) => vec![FeedSpec::Query(
                YAHOO_HEADLINES,
                vec![
                    ("s", symbol.to_string()),
                    ("region", "US".into()),
                    ("lang", "en-US".into()),
                ],
            )],
            (MarketScope::Us, None) => US_FEEDS.iter().map(|u| FeedSpec::Plain(u.to_string())).collect(),
            (MarketScope::Kr, target) => vec![FeedSpec::Query(
                GOOGLE_NEWS_SEARCH,
                vec![
                    ("q", target.unwrap_or(KR_DEFAULT_QUERY).to_string()),
                    ("hl", "ko".into()),
                    ("gl", "KR".into()),
                    ("ceid", "KR:ko".into()),
                ],
            )],
        }
    }
}

fn to_signal(entry: Entry, outlet: Option<&str>) -> Option<RawSignal> {
    let title = entry.title.map(|t| t.content)?;
    let url = entry.links.first().map(|l| l.href.clone());
    let external_id = if entry.id.is_empty() {
        url.clone()?
    } else {
        entry.id
    };

    let mut signal = RawSignal::new("news_rss", external_id).with_title(title);
    if let Some(summary) = entry.summary.map(|s| s.content) {
        signal = signal.with_body(summary);
    }
    if let Some(at) = entry.published.or(entry.updated) {
        signal = signal.published(at.with_timezone(&Utc));
    }
    signal.url = url;
    signal.author = outlet.map(str::to_string);
    Some(signal)
}

/// Parse one feed document. Entries without a title are dropped.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawSignal>, GatherError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| GatherError::Parse(e.to_string()))?;
    let outlet = feed.title.map(|t| t.content);
    Ok(feed
        .entries
        .into_iter()
        .filter_map(|e| to_signal(e, outlet.as_deref()))
        .collect())
}

#[async_trait]
impl SourceGatherer for NewsRssGatherer {
    fn name(&self) -> &str {
        "news_rss"
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == self.scope
    }

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        let target = request.target_symbol.as_deref();
        let feeds = self.feeds(target);
        let mut signals = Vec::new();
        let mut last_err = None;
        let mut fetched_any = false;

        for spec in &feeds {
            let fetched = match spec {
                FeedSpec::Plain(url) => self.http.get_bytes(url, |c| c.get(url)).await,
                FeedSpec::Query(base, params) => {
                    self.http.get_bytes(base, |c| c.get(*base).query(params)).await
                }
            };
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            fetched_any = true;
            if let Some(batch) = or_skip("news_rss", "parse", parse_feed(&bytes)) {
                signals.extend(batch);
            }
        }

        // Every feed failing is a gatherer failure, not an empty result.
        if !fetched_any {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        if let Some(symbol) = target {
            for signal in signals.iter_mut() {
                signal.symbol_candidates = vec![symbol.to_string()];
            }
        }
        signals.truncate(request.max_items);
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>한국경제</title>
<link>https://example.kr</link>
<description>news</description>
<item>
  <title>[특징주] 삼성전자(005930), 외국인 순매수에 신고가</title>
  <link>https://example.kr/a/1</link>
  <guid>https://example.kr/a/1</guid>
  <pubDate>Mon, 02 Mar 2026 01:00:00 GMT</pubDate>
</item>
<item>
  <description>no title here</description>
  <guid>orphan</guid>
</item>
</channel></rss>"#;

    #[test]
    fn rss_items_become_signals() {
        let signals = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.source, "news_rss");
        assert!(s.title.as_deref().unwrap().contains("005930"));
        assert_eq!(s.url.as_deref(), Some("https://example.kr/a/1"));
        assert_eq!(s.author.as_deref(), Some("한국경제"));
        assert!(s.published_at.is_some());
    }

    #[test]
    fn feed_choice_follows_scope_and_target() {
        let us = NewsRssGatherer::new(MarketScope::Us, RetryPolicy::default());
        assert_eq!(us.feeds(None).len(), US_FEEDS.len());
        assert!(matches!(us.feeds(Some("AAPL")).as_slice(), [FeedSpec::Query(YAHOO_HEADLINES, _)]));

        let kr = NewsRssGatherer::new(MarketScope::Kr, RetryPolicy::default());
        match kr.feeds(None).as_slice() {
            [FeedSpec::Query(_, params)] => {
                assert!(params.contains(&("q", KR_DEFAULT_QUERY.to_string())))
            }
            _ => panic!("expected one google news query"),
        }
        assert!(kr.supports(MarketScope::Kr));
        assert!(!kr.supports(MarketScope::Us));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_feed(b"not xml at all"), Err(GatherError::Parse(_))));
    }
}
