use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::{or_skip, HttpFetcher, RetryPolicy};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

const BASE_URL: &str = "https://www.reddit.com";

/// Public subreddit listings. No auth; Reddit only asks for a descriptive
/// user agent.
pub struct RedditGatherer {
    subreddits: Vec<String>,
    base_url: String,
    http: HttpFetcher,
}

impl RedditGatherer {
    pub fn new(subreddits: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            subreddits,
            base_url: BASE_URL.into(),
            http: HttpFetcher::new("stockpulse/0.1 (market research)", policy),
        }
    }

    pub fn default_subreddits(policy: RetryPolicy) -> Self {
        Self::new(
            vec![
                "stocks".into(),
                "investing".into(),
                "wallstreetbets".into(),
                "SecurityAnalysis".into(),
            ],
            policy,
        )
    }

    fn listing_url(&self, subreddit: &str, target: Option<&str>, limit: usize) -> String {
        match target {
            Some(symbol) => format!(
                "{}/r/{subreddit}/search.json?q=%24{symbol}&restrict_sr=1&sort=new&limit={limit}",
                self.base_url
            ),
            None => format!("{}/r/{subreddit}/hot.json?limit={limit}", self.base_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    num_comments: Option<f64>,
    #[serde(default)]
    upvote_ratio: Option<f64>,
    subreddit: String,
    #[serde(default)]
    link_flair_text: Option<String>,
    #[serde(default)]
    stickied: bool,
}

fn to_signal(post: Post) -> RawSignal {
    let mut signal = RawSignal::new("reddit", post.id).with_title(post.title);
    if !post.selftext.trim().is_empty() {
        signal = signal.with_body(post.selftext);
    }
    if let Some(at) = post
        .created_utc
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0))
    {
        signal = signal.published(at);
    }
    signal.url = (!post.permalink.is_empty()).then(|| format!("{BASE_URL}{}", post.permalink));
    signal.author = post.author;
    if let Some(score) = post.score {
        signal.engagement.insert("score".into(), score);
    }
    if let Some(comments) = post.num_comments {
        signal.engagement.insert("comments".into(), comments);
    }
    signal.metadata.community = Some(post.subreddit.to_lowercase());
    if let Some(flair) = post.link_flair_text {
        signal.metadata.extra.insert("flair".into(), json!(flair));
    }
    if let Some(ratio) = post.upvote_ratio {
        signal.metadata.extra.insert("upvote_ratio".into(), json!(ratio));
    }
    signal
}

#[async_trait]
impl SourceGatherer for RedditGatherer {
    fn name(&self) -> &str {
        "reddit"
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == MarketScope::Us
    }

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        let per_sub = (request.max_items / self.subreddits.len().max(1)).clamp(5, 100);
        let target = request.target_symbol.as_deref();
        let mut signals = Vec::new();

        for subreddit in &self.subreddits {
            let url = self.listing_url(subreddit, target, per_sub);
            let fetched = self
                .http
                .get_json::<Listing, _>(subreddit, |c| c.get(&url))
                .await;
            let Some(listing) = or_skip("reddit", subreddit, fetched) else {
                continue;
            };
            let before = signals.len();
            signals.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .map(|c| c.data)
                    .filter(|p| !p.stickied)
                    .map(to_signal),
            );
            debug!(subreddit = subreddit.as_str(), posts = signals.len() - before, "reddit listing");
            if signals.len() >= request.max_items {
                break;
            }
        }

        if let Some(symbol) = target {
            for signal in signals.iter_mut() {
                signal.symbol_candidates = vec![symbol.to_string()];
            }
        }
        Ok(signals)
    }
}
