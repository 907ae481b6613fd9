use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::{HttpFetcher, RetryPolicy};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

/// Sentiment assigned to a message carrying an explicit Bullish/Bearish label.
const LABELED_SENTIMENT: f64 = 0.6;

pub struct StocktwitsGatherer {
    base_url: String,
    http: HttpFetcher,
}

impl StocktwitsGatherer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            base_url: "https://api.stocktwits.com/api/2".into(),
            http: HttpFetcher::new("stockpulse/0.1", policy),
        }
    }

    fn stream_url(&self, target: Option<&str>) -> String {
        match target {
            Some(symbol) => format!("{}/streams/symbol/{symbol}.json", self.base_url),
            None => format!("{}/streams/trending.json", self.base_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Stream {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: u64,
    body: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    symbols: Vec<SymbolRef>,
    #[serde(default)]
    entities: Option<Entities>,
    #[serde(default)]
    likes: Option<Likes>,
}

#[derive(Debug, Deserialize)]
struct User {
    username: String,
}

#[derive(Debug, Deserialize)]
struct SymbolRef {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    sentiment: Option<Sentiment>,
}

#[derive(Debug, Deserialize)]
struct Sentiment {
    basic: String,
}

#[derive(Debug, Deserialize)]
struct Likes {
    total: f64,
}

fn label_to_sentiment(label: &str) -> Option<f64> {
    match label.to_ascii_lowercase().as_str() {
        "bullish" => Some(LABELED_SENTIMENT),
        "bearish" => Some(-LABELED_SENTIMENT),
        _ => None,
    }
}

fn to_signal(message: Message) -> RawSignal {
    let id = message.id.to_string();
    let mut signal = RawSignal::new("stocktwits", id.clone())
        .with_body(message.body)
        .with_candidates(message.symbols.into_iter().map(|s| s.symbol));
    if let Some(at) = message
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        signal = signal.published(at.with_timezone(&Utc));
    }
    signal.url = Some(format!("https://stocktwits.com/message/{id}"));
    signal.author = message.user.map(|u| u.username);
    if let Some(likes) = message.likes {
        signal.engagement.insert("likes".into(), likes.total);
    }
    signal.metadata.sentiment = message
        .entities
        .and_then(|e| e.sentiment)
        .and_then(|s| label_to_sentiment(&s.basic));
    signal
}

#[async_trait]
impl SourceGatherer for StocktwitsGatherer {
    fn name(&self) -> &str {
        "stocktwits"
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == MarketScope::Us
    }

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        let url = self.stream_url(request.target_symbol.as_deref());
        let stream: Stream = self.http.get_json("stocktwits", |c| c.get(&url)).await?;
        Ok(stream
            .messages
            .into_iter()
            .take(request.max_items)
            .map(to_signal)
            .collect())
    }
}
