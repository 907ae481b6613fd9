use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::error::DomainError;
use crate::domain::ports::quote_provider::{QuoteProvider, QuoteSnapshot};
use crate::domain::values::market_scope::MarketScope;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const AVG_VOLUME_WINDOW: usize = 20;
const NEAR_HIGH_RATIO: f64 = 0.95;

/// Quote snapshots from the Yahoo Finance v8 chart API (no auth required).
pub struct YahooQuoteProvider {
    client: Client,
}

impl YahooQuoteProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                     AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/120.0.0.0 Safari/537.36",
                )
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch_chart(&self, ticker: &str) -> Result<Option<ChartData>, DomainError> {
        let url = format!("{CHART_URL}/{ticker}?range=3mo&interval=1d");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Parse(format!("yahoo request for {ticker}: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(DomainError::Parse(format!(
                "yahoo returned {} for {ticker}",
                resp.status()
            )));
        }

        let data: ChartResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Parse(format!("yahoo body for {ticker}: {e}")))?;
        Ok(data.chart.result.and_then(|r| r.into_iter().next()))
    }
}

impl Default for YahooQuoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Exchange-qualified tickers to try, in order.
pub fn tickers_for(scope: MarketScope, symbol: &str) -> Vec<String> {
    match scope {
        MarketScope::Kr => vec![format!("{symbol}.KS"), format!("{symbol}.KQ")],
        MarketScope::Us => vec![symbol.replace('.', "-")],
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    fifty_two_week_high: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn pct_vs_ma(price: f64, closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window {
        return None;
    }
    let ma = mean(&closes[closes.len() - window..])?;
    (ma > 0.0).then(|| (price - ma) / ma * 100.0)
}

/// Derive the snapshot fields from daily closes and volumes (oldest first,
/// gaps already removed).
fn derive(
    symbol: &str,
    price: f64,
    closes: &[f64],
    volumes: &[f64],
    high_52w: Option<f64>,
) -> QuoteSnapshot {
    let volume_ratio = volumes.split_last().and_then(|(last, prior)| {
        let window = &prior[prior.len().saturating_sub(AVG_VOLUME_WINDOW)..];
        mean(window).filter(|avg| *avg > 0.0).map(|avg| last / avg)
    });
    QuoteSnapshot {
        symbol: symbol.to_string(),
        price,
        volume_ratio,
        price_vs_ma5_pct: pct_vs_ma(price, closes, 5),
        price_vs_ma20_pct: pct_vs_ma(price, closes, 20),
        foreign_net_buy: None,
        institution_net_buy: None,
        near_52w_high: high_52w
            .filter(|h| *h > 0.0)
            .map(|h| price >= h * NEAR_HIGH_RATIO),
        fetched_at: Utc::now(),
    }
}

fn snapshot_from_chart(symbol: &str, data: ChartData) -> Option<QuoteSnapshot> {
    let series = data
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default();
    let closes: Vec<f64> = series.close.into_iter().flatten().collect();
    let volumes: Vec<f64> = series.volume.into_iter().flatten().collect();
    let price = data.meta.regular_market_price.or(closes.last().copied())?;
    // 3 months of dailies cover the 52-week high only partially.
    let high = data
        .meta
        .fifty_two_week_high
        .or_else(|| closes.iter().copied().reduce(f64::max));
    Some(derive(symbol, price, &closes, &volumes, high))
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn snapshot(
        &self,
        scope: MarketScope,
        symbol: &str,
    ) -> Result<Option<QuoteSnapshot>, DomainError> {
        for ticker in tickers_for(scope, symbol) {
            if let Some(data) = self.fetch_chart(&ticker).await? {
                if let Some(snapshot) = snapshot_from_chart(symbol, data) {
                    return Ok(Some(snapshot));
                }
            }
        }
        Ok(None)
    }
}
