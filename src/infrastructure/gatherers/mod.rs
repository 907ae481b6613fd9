pub mod dart;
pub mod http;
pub mod news_rss;
pub mod reddit;
pub mod sec_filings;
pub mod stocktwits;

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::domain::ports::source_gatherer::SourceGatherer;
use crate::domain::values::market_scope::MarketScope;

use self::dart::DartGatherer;
use self::http::RetryPolicy;
use self::news_rss::NewsRssGatherer;
use self::reddit::RedditGatherer;
use self::sec_filings::SecFilingsGatherer;
use self::stocktwits::StocktwitsGatherer;

/// Credentials some sources need. A missing one makes that source fail with
/// a config error at gather time; the others still run.
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    pub sec_user_agent: Option<String>,
    pub dart_api_key: Option<String>,
}

impl SourceCredentials {
    pub fn from_env() -> Self {
        Self {
            sec_user_agent: std::env::var("STOCKPULSE_SEC_USER_AGENT").ok(),
            dart_api_key: std::env::var("STOCKPULSE_DART_API_KEY").ok(),
        }
    }
}

/// Every built-in gatherer for both scopes.
pub fn default_gatherers(
    config: &PipelineConfig,
    credentials: SourceCredentials,
) -> Vec<Arc<dyn SourceGatherer>> {
    let policy = RetryPolicy::from_config(config);
    vec![
        Arc::new(RedditGatherer::default_subreddits(policy)),
        Arc::new(StocktwitsGatherer::new(policy)),
        Arc::new(SecFilingsGatherer::new(credentials.sec_user_agent, policy)),
        Arc::new(NewsRssGatherer::new(MarketScope::Us, policy)),
        Arc::new(NewsRssGatherer::new(MarketScope::Kr, policy)),
        Arc::new(DartGatherer::new(credentials.dart_api_key, policy)),
    ]
}
