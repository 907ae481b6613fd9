use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Engagement counters reported by a source (`score`, `comments`, `likes`, ...).
pub type Engagement = BTreeMap<String, f64>;

/// Signal metadata with typed fields for every key the pipeline reads.
/// Source-specific passthrough keys land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Sentiment supplied by the source itself, in `[-1, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
    /// Sub-community (subreddit, board) the post came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    /// Disclosure form or report name for filings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_type: Option<String>,
    /// Latest volume divided by the 20-period average volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_ratio: Option<f64>,
    /// Percent distance of the last price from the 5-period moving average.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_vs_ma5_pct: Option<f64>,
    /// Percent distance of the last price from the 20-period moving average.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_vs_ma20_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_net_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_net_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near_52w_high: Option<bool>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl SignalMetadata {
    /// JSON merge-patch: fields present in `patch` win, absent ones are kept.
    /// A `null` in the passthrough bag deletes that key.
    pub fn merge_patch(&mut self, patch: &SignalMetadata) {
        fn take<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
            if incoming.is_some() {
                *slot = incoming.clone();
            }
        }
        take(&mut self.sentiment, &patch.sentiment);
        take(&mut self.community, &patch.community);
        take(&mut self.filing_type, &patch.filing_type);
        take(&mut self.volume_ratio, &patch.volume_ratio);
        take(&mut self.price_vs_ma5_pct, &patch.price_vs_ma5_pct);
        take(&mut self.price_vs_ma20_pct, &patch.price_vs_ma20_pct);
        take(&mut self.foreign_net_buy, &patch.foreign_net_buy);
        take(&mut self.institution_net_buy, &patch.institution_net_buy);
        take(&mut self.near_52w_high, &patch.near_52w_high);
        for (key, value) in &patch.extra {
            if value.is_null() {
                self.extra.remove(key);
            } else {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }

    /// Sub-key used for source weighting: community first, then filing type.
    pub fn source_sub_key(&self) -> Option<&str> {
        self.community
            .as_deref()
            .or(self.filing_type.as_deref())
    }

    pub fn has_flow(&self) -> bool {
        self.foreign_net_buy.is_some() || self.institution_net_buy.is_some()
    }

    pub fn has_moving_averages(&self) -> bool {
        self.price_vs_ma5_pct.is_some() || self.price_vs_ma20_pct.is_some()
    }
}

pub fn engagement_total(engagement: &Engagement) -> f64 {
    engagement.values().filter(|v| v.is_finite() && **v > 0.0).sum()
}
