use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market context a run targets. Selects gatherers, lexicon and scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketScope {
    /// US listings (cashtags, English lexicon).
    Us,
    /// Korean listings (6-digit codes, quant engine with hard gates).
    Kr,
}

impl MarketScope {
    pub const ALL: [MarketScope; 2] = [MarketScope::Us, MarketScope::Kr];

    /// Whether the quantitative engine and metadata enrichment apply.
    pub fn has_quant_engine(&self) -> bool {
        matches!(self, MarketScope::Kr)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketScope::Us => "us",
            MarketScope::Kr => "kr",
        }
    }

    /// Key of the single-flight lock guarding runs for this scope.
    pub fn lock_key(&self) -> String {
        format!("pipeline:{}", self.as_str())
    }

    /// Offset of the market's local calendar.
    pub fn utc_offset(&self) -> FixedOffset {
        match self {
            MarketScope::Us => Utc.fix(),
            MarketScope::Kr => FixedOffset::east_opt(9 * 3600).unwrap_or(Utc.fix()),
        }
    }

    /// Calendar date a report belongs to, in the market's local time.
    pub fn report_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset()).date_naive()
    }

    /// UTC span `[start, end)` covered by the local calendar day `date`.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset = Duration::seconds(i64::from(self.utc_offset().local_minus_utc()));
        let start = (date.and_time(NaiveTime::MIN) - offset).and_utc();
        (start, start + Duration::days(1))
    }
}

impl fmt::Display for MarketScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MarketScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us" | "global" => Ok(MarketScope::Us),
            "kr" | "krx" | "korea" => Ok(MarketScope::Kr),
            _ => Err(format!("Unknown market scope: '{s}'. Use 'us' or 'kr'")),
        }
    }
}
