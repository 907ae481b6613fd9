use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use super::http::{HttpFetcher, RetryPolicy};
use crate::domain::entities::raw_signal::RawSignal;
use crate::domain::error::GatherError;
use crate::domain::ports::source_gatherer::{GatherRequest, SourceGatherer};
use crate::domain::values::market_scope::MarketScope;

const LIST_URL: &str = "https://opendart.fss.or.kr/api/list.json";
const LOOKBACK_DAYS: i64 = 3;
const STATUS_OK: &str = "000";
const STATUS_NO_DATA: &str = "013";

fn kst() -> FixedOffset {
    MarketScope::Kr.utc_offset()
}

/// OpenDART disclosure list (Korean regulatory filings).
pub struct DartGatherer {
    api_key: Option<String>,
    http: HttpFetcher,
}

impl DartGatherer {
    pub fn new(api_key: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http: HttpFetcher::new("stockpulse/0.1", policy),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    list: Vec<Disclosure>,
}

#[derive(Debug, Deserialize)]
struct Disclosure {
    corp_name: String,
    #[serde(default)]
    stock_code: String,
    report_nm: String,
    rcept_no: String,
    #[serde(default)]
    flr_nm: Option<String>,
    #[serde(default)]
    rcept_dt: Option<String>,
}

/// Filing date (`YYYYMMDD`) at midnight KST.
fn receipt_time(rcept_dt: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(rcept_dt, "%Y%m%d").ok()?;
    let local = kst().from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()?;
    Some(local.with_timezone(&Utc))
}

fn to_signal(item: Disclosure) -> Option<RawSignal> {
    let code = item.stock_code.trim();
    if code.is_empty() {
        return None;
    }
    let report = item.report_nm.trim().to_string();
    let mut signal = RawSignal::new("dart", item.rcept_no.clone())
        .with_title(format!("[{}] {}", item.corp_name.trim(), report))
        .with_candidates([code]);
    if let Some(at) = item.rcept_dt.as_deref().and_then(receipt_time) {
        signal = signal.published(at);
    }
    signal.url = Some(format!(
        "https://dart.fss.or.kr/dsaf001/main.do?rcpNo={}",
        item.rcept_no
    ));
    signal.author = item.flr_nm;
    signal.metadata.filing_type = Some(report);
    Some(signal)
}

fn into_signals(resp: ListResponse) -> Result<Vec<RawSignal>, GatherError> {
    match resp.status.as_str() {
        STATUS_OK => Ok(resp.list.into_iter().filter_map(to_signal).collect()),
        STATUS_NO_DATA => Ok(Vec::new()),
        other => Err(GatherError::Network(format!(
            "opendart status {other}: {}",
            resp.message
        ))),
    }
}

#[async_trait]
impl SourceGatherer for DartGatherer {
    fn name(&self) -> &str {
        "dart"
    }

    fn supports(&self, scope: MarketScope) -> bool {
        scope == MarketScope::Kr
    }

    async fn gather(&self, request: &GatherRequest) -> Result<Vec<RawSignal>, GatherError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatherError::Config("STOCKPULSE_DART_API_KEY is not set".into()))?;

        let today = Utc::now().with_timezone(&kst()).date_naive();
        let begin = today - ChronoDuration::days(LOOKBACK_DAYS);
        let params = [
            ("crtfc_key", key.to_string()),
            ("bgn_de", begin.format("%Y%m%d").to_string()),
            ("end_de", today.format("%Y%m%d").to_string()),
            ("page_count", request.max_items.clamp(1, 100).to_string()),
        ];
        let resp: ListResponse = self
            .http
            .get_json("dart", |c| c.get(LIST_URL).query(&params))
            .await?;
        let mut signals = into_signals(resp)?;

        if let Some(target) = request.target_symbol.as_deref() {
            signals.retain(|s| s.symbol_candidates.iter().any(|c| c == target));
        }
        debug!(count = signals.len(), "dart disclosures");
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_disclosures_become_signals() {
        let body = r#"{"status":"000","message":"정상","list":[
            {"corp_code":"00126380","corp_name":"삼성전자","stock_code":"005930","corp_cls":"Y",
             "report_nm":"단일판매ㆍ공급계약체결","rcept_no":"20260302000123","flr_nm":"삼성전자","rcept_dt":"20260302","rm":""},
            {"corp_code":"99999999","corp_name":"비상장","stock_code":" ","corp_cls":"E",
             "report_nm":"감사보고서제출","rcept_no":"20260302000999","rcept_dt":"20260302"}
        ]}"#;
        let resp: ListResponse = serde_json::from_str(body).unwrap();
        let signals = into_signals(resp).unwrap();
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.external_id, "20260302000123");
        assert_eq!(s.title.as_deref(), Some("[삼성전자] 단일판매ㆍ공급계약체결"));
        assert_eq!(s.symbol_candidates, vec!["005930"]);
        assert_eq!(s.metadata.filing_type.as_deref(), Some("단일판매ㆍ공급계약체결"));
        assert_eq!(
            s.published_at.unwrap().to_rfc3339(),
            "2026-03-01T15:00:00+00:00"
        );
    }

    #[test]
    fn no_data_status_is_empty_not_error() {
        let resp: ListResponse =
            serde_json::from_str(r#"{"status":"013","message":"조회된 데이타가 없습니다."}"#).unwrap();
        assert!(into_signals(resp).unwrap().is_empty());

        let resp: ListResponse =
            serde_json::from_str(r#"{"status":"020","message":"요청 제한을 초과하였습니다."}"#).unwrap();
        assert!(into_signals(resp).is_err());
    }

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let g = DartGatherer::new(Some("  ".into()), RetryPolicy::default());
        let req = GatherRequest {
            scope: MarketScope::Kr,
            target_symbol: None,
            max_items: 10,
        };
        assert!(matches!(g.gather(&req).await, Err(GatherError::Config(_))));
    }
}
