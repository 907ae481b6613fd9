use std::sync::Arc;
use stockpulse::application::normalize::Normalizer;
use stockpulse::domain::entities::raw_signal::RawSignal;
use stockpulse::domain::values::market_scope::MarketScope;
use stockpulse::infrastructure::universe::in_memory::InMemoryTickerUniverse;

fn kr_universe() -> Arc<InMemoryTickerUniverse> {
    let universe = InMemoryTickerUniverse::new();
    universe.load(
        MarketScope::Kr,
        [
            ("005930".to_string(), "삼성전자".to_string()),
            ("000660".to_string(), "SK하이닉스".to_string()),
        ],
    );
    Arc::new(universe)
}

#[test]
fn cashtags_fan_out_into_one_record_per_symbol() {
    let normalizer = Normalizer::new(Arc::new(InMemoryTickerUniverse::new()));
    let raw = vec![RawSignal::new("reddit", "1").with_title("$AAPL vs $TSLA, $AAPL wins")];
    let out = normalizer.normalize(MarketScope::Us, &raw, None);
    let symbols: Vec<_> = out.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "TSLA"]);
    assert!(out.iter().all(|s| s.raw_id == raw[0].id));
}

#[test]
fn six_digit_codes_need_membership_once_loaded() {
    let raw = vec![RawSignal::new("news_rss", "1").with_title("005930 강세, 123450 급락")];

    let cold = Normalizer::new(Arc::new(InMemoryTickerUniverse::new()));
    let symbols: Vec<_> = cold
        .normalize(MarketScope::Kr, &raw, None)
        .into_iter()
        .map(|s| s.symbol)
        .collect();
    assert_eq!(symbols, vec!["005930", "123450"]);

    let loaded = Normalizer::new(kr_universe());
    let symbols: Vec<_> = loaded
        .normalize(MarketScope::Kr, &raw, None)
        .into_iter()
        .map(|s| s.symbol)
        .collect();
    assert_eq!(symbols, vec!["005930"]);
}

#[test]
fn company_names_resolve_through_the_universe() {
    let normalizer = Normalizer::new(kr_universe());
    let raw = vec![RawSignal::new("news_rss", "1").with_title("SK하이닉스, HBM 공급계약 체결")];
    let out = normalizer.normalize(MarketScope::Kr, &raw, None);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].symbol, "000660");
}

#[test]
fn explicit_candidates_bypass_text_extraction() {
    let normalizer = Normalizer::new(kr_universe());
    let raw = vec![RawSignal::new("dart", "1")
        .with_title("[삼성전자] 주요사항보고서 005930")
        .with_candidates(["A000660"])];
    let out = normalizer.normalize(MarketScope::Kr, &raw, None);
    let symbols: Vec<_> = out.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["000660"]);
}

#[test]
fn target_keeps_only_that_symbol() {
    let normalizer = Normalizer::new(Arc::new(InMemoryTickerUniverse::new()));
    let raw = vec![RawSignal::new("stocktwits", "9").with_candidates(["AAPL", "MSFT"])];
    let out = normalizer.normalize(MarketScope::Us, &raw, Some("msft"));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].symbol, "MSFT");
}
