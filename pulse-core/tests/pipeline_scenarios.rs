//! End-to-end scenarios for the reference → live → evolution → ranking chain,
//! driven by in-memory providers and a fixed run date.

use chrono::{Duration, NaiveDate};
use pulse_core::data::{
    download_history, DataError, HistoryProvider, PriceSeries, QuoteProvider, RawBar,
};
use pulse_core::reference::build_reference;
use pulse_core::{
    build_references, compute_evolution, join_live, rank_performers, DropReason, Horizon,
    LiveQuote, OverlapPolicy, Ticker, DEFAULT_TOP_N, MIN_SERIES_LEN,
};
use std::collections::{HashMap, HashSet};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn raw(date: NaiveDate, adj_close: f64) -> RawBar {
    RawBar {
        date,
        open: adj_close,
        high: adj_close,
        low: adj_close,
        close: adj_close,
        volume: 10_000,
        adj_close,
    }
}

/// Weekday bars from `start` through `end`, value drifting by `step` per day.
fn weekday_bars(start: NaiveDate, end: NaiveDate, base: f64, step: f64) -> Vec<RawBar> {
    use chrono::Datelike;
    let mut bars = Vec::new();
    let mut date = start;
    let mut value = base;
    while date <= end {
        if date.weekday().number_from_monday() <= 5 {
            bars.push(raw(date, value));
            value += step;
        }
        date += Duration::days(1);
    }
    bars
}

struct MemoryHistory {
    bars: HashMap<String, Vec<RawBar>>,
}

impl HistoryProvider for MemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawBar>, DataError> {
        Ok(self
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct MemoryQuotes {
    prices: HashMap<String, f64>,
}

impl QuoteProvider for MemoryQuotes {
    fn name(&self) -> &str {
        "memory"
    }

    fn quote(&self, symbol: &str) -> Result<LiveQuote, DataError> {
        let price = self
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| DataError::NetworkUnreachable(format!("timeout for {symbol}")))?;
        Ok(LiveQuote {
            ticker: symbol.to_string(),
            live_price: Some(price),
            name: Some(format!("{symbol} Holdings")),
            industry: Some("Industrials".into()),
            sector: Some("Machinery".into()),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// `n` tickers with two years of history, prev close 100, live prices
/// spread so that ticker `i` moves `i - n/2` percent.
fn universe(n: usize, as_of: NaiveDate) -> (MemoryHistory, MemoryQuotes, Vec<Ticker>) {
    let mut bars = HashMap::new();
    let mut prices = HashMap::new();
    let mut tickers = Vec::new();
    for i in 0..n {
        let ticker = format!("T{i:02}");
        let mut history = weekday_bars(as_of - Duration::days(730), as_of - Duration::days(3), 50.0, 0.0);
        // Second-to-last session closes at 100.
        let len = history.len();
        history[len - 2].adj_close = 100.0;
        bars.insert(ticker.clone(), history);
        prices.insert(ticker.clone(), 100.0 + i as f64 - (n / 2) as f64);
        tickers.push(ticker);
    }
    (MemoryHistory { bars }, MemoryQuotes { prices }, tickers)
}

fn run(n: usize, policy: OverlapPolicy) -> pulse_core::RankedResult {
    let as_of = d(2024, 6, 17);
    let (history, quotes, tickers) = universe(n, as_of);
    let download =
        download_history(&history, &tickers, as_of - Duration::days(730), as_of).unwrap();
    let refs = build_references(&download.table, &tickers, as_of, MIN_SERIES_LEN);
    let live = join_live(&quotes, &refs.tickers()).unwrap();
    let records = compute_evolution(&refs, &live);
    rank_performers(&records, DEFAULT_TOP_N, policy)
}

#[test]
fn fourteen_point_series_prev_close_is_second_to_last() {
    let values = [
        100.0, 102.0, 101.0, 103.0, 104.0, 103.0, 105.0, 106.0, 105.0, 107.0, 108.0, 107.0, 109.0,
        110.0,
    ];
    let mut pairs: Vec<(NaiveDate, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (d(2024, 1, 1) + Duration::days(i as i64), *v))
        .collect();
    // One year-old point so every horizon can be anchored.
    pairs.push((d(2023, 1, 2), 90.0));
    let series = PriceSeries::from_pairs(pairs).unwrap();

    let rec = build_reference("FOURTEEN", &series, d(2024, 1, 15), MIN_SERIES_LEN).unwrap();
    assert_eq!(rec.prev_close.value, 109.0);
    assert_eq!(rec.prev_close_date(), d(2024, 1, 13));
    assert_eq!(rec.one_week_ago.date, d(2024, 1, 8));
    assert_eq!(rec.one_week_ago.value, 106.0);
    assert_eq!(rec.one_month_ago.date, d(2023, 1, 2));
    assert_eq!(rec.one_year_ago.date, d(2023, 1, 2));
}

#[test]
fn fourteen_point_series_alone_cannot_anchor_one_month() {
    let series = PriceSeries::from_pairs(
        (0..14).map(|i| (d(2024, 1, 1) + Duration::days(i), 100.0 + i as f64)),
    )
    .unwrap();
    let err = build_reference("FOURTEEN", &series, d(2024, 1, 15), MIN_SERIES_LEN).unwrap_err();
    assert_eq!(
        err,
        DropReason::AnchorUnavailable {
            horizon: Horizon::OneMonth,
            target: d(2023, 12, 16),
        }
    );
}

#[test]
fn eight_point_series_produces_no_records() {
    let as_of = d(2024, 6, 17);
    let (mut history, mut quotes, mut tickers) = universe(3, as_of);
    history.bars.insert(
        "SHORT".into(),
        (0..8).map(|i| raw(as_of - Duration::days(8 - i), 10.0)).collect(),
    );
    quotes.prices.insert("SHORT".into(), 11.0);
    tickers.push("SHORT".into());

    let download =
        download_history(&history, &tickers, as_of - Duration::days(730), as_of).unwrap();
    let refs = build_references(&download.table, &tickers, as_of, MIN_SERIES_LEN);
    assert!(!refs.records.contains_key("SHORT"));
    assert_eq!(
        refs.dropped[0].reason,
        DropReason::InsufficientHistory {
            len: 8,
            required: 10
        }
    );

    let live = join_live(&quotes, &refs.tickers()).unwrap();
    assert!(live.get("SHORT").is_none(), "no live fetch for dropped tickers");
    let records = compute_evolution(&refs, &live);
    assert!(records.iter().all(|r| r.ticker != "SHORT"));
}

#[test]
fn twenty_five_tickers_give_disjoint_full_lists() {
    let ranked = run(25, OverlapPolicy::Allow);
    assert_eq!(ranked.top.len(), 10);
    assert_eq!(ranked.worst.len(), 10);
    let top: HashSet<&str> = ranked.top.iter().map(|r| r.ticker.as_str()).collect();
    let worst: HashSet<&str> = ranked.worst.iter().map(|r| r.ticker.as_str()).collect();
    assert!(top.is_disjoint(&worst));
    assert_eq!(ranked.top[0].ticker, "T24");
    assert_eq!(ranked.top[0].pct_vs_prev_close, Some(12.0));
    assert_eq!(ranked.worst[0].ticker, "T00");
    assert_eq!(ranked.worst[0].pct_vs_prev_close, Some(-12.0));
}

#[test]
fn twelve_tickers_overlap_when_allowed() {
    let ranked = run(12, OverlapPolicy::Allow);
    assert_eq!(ranked.top.len(), 10);
    assert_eq!(ranked.worst.len(), 10);
    let top: HashSet<&str> = ranked.top.iter().map(|r| r.ticker.as_str()).collect();
    let worst: HashSet<&str> = ranked.worst.iter().map(|r| r.ticker.as_str()).collect();
    // Middle eight (T02..T09) appear in both lists.
    assert_eq!(top.intersection(&worst).count(), 8);
}

#[test]
fn twelve_tickers_split_evenly_when_disjoint() {
    let ranked = run(12, OverlapPolicy::Disjoint);
    assert_eq!(ranked.top.len(), 6);
    assert_eq!(ranked.worst.len(), 6);
    let top: HashSet<&str> = ranked.top.iter().map(|r| r.ticker.as_str()).collect();
    let worst: HashSet<&str> = ranked.worst.iter().map(|r| r.ticker.as_str()).collect();
    assert!(top.is_disjoint(&worst));
}

#[test]
fn failed_live_quote_keeps_record_with_absent_percentages() {
    let as_of = d(2024, 6, 17);
    let (history, mut quotes, tickers) = universe(4, as_of);
    quotes.prices.remove("T01");

    let download =
        download_history(&history, &tickers, as_of - Duration::days(730), as_of).unwrap();
    let refs = build_references(&download.table, &tickers, as_of, MIN_SERIES_LEN);
    let live = join_live(&quotes, &refs.tickers()).unwrap();
    assert_eq!(live.failed, vec!["T01".to_string()]);

    let records = compute_evolution(&refs, &live);
    assert_eq!(records.len(), 4);
    let missing = records.iter().find(|r| r.ticker == "T01").unwrap();
    assert!(missing.live_price.is_none());
    assert!(missing.name.is_none());
    assert!(missing.pct_vs_prev_close.is_none());
    assert!(missing.pct_vs_1w.is_none());
    assert!(missing.pct_vs_1m.is_none());
    assert!(missing.pct_vs_1y.is_none());

    let ranked = rank_performers(&records, 2, OverlapPolicy::Allow);
    assert_eq!(ranked.worst[0].ticker, "T01");
    assert!(ranked.top.iter().all(|r| r.ticker != "T01"));
}
