//! Criterion benchmarks for MarketPulse hot paths.
//!
//! Benchmarks:
//! 1. Series cleaning (raw bars → adjusted-close series)
//! 2. Reference building over a whole universe
//! 3. Evolution join and ranking

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pulse_core::data::{PriceSeries, PriceTable, RawBar};
use pulse_core::{
    build_references, compute_evolution, rank_performers, LiveQuote, LiveQuotes, OverlapPolicy,
    Ticker, DEFAULT_TOP_N, MIN_SERIES_LEN,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 17).unwrap()
}

fn make_raw_bars(n: usize, seed: usize) -> Vec<RawBar> {
    let start = as_of() - Duration::days(n as i64);
    (0..n)
        .map(|i| {
            let close = 100.0 + ((i + seed) as f64 * 0.1).sin() * 10.0;
            RawBar {
                date: start + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
                adj_close: close,
            }
        })
        .collect()
}

fn make_universe(symbols: usize, bars: usize) -> (PriceTable, Vec<Ticker>) {
    let tickers: Vec<Ticker> = (0..symbols).map(|i| format!("SYM{i:04}")).collect();
    let table = tickers
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), make_raw_bars(bars, i)))
        .collect();
    (table, tickers)
}

fn make_quotes(tickers: &[Ticker]) -> LiveQuotes {
    let mut quotes = LiveQuotes::default();
    for (i, ticker) in tickers.iter().enumerate() {
        quotes.quotes.insert(
            ticker.clone(),
            LiveQuote {
                ticker: ticker.clone(),
                live_price: Some(95.0 + (i % 11) as f64),
                ..Default::default()
            },
        );
    }
    quotes
}

// ── 1. Series cleaning ───────────────────────────────────────────────

fn bench_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_cleaning");

    for &bar_count in &[252, 730, 2520] {
        let mut raw = make_raw_bars(bar_count, 0);
        // A few holes, as providers return them.
        for bar in raw.iter_mut().step_by(37) {
            bar.adj_close = f64::NAN;
        }
        group.bench_with_input(BenchmarkId::new("from_raw", bar_count), &raw, |b, raw| {
            b.iter(|| PriceSeries::from_raw(black_box(raw)));
        });
    }

    group.finish();
}

// ── 2. Reference building ────────────────────────────────────────────

fn bench_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("references");

    for &symbols in &[50, 500] {
        let (table, tickers) = make_universe(symbols, 730);
        group.bench_with_input(
            BenchmarkId::new("730_bars", symbols),
            &symbols,
            |b, _| {
                b.iter(|| {
                    build_references(
                        black_box(&table),
                        black_box(&tickers),
                        as_of(),
                        MIN_SERIES_LEN,
                    )
                });
            },
        );
    }

    group.finish();
}

// ── 3. Evolution and ranking ─────────────────────────────────────────

fn bench_evolution_and_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution_ranking");

    let (table, tickers) = make_universe(500, 730);
    let refs = build_references(&table, &tickers, as_of(), MIN_SERIES_LEN);
    let quotes = make_quotes(&tickers);
    let records = compute_evolution(&refs, &quotes);

    group.bench_function("compute_evolution_500", |b| {
        b.iter(|| compute_evolution(black_box(&refs), black_box(&quotes)));
    });

    group.bench_function("rank_500_allow", |b| {
        b.iter(|| rank_performers(black_box(&records), DEFAULT_TOP_N, OverlapPolicy::Allow));
    });

    group.bench_function("rank_500_disjoint", |b| {
        b.iter(|| rank_performers(black_box(&records), DEFAULT_TOP_N, OverlapPolicy::Disjoint));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_series,
    bench_references,
    bench_evolution_and_ranking,
);
criterion_main!(benches);
