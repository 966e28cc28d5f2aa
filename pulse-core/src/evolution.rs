//! Evolution calculator — percentage moves of the live price against each
//! reference anchor.
//!
//! Prices are read as the shortest decimal that round-trips their `f64`, and
//! the change is computed and rounded in decimal, so a quote of `101.005`
//! against `100` is exactly `1.005 %` and rounds to `1.01`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::debug;

use crate::domain::{EvolutionRecord, LiveQuote, ReferenceRecord};
use crate::live::LiveQuotes;
use crate::reference::ReferenceSet;

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64_retain(value))
}

/// Round to two decimals, half away from zero (`0.125` → `0.13`,
/// `-0.125` → `-0.13`). Negative zero comes back as `0.0`.
fn round2(value: Decimal) -> Option<f64> {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let out: f64 = rounded.to_string().parse().ok()?;
    Some(if out == 0.0 { 0.0 } else { out })
}

/// `(live / anchor - 1) * 100`, rounded; `None` unless both prices are
/// present and finite and the anchor is non-zero.
pub fn pct_change(live: Option<f64>, anchor: f64) -> Option<f64> {
    let live = live.filter(|p| p.is_finite()).and_then(to_decimal)?;
    let anchor = Some(anchor)
        .filter(|a| a.is_finite())
        .and_then(to_decimal)
        .filter(|a| !a.is_zero())?;
    let pct = live
        .checked_sub(anchor)?
        .checked_div(anchor)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    round2(pct)
}

/// Combine one reference record with its (possibly missing) quote.
pub fn evolve(reference: &ReferenceRecord, quote: Option<&LiveQuote>) -> EvolutionRecord {
    let live_price = quote.and_then(|q| q.live_price);
    EvolutionRecord {
        ticker: reference.ticker.clone(),
        name: quote.and_then(|q| q.name.clone()),
        live_price,
        prev_close: reference.prev_close.value,
        prev_close_date: reference.prev_close.date,
        one_week_ago: reference.one_week_ago.value,
        one_month_ago: reference.one_month_ago.value,
        one_year_ago: reference.one_year_ago.value,
        pct_vs_prev_close: pct_change(live_price, reference.prev_close.value),
        pct_vs_1w: pct_change(live_price, reference.one_week_ago.value),
        pct_vs_1m: pct_change(live_price, reference.one_month_ago.value),
        pct_vs_1y: pct_change(live_price, reference.one_year_ago.value),
        industry: quote.and_then(|q| q.industry.clone()),
        sector: quote.and_then(|q| q.sector.clone()),
    }
}

/// Left-join references with live quotes: one record per reference ticker,
/// in ticker order. Quotes for tickers without a reference are ignored.
pub fn compute_evolution(references: &ReferenceSet, quotes: &LiveQuotes) -> Vec<EvolutionRecord> {
    let records: Vec<EvolutionRecord> = references
        .records
        .values()
        .map(|reference| evolve(reference, quotes.get(&reference.ticker)))
        .collect();

    debug!(
        records = records.len(),
        priced = records.iter().filter(|r| r.live_price.is_some()).count(),
        "evolution computed"
    );

    records
}
