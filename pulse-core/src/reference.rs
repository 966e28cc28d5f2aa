//! Reference builder — derives the four anchor prices per ticker.
//!
//! For each ticker the cleaned adjusted-close series yields:
//! - the previous close: the second-to-last point (the last point is treated
//!   as the current, possibly incomplete, session);
//! - one anchor per horizon (1W / 1M / 1Y): the latest trading date on or
//!   before `as_of - horizon`. Calendar-day horizons rarely land on a session,
//!   so an exact-date match is never required.
//!
//! A ticker either gets a complete record or is dropped with a reason; partial
//! records are never produced. The run date is passed in, so the same inputs
//! always give the same records.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{PriceSeries, PriceTable};
use crate::domain::{Anchor, Horizon, ReferenceRecord, Ticker};

/// Minimum number of clean points required to build a reference record.
pub const MIN_SERIES_LEN: usize = 10;

/// Why a ticker produced no reference record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    #[error("no usable price series")]
    MissingSeries,

    #[error("only {len} points, {required} required")]
    InsufficientHistory { len: usize, required: usize },

    #[error("no trading day on or before {target} for {horizon} anchor")]
    AnchorUnavailable { horizon: Horizon, target: NaiveDate },
}

/// A ticker that was filtered out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dropped {
    pub ticker: Ticker,
    #[serde(flatten)]
    pub reason: DropReason,
}

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.ticker, self.reason)
    }
}

/// Output of the reference stage: surviving records keyed by ticker, plus
/// the tickers that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    pub records: BTreeMap<Ticker, ReferenceRecord>,
    pub dropped: Vec<Dropped>,
}

impl ReferenceSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        self.records.keys().cloned().collect()
    }
}

/// Build the reference record for one cleaned series.
///
/// Points dated after `as_of` are ignored. `min_len` is the minimum number of
/// remaining points (normally [`MIN_SERIES_LEN`]); it is never taken below 2,
/// since a previous close needs two points.
pub fn build_reference(
    ticker: &str,
    series: &PriceSeries,
    as_of: NaiveDate,
    min_len: usize,
) -> Result<ReferenceRecord, DropReason> {
    let required = min_len.max(2);
    let series = series
        .truncated_after(as_of)
        .ok_or(DropReason::InsufficientHistory { len: 0, required })?;

    let len = series.len();
    if len < required {
        return Err(DropReason::InsufficientHistory { len, required });
    }

    let prev = series
        .get(len - 2)
        .ok_or(DropReason::InsufficientHistory { len, required })?;

    let anchor_for = |horizon: Horizon| -> Result<Anchor, DropReason> {
        let target = horizon.target(as_of);
        series
            .last_on_or_before(target)
            .map(|p| Anchor {
                date: p.date,
                value: p.value,
            })
            .ok_or(DropReason::AnchorUnavailable { horizon, target })
    };

    Ok(ReferenceRecord {
        ticker: ticker.to_string(),
        prev_close: Anchor {
            date: prev.date,
            value: prev.value,
        },
        one_week_ago: anchor_for(Horizon::OneWeek)?,
        one_month_ago: anchor_for(Horizon::OneMonth)?,
        one_year_ago: anchor_for(Horizon::OneYear)?,
    })
}

/// Reference record (or drop reason) for a ticker looked up in a raw table.
pub fn reference_outcome(
    table: &PriceTable,
    ticker: &str,
    as_of: NaiveDate,
    min_len: usize,
) -> Result<ReferenceRecord, DropReason> {
    let series = table
        .adjusted_close_series(ticker)
        .ok_or(DropReason::MissingSeries)?;
    build_reference(ticker, &series, as_of, min_len)
}

/// Build reference records for every ticker, independently.
///
/// Duplicate tickers in the input are processed once.
pub fn build_references(
    table: &PriceTable,
    tickers: &[Ticker],
    as_of: NaiveDate,
    min_len: usize,
) -> ReferenceSet {
    let mut set = ReferenceSet::default();

    for ticker in tickers {
        if set.records.contains_key(ticker) || set.dropped.iter().any(|d| &d.ticker == ticker) {
            continue;
        }
        match reference_outcome(table, ticker, as_of, min_len) {
            Ok(record) => {
                set.records.insert(ticker.clone(), record);
            }
            Err(reason) => {
                debug!(ticker = %ticker, %reason, "dropping ticker");
                set.dropped.push(Dropped {
                    ticker: ticker.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        %as_of,
        kept = set.records.len(),
        dropped = set.dropped.len(),
        "reference prices built"
    );

    set
}
