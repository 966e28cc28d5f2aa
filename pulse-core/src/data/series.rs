//! Raw price tables and cleaned adjusted-close series.
//!
//! A `PriceTable` holds whatever the history provider returned, per ticker.
//! `PriceTable::adjusted_close_series` is the only way to obtain a
//! `PriceSeries`, which guarantees the series invariant: dates strictly
//! increasing, no duplicates, every value finite.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::provider::RawBar;
use crate::domain::Ticker;

/// One adjusted-close observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Clean, date-sorted adjusted-close series for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw bars: drop non-finite adjusted closes, sort
    /// ascending, and keep the last bar supplied for any repeated date.
    ///
    /// Returns `None` if nothing survives.
    pub fn from_raw(bars: &[RawBar]) -> Option<Self> {
        let by_date: BTreeMap<NaiveDate, f64> = bars
            .iter()
            .filter(|b| b.adj_close.is_finite())
            .map(|b| (b.date, b.adj_close))
            .collect();
        Self::from_sorted_map(by_date)
    }

    /// Build a series directly from `(date, value)` pairs. Same cleaning rules
    /// as [`PriceSeries::from_raw`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Option<Self> {
        let by_date: BTreeMap<NaiveDate, f64> =
            pairs.into_iter().filter(|(_, v)| v.is_finite()).collect();
        Self::from_sorted_map(by_date)
    }

    fn from_sorted_map(by_date: BTreeMap<NaiveDate, f64>) -> Option<Self> {
        if by_date.is_empty() {
            return None;
        }
        let points = by_date
            .into_iter()
            .map(|(date, value)| PricePoint { date, value })
            .collect();
        Some(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: an empty series cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<PricePoint> {
        self.points.get(index).copied()
    }

    pub fn first(&self) -> Option<PricePoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<PricePoint> {
        self.points.last().copied()
    }

    /// Latest point dated on or before `date`.
    pub fn last_on_or_before(&self, date: NaiveDate) -> Option<PricePoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| self.points[i])
    }

    /// Copy of this series without points dated after `date`.
    ///
    /// Returns `None` if the whole series lies after `date`.
    pub fn truncated_after(&self, date: NaiveDate) -> Option<Self> {
        let idx = self.points.partition_point(|p| p.date <= date);
        if idx == 0 {
            return None;
        }
        Some(Self {
            points: self.points[..idx].to_vec(),
        })
    }
}

/// Raw per-ticker bars as delivered by the history provider.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    bars: HashMap<Ticker, Vec<RawBar>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<Ticker>, bars: Vec<RawBar>) {
        self.bars.insert(ticker.into(), bars);
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.bars.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Cleaned adjusted-close series for `ticker`.
    ///
    /// `None` if the ticker is not in the table or has no finite adjusted
    /// close at all.
    pub fn adjusted_close_series(&self, ticker: &str) -> Option<PriceSeries> {
        self.bars
            .get(ticker)
            .and_then(|bars| PriceSeries::from_raw(bars))
    }
}

impl FromIterator<(Ticker, Vec<RawBar>)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (Ticker, Vec<RawBar>)>>(iter: I) -> Self {
        Self {
            bars: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, adj_close: f64) -> RawBar {
        RawBar {
            date,
            open: adj_close,
            high: adj_close,
            low: adj_close,
            close: adj_close,
            volume: 1_000,
            adj_close,
        }
    }

    #[test]
    fn cleaning_drops_nan_and_sorts() {
        let bars = vec![
            bar(d(2024, 1, 3), 103.0),
            bar(d(2024, 1, 1), 101.0),
            bar(d(2024, 1, 2), f64::NAN),
            bar(d(2024, 1, 4), f64::INFINITY),
        ];
        let series = PriceSeries::from_raw(&bars).unwrap();
        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 3)]);
    }

    #[test]
    fn duplicate_dates_keep_last_supplied() {
        let bars = vec![bar(d(2024, 1, 1), 1.0), bar(d(2024, 1, 1), 2.0)];
        let series = PriceSeries::from_raw(&bars).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(0).unwrap().value, 2.0);
    }

    #[test]
    fn all_nan_is_no_series() {
        let bars = vec![bar(d(2024, 1, 1), f64::NAN)];
        assert!(PriceSeries::from_raw(&bars).is_none());
    }

    #[test]
    fn missing_ticker_is_no_series() {
        let table = PriceTable::new();
        assert!(table.adjusted_close_series("AAPL").is_none());
    }

    #[test]
    fn table_returns_cleaned_series() {
        let mut table = PriceTable::new();
        table.insert("AAPL", vec![bar(d(2024, 1, 2), 10.0), bar(d(2024, 1, 1), 9.0)]);
        let series = table.adjusted_close_series("AAPL").unwrap();
        assert_eq!(series.first().unwrap().date, d(2024, 1, 1));
        assert_eq!(series.last().unwrap().value, 10.0);
    }

    #[test]
    fn last_on_or_before_picks_latest_not_after() {
        let series = PriceSeries::from_pairs(vec![
            (d(2024, 1, 1), 1.0),
            (d(2024, 1, 5), 5.0),
            (d(2024, 1, 8), 8.0),
        ])
        .unwrap();
        assert_eq!(series.last_on_or_before(d(2024, 1, 7)).unwrap().value, 5.0);
        assert_eq!(series.last_on_or_before(d(2024, 1, 8)).unwrap().value, 8.0);
        assert_eq!(series.last_on_or_before(d(2024, 1, 1)).unwrap().value, 1.0);
        assert!(series.last_on_or_before(d(2023, 12, 31)).is_none());
    }

    #[test]
    fn truncation_drops_future_points() {
        let series = PriceSeries::from_pairs(vec![
            (d(2024, 1, 1), 1.0),
            (d(2024, 1, 2), 2.0),
            (d(2024, 1, 3), 3.0),
        ])
        .unwrap();
        let cut = series.truncated_after(d(2024, 1, 2)).unwrap();
        assert_eq!(cut.len(), 2);
        assert!(series.truncated_after(d(2023, 1, 1)).is_none());
    }
}
