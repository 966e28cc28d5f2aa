//! Records produced by each pipeline stage.
//!
//! Every stage yields a fresh set of records; nothing here is mutated after the
//! producing stage returns. Missing values are `None`, never a stray zero or
//! empty string.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Horizon, Ticker};

/// A historical price selected as a comparison baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub date: NaiveDate,
    pub value: f64,
}

/// Reference anchors for one ticker, derived from its adjusted-close series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub ticker: Ticker,
    /// Last completed session before the most recent point in the series.
    pub prev_close: Anchor,
    pub one_week_ago: Anchor,
    pub one_month_ago: Anchor,
    pub one_year_ago: Anchor,
}

impl ReferenceRecord {
    pub fn prev_close_date(&self) -> NaiveDate {
        self.prev_close.date
    }

    pub fn anchor(&self, horizon: Horizon) -> &Anchor {
        match horizon {
            Horizon::OneWeek => &self.one_week_ago,
            Horizon::OneMonth => &self.one_month_ago,
            Horizon::OneYear => &self.one_year_ago,
        }
    }
}

/// Current price and descriptive metadata for one ticker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveQuote {
    pub ticker: Ticker,
    pub live_price: Option<f64>,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
}

impl LiveQuote {
    /// Quote with every field absent, used when the live source failed.
    pub fn absent(ticker: impl Into<Ticker>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn is_absent(&self) -> bool {
        self.live_price.is_none()
            && self.name.is_none()
            && self.industry.is_none()
            && self.sector.is_none()
    }
}

/// A reference record joined with its live quote plus percentage deltas.
///
/// Percentages are rounded to two decimals and are `None` whenever either the
/// live price or the anchor is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub ticker: Ticker,
    pub name: Option<String>,
    pub live_price: Option<f64>,
    pub prev_close: f64,
    pub prev_close_date: NaiveDate,
    pub one_week_ago: f64,
    pub one_month_ago: f64,
    pub one_year_ago: f64,
    pub pct_vs_prev_close: Option<f64>,
    pub pct_vs_1w: Option<f64>,
    pub pct_vs_1m: Option<f64>,
    pub pct_vs_1y: Option<f64>,
    pub industry: Option<String>,
    pub sector: Option<String>,
}

/// Top and worst movers for one universe, ordered for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankedResult {
    /// Descending by `pct_vs_prev_close`.
    pub top: Vec<EvolutionRecord>,
    /// Ascending by `pct_vs_prev_close`.
    pub worst: Vec<EvolutionRecord>,
}

impl RankedResult {
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.worst.is_empty()
    }
}
