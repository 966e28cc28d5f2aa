//! Lookback horizons used to anchor historical reference prices.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar-day lookback relative to the run date.
///
/// Horizons are expressed in calendar days, not trading sessions. The anchor
/// for a horizon is the latest trading date on or before `as_of - days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    OneWeek,
    OneMonth,
    OneYear,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::OneWeek, Horizon::OneMonth, Horizon::OneYear];

    /// Calendar days covered by this horizon.
    pub fn days(self) -> i64 {
        match self {
            Horizon::OneWeek => 7,
            Horizon::OneMonth => 30,
            Horizon::OneYear => 365,
        }
    }

    /// The target date for this horizon, counted back from `as_of`.
    pub fn target(self, as_of: NaiveDate) -> NaiveDate {
        as_of - Duration::days(self.days())
    }

    pub fn label(self) -> &'static str {
        match self {
            Horizon::OneWeek => "1W",
            Horizon::OneMonth => "1M",
            Horizon::OneYear => "1Y",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_count_calendar_days() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            Horizon::OneWeek.target(as_of),
            NaiveDate::from_ymd_opt(2024, 2, 23).unwrap()
        );
        assert_eq!(
            Horizon::OneMonth.target(as_of),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        // 2024 is a leap year: 365 days back from March 1st lands on March 2nd.
        assert_eq!(
            Horizon::OneYear.target(as_of),
            NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()
        );
    }

    #[test]
    fn horizons_are_ordered_shortest_first() {
        let days: Vec<i64> = Horizon::ALL.iter().map(|h| h.days()).collect();
        assert_eq!(days, vec![7, 30, 365]);
    }
}
