//! Performance ranker — top and worst movers by change versus previous close.
//!
//! Records are ordered ascending by `pct_vs_prev_close`, with absent values
//! treated as the lowest possible and ties broken by ticker. Worst movers
//! are taken from the bottom of that order, top movers from the top and
//! re-sorted descending. Absent values therefore lean towards the worst list
//! and only reach the top list when the universe is too small to fill it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::{EvolutionRecord, RankedResult};

/// Default number of records in each list.
pub const DEFAULT_TOP_N: usize = 10;

/// How small universes are split between the top and worst lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Both lists are cut independently from the two ends of one ordering.
    /// With fewer than `2 * top_n` records the same ticker can appear in
    /// both; with fewer than `top_n`, both lists hold every record.
    #[default]
    Allow,
    /// The lists never share a ticker: worst takes `min(top_n, len / 2)`
    /// records, top takes up to `top_n` of the rest.
    Disjoint,
}

fn cmp_pct_ascending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Ascending ranking order: absent first, then by value, then by ticker.
pub fn ascending(a: &EvolutionRecord, b: &EvolutionRecord) -> Ordering {
    cmp_pct_ascending(a.pct_vs_prev_close, b.pct_vs_prev_close)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

/// Descending display order for the top list: highest value first, absent
/// last, ties still broken by ticker ascending.
pub fn descending(a: &EvolutionRecord, b: &EvolutionRecord) -> Ordering {
    cmp_pct_ascending(b.pct_vs_prev_close, a.pct_vs_prev_close)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

/// Rank records into top and worst lists of at most `top_n` each.
pub fn rank_performers(
    records: &[EvolutionRecord],
    top_n: usize,
    policy: OverlapPolicy,
) -> RankedResult {
    let mut sorted = records.to_vec();
    sorted.sort_by(ascending);

    let len = sorted.len();
    let (worst_len, top_len) = match policy {
        OverlapPolicy::Allow => (top_n.min(len), top_n.min(len)),
        OverlapPolicy::Disjoint => {
            let worst_len = top_n.min(len / 2);
            (worst_len, top_n.min(len - worst_len))
        }
    };

    let worst = sorted[..worst_len].to_vec();
    let mut top = sorted[len - top_len..].to_vec();
    top.sort_by(descending);

    RankedResult { top, worst }
}
