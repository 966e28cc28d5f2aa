//! Multi-universe report: runs every configured universe and renders the
//! ranked sections as a text table or JSON.

use chrono::{DateTime, NaiveDate, Utc};
use pulse_core::data::{HistoryProvider, QuoteProvider, Universe};
use pulse_core::EvolutionRecord;
use rayon::prelude::*;
use serde::Serialize;
use tracing::error;

use crate::config::ReportSettings;
use crate::pipeline::{run_universe, UniverseReport};

/// A universe that produced no section.
#[derive(Debug, Clone, Serialize)]
pub struct UniverseFailure {
    pub name: String,
    pub error: String,
}

/// The assembled report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub sections: Vec<UniverseReport>,
    pub failures: Vec<UniverseFailure>,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Run every universe, in parallel when `settings.parallel_universes` is set.
///
/// Sections keep the order of `universes`. A universe whose provider became
/// unavailable is listed under `failures` and the others still run.
pub fn run_report(
    universes: &[Universe],
    history: &dyn HistoryProvider,
    quotes: &dyn QuoteProvider,
    as_of: NaiveDate,
    settings: &ReportSettings,
) -> Report {
    let run = |u: &Universe| (u.name.clone(), run_universe(u, history, quotes, as_of, settings));

    let outcomes: Vec<_> = if settings.parallel_universes {
        universes.par_iter().map(run).collect()
    } else {
        universes.iter().map(run).collect()
    };

    let mut sections = Vec::new();
    let mut failures = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(section) => sections.push(section),
            Err(e) => {
                error!(universe = %name, error = %e, "universe failed");
                failures.push(UniverseFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    Report {
        title: settings.title.clone(),
        generated_at: Utc::now(),
        as_of,
        sections,
        failures,
    }
}

// ── Formatting ───────────────────────────────────────────────────────

/// Insert `,` every three digits of the integer part: `1234567.5` → `1,234,567.50`.
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && !is_zero_digits(&fixed) { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// True when a formatted number shows no non-zero digit (`0.00`).
fn is_zero_digits(fixed: &str) -> bool {
    !fixed.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

/// `$1,234.56` for USD, `€1,234.56` for EUR, `1,234.56 GBP` otherwise.
pub fn format_price(value: Option<f64>, currency: &str) -> String {
    match value.filter(|v| v.is_finite()) {
        None => "N/A".into(),
        Some(v) => match currency {
            "USD" => format!("${}", group_thousands(v)),
            "EUR" => format!("€{}", group_thousands(v)),
            other => format!("{} {other}", group_thousands(v)),
        },
    }
}

pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let fixed = format!("{:.2}", v.abs());
            let sign = if v < 0.0 && !is_zero_digits(&fixed) { "-" } else { "" };
            format!("{sign}{fixed}%")
        }
        None => "N/A".into(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn push_table(out: &mut String, heading: &str, records: &[EvolutionRecord], currency: &str) {
    out.push_str(&format!("\n{heading}\n"));
    if records.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    out.push_str(&format!(
        "{:<10} {:<26} {:>14} {:>14} {:<10} {:>9} {:>9} {:>9} {:>9}  {:<24} {:<24}\n",
        "Ticker", "Name", "Live", "Prev Close", "Prev Date", "% Prev", "% 1W", "% 1M", "% 1Y",
        "Industry", "Sector"
    ));
    out.push_str(&format!("{}\n", "-".repeat(170)));
    for r in records {
        out.push_str(&format!(
            "{:<10} {:<26} {:>14} {:>14} {:<10} {:>9} {:>9} {:>9} {:>9}  {:<24} {:<24}\n",
            r.ticker,
            truncate(r.name.as_deref().unwrap_or("N/A"), 26),
            format_price(r.live_price, currency),
            format_price(Some(r.prev_close), currency),
            r.prev_close_date,
            format_pct(r.pct_vs_prev_close),
            format_pct(r.pct_vs_1w),
            format_pct(r.pct_vs_1m),
            format_pct(r.pct_vs_1y),
            truncate(r.industry.as_deref().unwrap_or("N/A"), 24),
            truncate(r.sector.as_deref().unwrap_or("N/A"), 24),
        ));
    }
}

/// Plain-text report for stdout.
pub fn render_text(report: &Report) -> String {
    let mut out = format!(
        "=== {} ===\nGenerated: {} | As of: {} | Data source: Yahoo Finance\n",
        report.title,
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.as_of
    );

    for section in &report.sections {
        out.push_str(&format!(
            "\n## {} ({})\n{} of {} tickers with reference prices",
            section.name, section.currency, section.kept, section.requested
        ));
        if !section.live_failures.is_empty() {
            out.push_str(&format!(
                ", {} without a live quote",
                section.live_failures.len()
            ));
        }
        out.push('\n');

        push_table(&mut out, "Top Performers", &section.ranked.top, &section.currency);
        push_table(&mut out, "Worst Performers", &section.ranked.worst, &section.currency);
    }

    if !report.failures.is_empty() {
        out.push_str("\n## Failed universes\n");
        for f in &report.failures {
            out.push_str(&format!("- {}: {}\n", f.name, f.error));
        }
    }

    out
}

/// Pretty-printed JSON report.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
