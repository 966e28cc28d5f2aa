//! Per-universe pipeline: history → references → live quotes → evolution →
//! ranking.
//!
//! One call runs one universe to completion. Universes share nothing but
//! the providers, so the report layer can run them side by side.

use chrono::{Duration, NaiveDate};
use pulse_core::data::{download_history, DataError, HistoryProvider, QuoteProvider, Universe};
use pulse_core::{
    build_references, compute_evolution, join_live, rank_performers, Dropped, RankedResult,
    Ticker,
};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::config::ReportSettings;

/// Provider-facing stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    History,
    LiveQuotes,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::History => write!(f, "history download"),
            Stage::LiveQuotes => write!(f, "live quotes"),
        }
    }
}

/// Errors that abort a universe.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("provider unavailable during {stage}: {source}")]
    ProviderUnavailable {
        stage: Stage,
        #[source]
        source: DataError,
    },
}

/// Everything the report shows for one universe.
#[derive(Debug, Clone, Serialize)]
pub struct UniverseReport {
    pub name: String,
    pub currency: String,
    pub as_of: NaiveDate,
    /// Tickers in the universe after normalisation.
    pub requested: usize,
    /// Tickers with complete reference prices.
    pub kept: usize,
    pub ranked: RankedResult,
    pub dropped: Vec<Dropped>,
    /// Tickers kept with an all-absent live quote.
    pub live_failures: Vec<Ticker>,
}

/// Run one universe as of `as_of`.
pub fn run_universe(
    universe: &Universe,
    history: &dyn HistoryProvider,
    quotes: &dyn QuoteProvider,
    as_of: NaiveDate,
    settings: &ReportSettings,
) -> Result<UniverseReport, PipelineError> {
    let started = Instant::now();
    let start = as_of - Duration::days(i64::from(settings.history_days));

    info!(
        universe = %universe.name,
        tickers = universe.len(),
        %start,
        %as_of,
        "downloading history"
    );
    let download = download_history(history, &universe.tickers, start, as_of).map_err(|source| {
        PipelineError::ProviderUnavailable {
            stage: Stage::History,
            source,
        }
    })?;

    let references = build_references(
        &download.table,
        &universe.tickers,
        as_of,
        settings.min_history,
    );

    let live = join_live(quotes, &references.tickers()).map_err(|source| {
        PipelineError::ProviderUnavailable {
            stage: Stage::LiveQuotes,
            source,
        }
    })?;

    let records = compute_evolution(&references, &live);
    let ranked = rank_performers(&records, settings.top_n, settings.overlap);

    info!(
        universe = %universe.name,
        kept = references.len(),
        dropped = references.dropped.len(),
        live_failures = live.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "universe complete"
    );

    Ok(UniverseReport {
        name: universe.name.clone(),
        currency: universe.currency.clone(),
        as_of,
        requested: universe.len(),
        kept: references.len(),
        ranked,
        dropped: references.dropped,
        live_failures: live.failed,
    })
}
