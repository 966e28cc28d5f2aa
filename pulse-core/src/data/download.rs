//! History download orchestrator — fetches a universe's daily bars into a
//! `PriceTable`.

use super::provider::{DataError, HistoryProvider};
use super::series::PriceTable;
use crate::domain::Ticker;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// A ticker whose history could not be fetched.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub ticker: Ticker,
    pub error: DataError,
}

/// Bars for every ticker the provider served, plus the per-ticker failures.
#[derive(Debug, Default)]
pub struct HistoryDownload {
    pub table: PriceTable,
    pub failures: Vec<FetchFailure>,
}

/// Download daily history for each ticker.
///
/// Per-ticker failures (unknown symbol, malformed response, timeout) are
/// logged and leave the ticker out of the table; the reference stage then
/// reports it as a missing series. The whole download fails only when the
/// provider itself is unavailable: it refuses requests up front, its circuit
/// breaker trips mid-batch, or every ticker failed on the network.
pub fn download_history(
    provider: &dyn HistoryProvider,
    tickers: &[Ticker],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HistoryDownload, DataError> {
    if !provider.is_available() {
        return Err(DataError::ProviderUnavailable {
            provider: provider.name().to_string(),
            reason: "provider is refusing requests".into(),
        });
    }

    let total = tickers.len();
    let mut download = HistoryDownload::default();
    let mut network_failures = 0usize;

    for (i, ticker) in tickers.iter().enumerate() {
        debug!(ticker = %ticker, "[{}/{}] fetching history", i + 1, total);

        match provider.fetch(ticker, start, end) {
            Ok(bars) => {
                download.table.insert(ticker.clone(), bars);
            }
            Err(e) if e.is_provider_wide() => {
                return Err(DataError::ProviderUnavailable {
                    provider: provider.name().to_string(),
                    reason: format!("aborted at {ticker} ({}/{total}): {e}", i + 1),
                });
            }
            Err(e) => {
                if matches!(e, DataError::NetworkUnreachable(_)) {
                    network_failures += 1;
                }
                warn!(ticker = %ticker, error = %e, "history fetch failed");
                download.failures.push(FetchFailure {
                    ticker: ticker.clone(),
                    error: e,
                });
            }
        }
    }

    if total > 0 && network_failures == total {
        return Err(DataError::ProviderUnavailable {
            provider: provider.name().to_string(),
            reason: format!("all {total} history requests failed on the network"),
        });
    }

    info!(
        provider = provider.name(),
        fetched = download.table.len(),
        failed = download.failures.len(),
        "history download complete"
    );

    Ok(download)
}
