//! Live joiner — current prices and metadata for the surviving tickers.
//!
//! Called only after the reference stage has filtered the universe, so no
//! request is spent on a ticker that will be discarded. Tickers are fetched
//! independently on the rayon pool; a failed ticker gets an all-absent quote
//! and a warning, nothing more.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::data::{DataError, QuoteProvider};
use crate::domain::{LiveQuote, Ticker};

/// Live quotes keyed by ticker. Every requested ticker has an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveQuotes {
    pub quotes: BTreeMap<Ticker, LiveQuote>,
    /// Tickers whose fetch failed and carry an all-absent quote.
    pub failed: Vec<Ticker>,
}

impl LiveQuotes {
    pub fn get(&self, ticker: &str) -> Option<&LiveQuote> {
        self.quotes.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Fetch a quote per ticker.
///
/// Returns `Err` only when the provider as a whole is unavailable, either
/// before the batch starts or because it stopped serving during it; in that
/// case the quotes collected so far cannot be trusted.
pub fn join_live(provider: &dyn QuoteProvider, tickers: &[Ticker]) -> Result<LiveQuotes, DataError> {
    if !provider.is_available() {
        return Err(DataError::ProviderUnavailable {
            provider: provider.name().to_string(),
            reason: "provider is refusing requests".into(),
        });
    }

    let fetched: Vec<(Ticker, Result<LiveQuote, DataError>)> = tickers
        .par_iter()
        .map(|ticker| (ticker.clone(), provider.quote(ticker)))
        .collect();

    let mut live = LiveQuotes::default();
    let mut provider_wide: Option<DataError> = None;

    for (ticker, result) in fetched {
        let quote = match result {
            Ok(quote) => sanitize(&ticker, quote),
            Err(e) => {
                if e.is_provider_wide() && provider_wide.is_none() {
                    provider_wide = Some(e.clone());
                }
                warn!(ticker = %ticker, error = %e, "live quote unavailable");
                live.failed.push(ticker.clone());
                LiveQuote::absent(ticker.clone())
            }
        };
        live.quotes.insert(ticker, quote);
    }

    if let Some(e) = provider_wide {
        return Err(DataError::ProviderUnavailable {
            provider: provider.name().to_string(),
            reason: format!("stopped serving during live batch: {e}"),
        });
    }

    info!(
        provider = provider.name(),
        quoted = live.quotes.len() - live.failed.len(),
        failed = live.failed.len(),
        "live quotes joined"
    );

    Ok(live)
}

/// Key the quote by the requested ticker and drop unusable prices.
fn sanitize(ticker: &str, quote: LiveQuote) -> LiveQuote {
    LiveQuote {
        ticker: ticker.to_string(),
        live_price: quote.live_price.filter(|p| p.is_finite()),
        name: quote.name.filter(|s| !s.trim().is_empty()),
        industry: quote.industry.filter(|s| !s.trim().is_empty()),
        sector: quote.sector.filter(|s| !s.trim().is_empty()),
    }
}
