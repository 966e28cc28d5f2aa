//! Data provider traits and structured error types.
//!
//! `HistoryProvider` and `QuoteProvider` abstract over the price feed so the
//! pipeline can run against Yahoo Finance in production and in-memory mocks
//! in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::LiveQuote;

/// Raw daily bar from a data provider, before cleaning.
///
/// Fields the provider left empty are NaN; cleaning drops them later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

/// Structured error types for provider operations.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether this error means the provider as a whole refuses to serve,
    /// as opposed to a failure scoped to one symbol.
    pub fn is_provider_wide(&self) -> bool {
        matches!(
            self,
            DataError::CircuitBreakerTripped
                | DataError::AuthenticationRequired(_)
                | DataError::ProviderUnavailable { .. }
        )
    }
}

/// Source of daily history (OHLC + adjusted close).
pub trait HistoryProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<RawBar>, DataError>;

    /// Check if the provider is currently available (not blocked).
    fn is_available(&self) -> bool;
}

/// Source of live prices and descriptive metadata.
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the current quote for a symbol.
    ///
    /// Individual metadata fields may be `None` on success; an `Err` means
    /// nothing usable came back for this symbol.
    fn quote(&self, symbol: &str) -> Result<LiveQuote, DataError>;

    fn is_available(&self) -> bool;
}
