//! Data providers, history download, and series cleaning.

pub mod circuit_breaker;
pub mod download;
pub mod provider;
pub mod series;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use download::{download_history, FetchFailure, HistoryDownload};
pub use provider::{DataError, HistoryProvider, QuoteProvider, RawBar};
pub use series::{PricePoint, PriceSeries, PriceTable};
pub use universe::{SymbolRules, Universe};
pub use yahoo::YahooProvider;
