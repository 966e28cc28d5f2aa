//! Domain types: tickers, horizons, and the records each pipeline stage produces.

pub mod horizon;
pub mod records;

pub use horizon::Horizon;
pub use records::{Anchor, EvolutionRecord, LiveQuote, RankedResult, ReferenceRecord};

/// Instrument identifier (exchange symbol, e.g. `AAPL`, `SAP.DE`).
pub type Ticker = String;
