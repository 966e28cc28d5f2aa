//! MarketPulse Core — reference prices, live joins, evolution, ranking.
//!
//! Pipeline stages, leaves first:
//! - `data::series` cleans a raw price table into adjusted-close series
//! - `reference` derives previous-close and horizon anchors per ticker
//! - `live` attaches current prices and metadata to the surviving tickers
//! - `evolution` computes percentage moves against each anchor
//! - `ranking` selects the top and worst movers
//!
//! Each stage returns a new collection; nothing is shared or mutated across
//! stages or universes.

pub mod data;
pub mod domain;
pub mod evolution;
pub mod live;
pub mod ranking;
pub mod reference;

pub use domain::{Anchor, EvolutionRecord, Horizon, LiveQuote, RankedResult, ReferenceRecord, Ticker};
pub use evolution::compute_evolution;
pub use live::{join_live, LiveQuotes};
pub use ranking::{rank_performers, OverlapPolicy, DEFAULT_TOP_N};
pub use reference::{build_references, DropReason, Dropped, ReferenceSet, MIN_SERIES_LEN};
