//! Universes — named ticker lists, one per index or report section.
//!
//! Constituent lists come from outside (config files, scrapers). Symbols are
//! normalised on the way in, since every list source spells them slightly
//! differently: footnote markers such as `[3]` and surrounding whitespace are
//! stripped, share-class dots can be rewritten for the quote feed
//! (`BRK.B` → `BRK-B`), and an exchange suffix can be appended to bare
//! symbols (`SAP` → `SAP.DE`). Duplicates are dropped, first occurrence wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::domain::Ticker;

/// Per-universe symbol rewriting rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolRules {
    /// Replacement for `.` inside a symbol (applied before the suffix).
    #[serde(default)]
    pub dot_replacement: Option<String>,
    /// Suffix appended to symbols that carry no `.` after rewriting.
    #[serde(default)]
    pub default_suffix: Option<String>,
}

impl SymbolRules {
    /// Normalise one raw symbol. Returns `None` for blank input.
    pub fn normalize(&self, raw: &str) -> Option<Ticker> {
        let stripped = strip_footnotes(raw);
        let mut symbol = stripped.trim().to_string();
        if symbol.is_empty() {
            return None;
        }
        if let Some(rep) = &self.dot_replacement {
            symbol = symbol.replace('.', rep);
        }
        if let Some(suffix) = &self.default_suffix {
            if !symbol.contains('.') {
                symbol.push_str(suffix);
            }
        }
        Some(symbol)
    }
}

/// Remove every `[...]` span (wiki-style footnote markers).
fn strip_footnotes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// A named, deduplicated ticker list with the currency label for its prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub name: String,
    pub currency: String,
    pub tickers: Vec<Ticker>,
}

impl Universe {
    /// Build a universe from raw symbols, normalising and deduplicating.
    pub fn from_symbols<I, S>(name: &str, currency: &str, symbols: I, rules: &SymbolRules) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tickers = symbols
            .into_iter()
            .filter_map(|s| rules.normalize(s.as_ref()))
            .filter(|t| seen.insert(t.clone()))
            .collect();

        Self {
            name: name.to_string(),
            currency: currency.to_string(),
            tickers,
        }
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Read raw symbols from a text file: one or more per line, separated by
/// commas or whitespace; `#` starts a comment.
pub fn read_symbol_file(path: &Path) -> Result<Vec<String>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("read ticker file {}: {e}", path.display()))?;
    Ok(parse_symbol_list(&content))
}

/// Parse a symbol list in the `read_symbol_file` format.
pub fn parse_symbol_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
