//! Report configuration loaded from TOML.
//!
//! ```toml
//! [report]
//! title = "Financial Markets Evolution Report"
//! top_n = 10
//! overlap = "allow"
//!
//! [[universe]]
//! name = "S&P 500"
//! currency = "USD"
//! dot_replacement = "-"
//! tickers_file = "universes/sp500.txt"
//! ```
//!
//! Every `[report]` key has a default. Relative `tickers_file` paths are
//! resolved against the directory of the config file.

use pulse_core::data::universe::read_symbol_file;
use pulse_core::data::{SymbolRules, Universe};
use pulse_core::{OverlapPolicy, Ticker, DEFAULT_TOP_N, MIN_SERIES_LEN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating a report configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("universe '{universe}': {reason}")]
    Universe { universe: String, reason: String },

    #[error("no universe named '{0}'")]
    UnknownUniverse(String),
}

/// Report-wide settings (`[report]` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    pub title: String,
    /// Calendar days of history requested per ticker. Must cover the
    /// one-year anchor.
    pub history_days: u32,
    /// Size of each of the top and worst lists.
    pub top_n: usize,
    /// Minimum clean points for a ticker to get reference prices.
    pub min_history: usize,
    pub overlap: OverlapPolicy,
    pub request_timeout_secs: u64,
    /// Run universes concurrently on the rayon pool.
    pub parallel_universes: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Financial Markets Evolution Report".into(),
            history_days: 730,
            top_n: DEFAULT_TOP_N,
            min_history: MIN_SERIES_LEN,
            overlap: OverlapPolicy::Allow,
            request_timeout_secs: 15,
            parallel_universes: true,
        }
    }
}

impl ReportSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// One `[[universe]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniverseConfig {
    pub name: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot_replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickers_file: Option<PathBuf>,
}

impl UniverseConfig {
    pub fn rules(&self) -> SymbolRules {
        SymbolRules {
            dot_replacement: self.dot_replacement.clone(),
            default_suffix: self.default_suffix.clone(),
        }
    }

    /// Inline tickers followed by the file's, normalised and deduplicated.
    pub fn resolve(&self, base_dir: Option<&Path>) -> Result<Universe, ConfigError> {
        let mut raw = self.tickers.clone();
        if let Some(file) = &self.tickers_file {
            let path = match base_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            };
            let listed = read_symbol_file(&path).map_err(|reason| ConfigError::Universe {
                universe: self.name.clone(),
                reason,
            })?;
            raw.extend(listed);
        }

        let universe = Universe::from_symbols(&self.name, &self.currency, raw, &self.rules());
        if universe.is_empty() {
            return Err(ConfigError::Universe {
                universe: self.name.clone(),
                reason: "no tickers after normalisation".into(),
            });
        }
        Ok(universe)
    }
}

/// Complete report configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default, rename = "universe")]
    pub universes: Vec<UniverseConfig>,
    /// Directory relative ticker files are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ReportConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.report;
        if r.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }
        if r.min_history < 2 {
            return Err(ConfigError::Invalid("min_history must be at least 2".into()));
        }
        if r.history_days < 366 {
            return Err(ConfigError::Invalid(format!(
                "history_days must be at least 366 to anchor one year back, got {}",
                r.history_days
            )));
        }
        if r.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.universes.is_empty() {
            return Err(ConfigError::Invalid("no [[universe]] entries".into()));
        }

        let mut names = HashSet::new();
        for u in &self.universes {
            if u.name.trim().is_empty() {
                return Err(ConfigError::Invalid("universe with empty name".into()));
            }
            if !names.insert(u.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate universe name '{}'",
                    u.name
                )));
            }
            if u.currency.trim().is_empty() {
                return Err(ConfigError::Universe {
                    universe: u.name.clone(),
                    reason: "currency label is empty".into(),
                });
            }
            if u.tickers.is_empty() && u.tickers_file.is_none() {
                return Err(ConfigError::Universe {
                    universe: u.name.clone(),
                    reason: "needs `tickers` or `tickers_file`".into(),
                });
            }
        }
        Ok(())
    }

    /// Look up a universe by name (case-insensitive).
    pub fn universe(&self, name: &str) -> Result<&UniverseConfig, ConfigError> {
        self.universes
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownUniverse(name.to_string()))
    }

    /// Keep only the named universe (case-insensitive).
    pub fn retain_universe(&mut self, name: &str) -> Result<(), ConfigError> {
        let kept = self.universe(name)?.clone();
        self.universes = vec![kept];
        Ok(())
    }

    /// Normalise symbols typed on the command line: upper-cased, then
    /// rewritten with the named universe's rules, or only stripped and
    /// deduplicated when no universe is given.
    pub fn normalize_symbols(
        &self,
        universe: Option<&str>,
        symbols: &[String],
    ) -> Result<Vec<Ticker>, ConfigError> {
        let (name, currency, rules) = match universe {
            Some(name) => {
                let u = self.universe(name)?;
                (u.name.as_str(), u.currency.as_str(), u.rules())
            }
            None => ("symbols", "", SymbolRules::default()),
        };
        let upper = symbols.iter().map(|s| s.to_uppercase());
        Ok(Universe::from_symbols(name, currency, upper, &rules).tickers)
    }

    /// Resolve every universe to its normalised ticker list.
    pub fn resolve_universes(&self) -> Result<Vec<Universe>, ConfigError> {
        self.universes
            .iter()
            .map(|u| u.resolve(self.base_dir.as_deref()))
            .collect()
    }

    /// Built-in sections for the four indices the report covers by default.
    ///
    /// Ticker lists are the largest constituents only; point a
    /// `tickers_file` at a full constituent list for complete coverage.
    pub fn default_indices() -> Self {
        fn universe(
            name: &str,
            currency: &str,
            dot_replacement: Option<&str>,
            default_suffix: Option<&str>,
            tickers: &[&str],
        ) -> UniverseConfig {
            UniverseConfig {
                name: name.into(),
                currency: currency.into(),
                dot_replacement: dot_replacement.map(String::from),
                default_suffix: default_suffix.map(String::from),
                tickers: tickers.iter().map(|t| t.to_string()).collect(),
                tickers_file: None,
            }
        }

        Self {
            report: ReportSettings::default(),
            universes: vec![
                universe(
                    "S&P 500",
                    "USD",
                    Some("-"),
                    None,
                    &[
                        "AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "BRK.B", "LLY", "AVGO",
                        "JPM", "TSLA", "UNH", "XOM", "V", "PG", "JNJ", "MA", "HD", "COST", "MRK",
                        "ABBV", "CVX", "KO", "PEP", "BF.B",
                    ],
                ),
                universe(
                    "Nasdaq-100",
                    "USD",
                    Some("-"),
                    None,
                    &[
                        "AAPL", "MSFT", "NVDA", "AMZN", "META", "AVGO", "GOOGL", "GOOG", "TSLA",
                        "COST", "NFLX", "AMD", "PEP", "ADBE", "CSCO", "TMUS", "QCOM", "INTC",
                        "INTU", "AMGN", "TXN", "ISRG", "CMCSA", "HON", "BKNG",
                    ],
                ),
                universe(
                    "DAX",
                    "EUR",
                    None,
                    Some(".DE"),
                    &[
                        "SAP", "SIE", "ALV", "DTE", "MBG", "BMW", "BAS", "MUV2", "IFX", "DHL",
                        "DB1", "BAYN", "ADS", "VOW3", "RWE", "EOAN", "HEN3", "DBK", "MRK", "BEI",
                        "CBK", "HNR1", "SHL", "AIR.PA",
                    ],
                ),
                universe(
                    "Euronext 100",
                    "EUR",
                    None,
                    None,
                    &[
                        "MC.PA", "OR.PA", "TTE.PA", "SAN.PA", "AI.PA", "SU.PA", "AIR.PA",
                        "BNP.PA", "ASML.AS", "INGA.AS", "ADYEN.AS", "PRX.AS", "ABI.BR", "KBC.BR",
                        "GALP.LS", "EDP.LS", "RYA.IR", "CRG.IR", "EQNR.OL", "DNB.OL",
                    ],
                ),
            ],
            base_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[universe]]
name = "Test"
currency = "USD"
tickers = ["AAA", "BBB"]
"#;

    #[test]
    fn defaults_fill_missing_report_table() {
        let config = ReportConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.report, ReportSettings::default());
        assert_eq!(config.report.top_n, 10);
        assert_eq!(config.report.min_history, 10);
        assert_eq!(config.report.overlap, OverlapPolicy::Allow);
        assert_eq!(config.universes.len(), 1);
    }

    #[test]
    fn parses_report_table() {
        let config = ReportConfig::from_toml(
            r#"
[report]
title = "Weekly"
top_n = 5
overlap = "disjoint"
parallel_universes = false

[[universe]]
name = "DAX"
currency = "EUR"
default_suffix = ".DE"
tickers = ["SAP", "AIR.PA"]
"#,
        )
        .unwrap();
        assert_eq!(config.report.title, "Weekly");
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.report.overlap, OverlapPolicy::Disjoint);
        assert!(!config.report.parallel_universes);
        assert_eq!(config.report.history_days, 730);

        let universes = config.resolve_universes().unwrap();
        assert_eq!(universes[0].tickers, vec!["SAP.DE", "AIR.PA"]);
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = |report: &str| {
            ReportConfig::from_toml(&format!("[report]\n{report}\n{MINIMAL}")).unwrap_err()
        };
        assert!(matches!(bad("top_n = 0"), ConfigError::Invalid(_)));
        assert!(matches!(bad("min_history = 1"), ConfigError::Invalid(_)));
        assert!(matches!(bad("history_days = 200"), ConfigError::Invalid(_)));
        assert!(matches!(bad("overlap = \"sometimes\""), ConfigError::Parse(_)));
        assert!(matches!(bad("colour = \"red\""), ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_and_empty_universes() {
        let dup = format!("{MINIMAL}{MINIMAL}");
        assert!(matches!(
            ReportConfig::from_toml(&dup).unwrap_err(),
            ConfigError::Invalid(_)
        ));

        let empty = "[[universe]]\nname = \"X\"\ncurrency = \"USD\"\n";
        assert!(matches!(
            ReportConfig::from_toml(empty).unwrap_err(),
            ConfigError::Universe { .. }
        ));

        assert!(matches!(
            ReportConfig::from_toml("[report]\ntop_n = 3\n").unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn retain_universe_is_case_insensitive() {
        let mut config = ReportConfig::default_indices();
        config.retain_universe("dax").unwrap();
        assert_eq!(config.universes.len(), 1);
        assert_eq!(config.universes[0].name, "DAX");

        let mut config = ReportConfig::default_indices();
        assert!(matches!(
            config.retain_universe("FTSE").unwrap_err(),
            ConfigError::UnknownUniverse(_)
        ));
    }

    #[test]
    fn typed_symbols_follow_the_universe_rules() {
        let config = ReportConfig::default_indices();
        let typed = vec!["sap".to_string(), " sie[1] ".into(), "SAP".into(), "air.pa".into()];
        assert_eq!(
            config.normalize_symbols(Some("dax"), &typed).unwrap(),
            vec!["SAP.DE", "SIE.DE", "AIR.PA"]
        );

        let typed = vec!["brk.b".to_string(), "aapl".into()];
        assert_eq!(
            config.normalize_symbols(Some("S&P 500"), &typed).unwrap(),
            vec!["BRK-B", "AAPL"]
        );
        assert_eq!(
            config.normalize_symbols(None, &typed).unwrap(),
            vec!["BRK.B", "AAPL"]
        );
        assert!(matches!(
            config.normalize_symbols(Some("FTSE"), &typed).unwrap_err(),
            ConfigError::UnknownUniverse(_)
        ));
    }

    #[test]
    fn default_indices_are_valid_and_normalised() {
        let config = ReportConfig::default_indices();
        config.validate().unwrap();
        let universes = config.resolve_universes().unwrap();
        assert_eq!(universes.len(), 4);

        let sp = &universes[0];
        assert_eq!(sp.currency, "USD");
        assert!(sp.tickers.contains(&"BRK-B".to_string()));
        assert!(!sp.tickers.iter().any(|t| t.contains('.')));

        let dax = &universes[2];
        assert!(dax.tickers.contains(&"SAP.DE".to_string()));
        assert!(dax.tickers.contains(&"AIR.PA".to_string()));
    }
}
