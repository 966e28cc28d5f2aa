//! MarketPulse CLI — reference prices, live evolution, and top/worst movers.
//!
//! Commands:
//! - `run` — run every configured universe and print the ranked report
//! - `references` — build and print reference prices for a few symbols
//! - `universes` — list configured universes after symbol normalisation

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulse_core::data::{download_history, CircuitBreaker, YahooProvider};
use pulse_core::{build_references, Horizon, ReferenceSet};
use pulse_runner::{render_json, render_text, run_report, ReportConfig, ReportSettings};

#[derive(Parser)]
#[command(
    name = "pulse",
    version,
    about = "MarketPulse — index movers versus previous close, 1W, 1M and 1Y"
)]
struct Cli {
    /// Debug logging (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the report for every configured universe.
    Run {
        /// Path to a TOML report config. Defaults to the built-in indices.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Override the size of the top and worst lists.
        #[arg(long)]
        top_n: Option<usize>,

        /// Only run the named universe.
        #[arg(long)]
        universe: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Run universes one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Build reference prices for the given symbols (no live quotes).
    References {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Path to a TOML report config. Defaults to the built-in indices.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Normalise symbols with this universe's rules (e.g. `sap` → `SAP.DE` for DAX).
        #[arg(long)]
        universe: Option<String>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List configured universes with their ticker counts.
    Universes {
        /// Path to a TOML report config. Defaults to the built-in indices.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            as_of,
            top_n,
            universe,
            format,
            sequential,
        } => run_cmd(config.as_deref(), as_of, top_n, universe, format, sequential),
        Commands::References {
            symbols,
            config,
            universe,
            as_of,
            format,
        } => references_cmd(config.as_deref(), &symbols, universe.as_deref(), as_of, format),
        Commands::Universes { config } => universes_cmd(config.as_deref()),
    }
}

/// Log to stderr so stdout carries only the report.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_as_of(as_of: Option<String>) -> Result<NaiveDate> {
    Ok(as_of
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--as-of must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive()))
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig> {
    match path {
        Some(path) => ReportConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ReportConfig::default_indices()),
    }
}

/// One provider, and one breaker, for every universe in the run. The breaker
/// only trips on Yahoo refusing the client, which holds for all of them.
fn yahoo(settings: &ReportSettings) -> Result<YahooProvider> {
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    Ok(YahooProvider::new(circuit_breaker, settings.request_timeout())?)
}

fn run_cmd(
    config_path: Option<&Path>,
    as_of: Option<String>,
    top_n: Option<usize>,
    universe: Option<String>,
    format: OutputFormat,
    sequential: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(n) = top_n {
        config.report.top_n = n;
    }
    if sequential {
        config.report.parallel_universes = false;
    }
    if let Some(name) = universe {
        config.retain_universe(&name)?;
    }
    config.validate()?;

    let as_of = parse_as_of(as_of)?;
    let universes = config.resolve_universes()?;
    let provider = yahoo(&config.report)?;

    info!(%as_of, universes = universes.len(), "starting report");
    let report = run_report(&universes, &provider, &provider, as_of, &config.report);

    match format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", render_json(&report)?),
    }

    if report.has_failures() {
        for f in &report.failures {
            eprintln!("Universe {} failed: {}", f.name, f.error);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn references_cmd(
    config_path: Option<&Path>,
    symbols: &[String],
    universe: Option<&str>,
    as_of: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let settings = &config.report;
    let as_of = parse_as_of(as_of)?;
    let tickers = config.normalize_symbols(universe, symbols)?;
    if tickers.is_empty() {
        bail!("no usable symbols given");
    }

    let provider = yahoo(settings)?;
    let start = as_of - Duration::days(i64::from(settings.history_days));
    let download = download_history(&provider, &tickers, start, as_of)?;
    let references = build_references(&download.table, &tickers, as_of, settings.min_history);

    match format {
        OutputFormat::Text => print!("{}", render_references(&references, as_of)),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "as_of": as_of,
                "records": references.records.values().collect::<Vec<_>>(),
                "dropped": references.dropped,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    if references.is_empty() {
        bail!("no symbol produced reference prices");
    }
    Ok(())
}

fn render_references(references: &ReferenceSet, as_of: NaiveDate) -> String {
    let mut out = format!("Reference prices as of {as_of}\n\n");
    out.push_str(&format!(
        "{:<10} {:>12} {:<10}",
        "Ticker", "Prev Close", "Date"
    ));
    for h in Horizon::ALL {
        out.push_str(&format!(" {:>12} {:<10}", h.label(), "Date"));
    }
    out.push('\n');
    out.push_str(&format!("{}\n", "-".repeat(105)));

    for rec in references.records.values() {
        out.push_str(&format!(
            "{:<10} {:>12.2} {:<10}",
            rec.ticker, rec.prev_close.value, rec.prev_close.date
        ));
        for h in Horizon::ALL {
            let anchor = rec.anchor(h);
            out.push_str(&format!(" {:>12.2} {:<10}", anchor.value, anchor.date));
        }
        out.push('\n');
    }

    if !references.dropped.is_empty() {
        out.push_str("\nDropped:\n");
        for d in &references.dropped {
            out.push_str(&format!("  {d}\n"));
        }
    }
    out
}

fn universes_cmd(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let universes = config.resolve_universes()?;

    println!("{:<24} {:<8} {:>8}", "Universe", "Currency", "Tickers");
    println!("{}", "-".repeat(42));
    for u in &universes {
        println!("{:<24} {:<8} {:>8}", u.name, u.currency, u.len());
    }
    Ok(())
}
