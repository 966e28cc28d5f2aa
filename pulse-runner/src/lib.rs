//! MarketPulse Runner — report configuration, pipeline orchestration, rendering.
//!
//! This crate builds on `pulse-core` to provide:
//! - TOML report configuration with validation and built-in index sections
//! - The per-universe pipeline (history → references → live → evolution → ranking)
//! - Multi-universe fan-out on the rayon pool
//! - Text and JSON rendering of the ranked sections

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{ConfigError, ReportConfig, ReportSettings, UniverseConfig};
pub use pipeline::{run_universe, PipelineError, Stage, UniverseReport};
pub use report::{render_json, render_text, run_report, Report, UniverseFailure};
