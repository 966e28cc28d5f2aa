//! Yahoo Finance data provider.
//!
//! Daily history and live prices come from the v8 chart API; industry and
//! sector come from the v10 quoteSummary `assetProfile` module, best effort:
//! a refused profile request leaves them absent. quoteSummary wants a session
//! cookie plus a matching crumb, obtained once per provider on first use.
//! Requests are made once: a failure is reported to the caller, never
//! retried. Every request is bounded by the client timeout and passes through
//! the shared circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes, which surface as `DataError::ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, HistoryProvider, QuoteProvider, RawBar};
use crate::domain::LiveQuote;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// v10 quoteSummary response, restricted to the asset profile.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    industry: Option<String>,
    sector: Option<String>,
}

/// Yahoo Finance provider for both history and live quotes.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    /// `None` once the crumb request has failed; profiles are then skipped.
    crumb: OnceLock<Option<String>>,
}

impl YahooProvider {
    /// Build a provider whose requests each time out after `timeout`.
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            crumb: OnceLock::new(),
        })
    }

    /// Chart URL for daily bars over an inclusive date range.
    fn history_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = (end + ChronoDuration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{CHART_BASE}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true&events=div%2Csplit"
        )
    }

    fn live_url(symbol: &str) -> String {
        format!("{CHART_BASE}/{symbol}?range=5d&interval=1d")
    }

    fn profile_url(symbol: &str, crumb: &str) -> Result<String, DataError> {
        reqwest::Url::parse_with_params(
            &format!("{SUMMARY_BASE}/{symbol}"),
            &[("modules", "assetProfile"), ("crumb", crumb)],
        )
        .map(|url| url.to_string())
        .map_err(|e| DataError::Other(format!("bad profile URL for {symbol}: {e}")))
    }

    /// Session crumb, fetched on first call and reused afterwards.
    fn crumb(&self) -> Option<&str> {
        self.crumb
            .get_or_init(|| match self.fetch_crumb() {
                Ok(crumb) => Some(crumb),
                Err(e) => {
                    warn!(error = %e, "no Yahoo Finance crumb, industry and sector will be absent");
                    None
                }
            })
            .as_deref()
    }

    fn fetch_crumb(&self) -> Result<String, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        // Answers 404, but sets the session cookie the crumb is bound to.
        if let Err(e) = self.client.get(COOKIE_URL).send() {
            debug!(error = %e, "cookie request failed");
        }

        let resp = self
            .client
            .get(CRUMB_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if !status.is_success() {
            return Err(DataError::AuthenticationRequired(format!(
                "crumb request returned HTTP {status}"
            )));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable crumb: {e}")))?;
        parse_crumb(&body)
    }

    /// Single GET through the circuit breaker, decoded as JSON.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        // Timeouts and refused connections stay scoped to this request.
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            self.circuit_breaker.record_success();
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(format!(
                "Yahoo Finance refused {url}"
            )));
        }

        if status.is_server_error() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let body = resp.json::<T>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        self.circuit_breaker.record_success();
        Ok(body)
    }

    fn first_chart(symbol: &str, resp: ChartResponse) -> Result<ChartData, DataError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => return Err(Self::api_error(symbol, resp.chart.error)),
        };
        result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))
    }

    fn api_error(symbol: &str, error: Option<ApiError>) -> DataError {
        match error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        }
    }

    /// Parse the chart API response into raw bars.
    fn parse_history(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let data = Self::first_chart(symbol, resp)?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten());

            // Holidays and halted sessions come back as all-null rows
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(RawBar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
                adj_close: adj_close.unwrap_or(f64::NAN),
            });
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Live price and display name from a short-range chart response.
    ///
    /// Prefers `regularMarketPrice`, falling back to the last non-null close.
    fn parse_live(symbol: &str, resp: ChartResponse) -> Result<LiveQuote, DataError> {
        let data = Self::first_chart(symbol, resp)?;
        let meta = data.meta;

        let last_close = data
            .indicators
            .quote
            .first()
            .and_then(|q| q.close.iter().rev().find_map(|c| *c));

        let live_price = meta
            .as_ref()
            .and_then(|m| m.regular_market_price)
            .or(last_close)
            .filter(|p| p.is_finite())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("no live price for {symbol}")))?;

        let name = meta.and_then(|m| m.long_name.or(m.short_name));

        Ok(LiveQuote {
            ticker: symbol.to_string(),
            live_price: Some(live_price),
            name,
            industry: None,
            sector: None,
        })
    }

    fn fetch_profile(&self, symbol: &str) -> Result<AssetProfile, DataError> {
        let crumb = self.crumb().ok_or_else(|| {
            DataError::AuthenticationRequired("no session crumb for quoteSummary".into())
        })?;
        let url = Self::profile_url(symbol, crumb)?;
        let summary: SummaryResponse = self.get_json(symbol, &url)?;
        Self::parse_profile(symbol, summary)
    }

    fn parse_profile(symbol: &str, resp: SummaryResponse) -> Result<AssetProfile, DataError> {
        let result = match resp.quote_summary.result {
            Some(result) => result,
            None => return Err(Self::api_error(symbol, resp.quote_summary.error)),
        };
        Ok(result
            .into_iter()
            .next()
            .and_then(|d| d.asset_profile)
            .unwrap_or(AssetProfile {
                industry: None,
                sector: None,
            }))
    }
}

fn parse_crumb(body: &str) -> Result<String, DataError> {
    let crumb = body.trim();
    // An HTML consent page comes back with 200 when the cookie was refused.
    if crumb.is_empty() || crumb.contains('<') || crumb.contains(char::is_whitespace) {
        return Err(DataError::AuthenticationRequired(
            "crumb endpoint returned no crumb".into(),
        ));
    }
    Ok(crumb.to_string())
}

/// Copy industry and sector onto the quote. Only a tripped breaker fails the
/// quote; any other profile error leaves both absent.
fn merge_profile(
    quote: &mut LiveQuote,
    profile: Result<AssetProfile, DataError>,
) -> Result<(), DataError> {
    match profile {
        Ok(profile) => {
            quote.industry = profile.industry;
            quote.sector = profile.sector;
            Ok(())
        }
        Err(DataError::CircuitBreakerTripped) => Err(DataError::CircuitBreakerTripped),
        Err(e) => {
            debug!(symbol = %quote.ticker, error = %e, "asset profile unavailable");
            Ok(())
        }
    }
}

impl HistoryProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let chart: ChartResponse = self.get_json(symbol, &Self::history_url(symbol, start, end))?;
        Self::parse_history(symbol, chart)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn quote(&self, symbol: &str) -> Result<LiveQuote, DataError> {
        let chart: ChartResponse = self.get_json(symbol, &Self::live_url(symbol))?;
        let mut quote = Self::parse_live(symbol, chart)?;
        merge_profile(&mut quote, self.fetch_profile(symbol))?;
        Ok(quote)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
