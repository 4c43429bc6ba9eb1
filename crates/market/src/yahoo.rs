//! Yahoo Finance client for option chains and price history.
//!
//! The public query endpoints require a session cookie plus a matching
//! crumb; both are fetched lazily on the first request and reused for the
//! lifetime of the client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use opreport_core::{AppError, AppResult, OptionExt, ResultExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::MarketData;
use crate::models::{
    HistoryRange, Interval, OptionChain, OptionContract, OptionType, PriceBar,
};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Maximum number of body characters quoted in error messages.
const ERROR_BODY_PREVIEW: usize = 160;

/// Yahoo client configuration.
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub cookie_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Yahoo Finance market data client.
pub struct YahooClient {
    http: Client,
    config: YahooConfig,
    crumb: OnceCell<String>,
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.config.base_url)
            .field("has_crumb", &self.crumb.initialized())
            .finish_non_exhaustive()
    }
}

impl YahooClient {
    /// Create a new client.
    pub fn new(config: YahooConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .internal("Failed to create HTTP client")?;

        info!(base_url = %config.base_url, "Yahoo market data client initialized");

        Ok(Self {
            http,
            config,
            crumb: OnceCell::new(),
        })
    }

    async fn crumb(&self) -> AppResult<&str> {
        self.crumb
            .get_or_try_init(|| async {
                // Only the Set-Cookie header matters here; the status is usually 404
                if let Err(e) = self.http.get(&self.config.cookie_url).send().await {
                    debug!(error = %e, "Cookie request failed");
                }

                let url = format!("{}/v1/test/getcrumb", self.config.base_url);
                let crumb = self.get_text("getcrumb", &url, &[]).await?;
                let crumb = crumb.trim().to_string();
                if crumb.is_empty() || crumb.contains('<') {
                    return Err(AppError::upstream("getcrumb", "empty or invalid crumb"));
                }
                debug!("Obtained Yahoo crumb");
                Ok(crumb)
            })
            .await
            .map(String::as_str)
    }

    async fn get_text(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<String> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .upstream(endpoint)?;

        let status = response.status();
        let body = response.text().await.upstream(endpoint)?;

        if !status.is_success() {
            return Err(AppError::upstream(
                endpoint,
                format!("HTTP {status}: {}", preview(&body)),
            ));
        }
        Ok(body)
    }

    async fn fetch_options(
        &self,
        symbol: &str,
        expiration: Option<NaiveDate>,
    ) -> AppResult<OptionsSnapshot> {
        let endpoint = format!("options/{symbol}");
        let url = format!(
            "{}/v7/finance/options/{}",
            self.config.base_url,
            urlencoding::encode(symbol)
        );

        let mut query = vec![("crumb", self.crumb().await?.to_string())];
        if let Some(date) = expiration {
            query.push(("date", date_to_unix(date).to_string()));
        }

        let body = self.get_text(&endpoint, &url, &query).await?;
        parse_options(symbol, &body)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        query: Vec<(&str, String)>,
    ) -> AppResult<ChartSnapshot> {
        let endpoint = format!("chart/{symbol}");
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url,
            urlencoding::encode(symbol)
        );

        let mut query = query;
        query.push(("crumb", self.crumb().await?.to_string()));

        let body = self.get_text(&endpoint, &url, &query).await?;
        parse_chart(&body)
    }
}

#[async_trait]
impl MarketData for YahooClient {
    #[instrument(skip(self))]
    async fn expirations(&self, symbol: &str) -> AppResult<Vec<NaiveDate>> {
        Ok(self.fetch_options(symbol, None).await?.expirations)
    }

    #[instrument(skip(self))]
    async fn option_chain(&self, symbol: &str, expiration: NaiveDate) -> AppResult<OptionChain> {
        Ok(self.fetch_options(symbol, Some(expiration)).await?.chain)
    }

    #[instrument(skip(self))]
    async fn full_chain(&self, symbol: &str) -> AppResult<OptionChain> {
        let expirations = self.expirations(symbol).await?;
        let mut chain = OptionChain::new(symbol, Vec::new());

        for expiration in &expirations {
            chain.extend(self.option_chain(symbol, *expiration).await?);
        }

        info!(
            symbol,
            expirations = expirations.len(),
            contracts = chain.len(),
            "Fetched full option chain"
        );
        Ok(chain)
    }

    #[instrument(skip(self))]
    async fn price(&self, symbol: &str) -> AppResult<f64> {
        let snapshot = self
            .fetch_chart(symbol, vec![("interval", "1d".into()), ("range", "1d".into())])
            .await?;

        snapshot
            .regular_market_price
            .or_else(|| snapshot.bars.last().map(|b| b.close))
            .ok_or_not_found("Market price", symbol)
    }

    #[instrument(skip(self))]
    async fn history(
        &self,
        symbol: &str,
        interval: Interval,
        range: HistoryRange,
    ) -> AppResult<Vec<PriceBar>> {
        let mut query = vec![
            ("interval", interval.as_query().to_string()),
            ("includePrePost", "false".to_string()),
        ];
        match range {
            HistoryRange::Since(start) => {
                query.push(("period1", start.timestamp().to_string()));
                query.push(("period2", Utc::now().timestamp().to_string()));
            }
            HistoryRange::Max => query.push(("range", "max".to_string())),
        }

        let snapshot = self.fetch_chart(symbol, query).await?;
        debug!(symbol, bars = snapshot.bars.len(), "Fetched price history");
        Ok(snapshot.bars)
    }
}

// =============================================================================
// Payload decoding
// =============================================================================

#[derive(Debug, Deserialize)]
struct ResultSet<T> {
    result: Option<Vec<T>>,
    error: Option<Value>,
}

impl<T> ResultSet<T> {
    fn into_first(self, endpoint: &str) -> AppResult<T> {
        if let Some(error) = self.error.filter(|e| !e.is_null()) {
            return Err(AppError::upstream(endpoint, error));
        }
        self.result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AppError::upstream(endpoint, "empty result"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsEnvelope {
    option_chain: ResultSet<RawOptionsResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptionsResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    quote: Option<RawQuote>,
    #[serde(default)]
    options: Vec<RawExpiry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawExpiry {
    #[serde(default)]
    calls: Vec<RawContract>,
    #[serde(default)]
    puts: Vec<RawContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    contract_symbol: String,
    strike: f64,
    expiration: i64,
    last_price: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    volume: Option<f64>,
    open_interest: Option<f64>,
    implied_volatility: Option<f64>,
}

impl RawContract {
    fn into_contract(self, option_type: OptionType) -> Option<OptionContract> {
        Some(OptionContract {
            contract_symbol: self.contract_symbol,
            option_type,
            expiration: unix_to_date(self.expiration)?,
            strike: self.strike,
            last_price: self.last_price.unwrap_or_default(),
            bid: self.bid.unwrap_or_default(),
            ask: self.ask.unwrap_or_default(),
            open_interest: to_count(self.open_interest),
            volume: to_count(self.volume),
            implied_volatility: self.implied_volatility.unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
struct OptionsSnapshot {
    expirations: Vec<NaiveDate>,
    chain: OptionChain,
}

fn parse_options(symbol: &str, body: &str) -> AppResult<OptionsSnapshot> {
    let endpoint = format!("options/{symbol}");
    let envelope: OptionsEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::upstream(&endpoint, format!("{e}; body: {}", preview(body))))?;
    let result = envelope.option_chain.into_first(&endpoint)?;

    let mut expirations: Vec<NaiveDate> = result
        .expiration_dates
        .iter()
        .filter_map(|ts| unix_to_date(*ts))
        .collect();
    expirations.sort_unstable();
    expirations.dedup();

    let mut contracts = Vec::new();
    for expiry in result.options {
        contracts.extend(
            expiry
                .calls
                .into_iter()
                .filter_map(|c| c.into_contract(OptionType::Call)),
        );
        contracts.extend(
            expiry
                .puts
                .into_iter()
                .filter_map(|c| c.into_contract(OptionType::Put)),
        );
    }

    // Keep the quote price visible in debug output when diagnosing stale chains
    if let Some(price) = result.quote.and_then(|q| q.regular_market_price) {
        debug!(symbol, price, "Option chain quote");
    }

    Ok(OptionsSnapshot {
        expirations,
        chain: OptionChain::new(symbol, contracts),
    })
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ResultSet<RawChartResult>,
}

#[derive(Debug, Deserialize)]
struct RawChartResult {
    meta: RawChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: RawIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawIndicators {
    #[serde(default)]
    quote: Vec<RawQuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug)]
struct ChartSnapshot {
    regular_market_price: Option<f64>,
    bars: Vec<PriceBar>,
}

fn parse_chart(body: &str) -> AppResult<ChartSnapshot> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::upstream("chart", format!("{e}; body: {}", preview(body))))?;
    let result = envelope.chart.into_first("chart")?;
    let series = result.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            Some(PriceBar {
                time: DateTime::from_timestamp(*ts, 0)?,
                open: at(&series.open, i)?,
                high: at(&series.high, i)?,
                low: at(&series.low, i)?,
                close: at(&series.close, i)?,
                volume: to_count(at(&series.volume, i)),
            })
        })
        .collect();

    Ok(ChartSnapshot {
        regular_market_price: result.meta.regular_market_price,
        bars,
    })
}

fn unix_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

fn date_to_unix(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |dt| dt.and_utc().timestamp())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}
