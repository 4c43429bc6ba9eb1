//! Report sections: a `<h5>` heading followed by a chart.

use std::fmt;

use chrono::{Days, NaiveDate, NaiveTime};
use opreport_analytics::{
    Concentration, DEFAULT_RSI_PERIOD, GreeksParams, Levels, StrikeBand, call_put_walls,
    expiration_concentration, gamma_exposure, intraday_lookback_days, long_period_start, rsi,
    select_momentum_contract, strike_table,
};
use opreport_core::{AppResult, ResultExt};
use opreport_market::{HistoryRange, Interval, MarketData, OptionChain, OptionType, PriceBar};
use tracing::{debug, info, instrument, warn};

use crate::charts::{Axis, Figure, Line};
use crate::html::h;

const RSI_COLORS: [&str; 3] = ["white", "red", "blue"];
const RSI_MIDLINE: f64 = 50.0;

/// Which expirations of the chain a section covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// The nearest listed expiration.
    Current,
    NextFriday(NaiveDate),
    Expiration(NaiveDate),
}

impl Scope {
    fn select(self, chain: &OptionChain) -> (OptionChain, Option<NaiveDate>) {
        match self {
            Self::All => (chain.clone(), None),
            Self::Current => match chain.first_expiration() {
                Some(d) => (chain.for_expiration(d), Some(d)),
                None => (OptionChain::new(chain.symbol.clone(), Vec::new()), None),
            },
            Self::NextFriday(d) | Self::Expiration(d) => (chain.for_expiration(d), Some(d)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all expirations"),
            Self::Current => f.write_str("current expiration"),
            Self::NextFriday(_) => f.write_str("next Friday expiration"),
            Self::Expiration(_) => f.write_str("expiration"),
        }
    }
}

fn scope_heading(scope: Scope, expiration: Option<NaiveDate>) -> String {
    match expiration {
        Some(d) => format!("{scope}: {d}"),
        None => scope.to_string(),
    }
}

fn chart(figure: &Figure) -> AppResult<String> {
    figure.to_html().internal("Failed to serialize chart")
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: u64) -> f64 {
    n as f64
}

/// Calls up in green and puts down in red, per expiration.
pub fn expiration_concentration_plot(
    chain: &OptionChain,
    concentration: Concentration,
) -> AppResult<String> {
    let label = concentration.label();
    info!(symbol = %chain.symbol, concentration = label, "Expiration concentration");

    let totals = expiration_concentration(chain, concentration);
    let x: Vec<String> = totals.iter().map(|t| t.expiration.to_string()).collect();

    let mut figure = Figure::new().category_x();
    figure
        .bar(
            Axis::Labels(x.clone()),
            totals.iter().map(|t| as_f64(t.calls)).collect(),
            format!("Calls: {label}"),
            "green",
        )
        .bar(
            Axis::Labels(x),
            totals.iter().map(|t| -as_f64(t.puts)).collect(),
            format!("Puts: {label}"),
            "red",
        );

    Ok(h(5, &format!("Expiration concentration for {label}")) + &chart(&figure)?)
}

/// Per-strike call and put figures near the price, with price and walls marked.
pub fn absolute_concentration_plot(
    chain: &OptionChain,
    price: f64,
    scope: Scope,
    concentration: Concentration,
    price_range: f64,
) -> AppResult<String> {
    let (scoped, expiration) = scope.select(chain);
    let label = concentration.label();
    let heading = h(
        5,
        &format!("Absolute {label}: {}", scope_heading(scope, expiration)),
    );
    info!(symbol = %chain.symbol, %scope, concentration = label, "Absolute concentration");

    let rows = strike_table(&scoped.contracts, StrikeBand::around(price, price_range));
    if rows.is_empty() {
        return Ok(heading + &h(5, "No strikes listed on both sides in range"));
    }
    let walls = call_put_walls(&rows, price, concentration);
    let strikes: Vec<f64> = rows.iter().map(|r| r.strike).collect();

    let mut figure = Figure::new();
    figure
        .bar(
            Axis::Numbers(strikes.clone()),
            rows.iter().map(|r| as_f64(r.calls(concentration))).collect(),
            format!("{label}_call"),
            "green",
        )
        .bar(
            Axis::Numbers(strikes),
            rows.iter().map(|r| -as_f64(r.puts(concentration))).collect(),
            format!("{label}_put"),
            "red",
        )
        .vline(
            price,
            format!("Current stock price: {price:.2}"),
            Line::solid("white", 0.8),
        );
    if let Some(put_wall) = walls.put_wall {
        figure.vline(put_wall, format!("Put wall = {put_wall}"), Line::solid("red", 0.8));
    }
    if let Some(call_wall) = walls.call_wall {
        figure.vline(
            call_wall,
            format!("Call wall = {call_wall}"),
            Line::solid("blue", 0.8),
        );
    }

    Ok(heading + &chart(&figure)?)
}

/// Dealer gamma exposure per strike for a 1% move.
pub fn gex_plot(
    chain: &OptionChain,
    price: f64,
    scope: Scope,
    price_range: f64,
    params: &GreeksParams,
) -> AppResult<String> {
    let (scoped, expiration) = scope.select(chain);
    let heading = h(5, &format!("Gamma exposure: {}", scope_heading(scope, expiration)));
    info!(symbol = %chain.symbol, %scope, "Gamma exposure");

    let exposure = gamma_exposure(
        &scoped.contracts,
        StrikeBand::around(price, price_range),
        params,
    );
    if exposure.is_empty() {
        return Ok(heading + &h(5, "No gamma exposure in range"));
    }

    let net: f64 = exposure.iter().map(opreport_analytics::StrikeExposure::net).sum();
    let strikes: Vec<f64> = exposure.iter().map(|e| e.strike).collect();

    let mut figure = Figure::new();
    figure
        .bar(
            Axis::Numbers(strikes.clone()),
            exposure.iter().map(|e| e.call_gex).collect(),
            "Call GEX",
            "green",
        )
        .bar(
            Axis::Numbers(strikes),
            exposure.iter().map(|e| e.put_gex).collect(),
            "Put GEX",
            "red",
        )
        .vline(
            price,
            format!("Current stock price: {price:.2}"),
            Line::solid("white", 0.8),
        );

    Ok(heading + &h(5, &format!("Net GEX: {net:.0}")) + &chart(&figure)?)
}

fn time_labels(bars: &[PriceBar]) -> Vec<String> {
    bars.iter()
        .map(|b| b.time.format("%Y-%m-%d %H:%M").to_string())
        .collect()
}

/// Candlesticks with each level drawn as a dashed horizontal line.
pub fn stock_plot_with_levels(symbol: &str, bars: &[PriceBar], levels: &Levels) -> AppResult<String> {
    let mut figure = Figure::new().category_x().title(symbol);
    figure.candlestick(
        Axis::Labels(time_labels(bars)),
        [
            bars.iter().map(|b| b.open).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.close).collect(),
        ],
        symbol,
    );
    for level in levels.iter() {
        figure.hline(
            level.value,
            format!("{} : {:.2}", level.kind, level.value),
            Line::dashed(level.kind.color(), 0.5),
        );
    }
    chart(&figure)
}

fn since(day: NaiveDate) -> HistoryRange {
    HistoryRange::Since(day.and_time(NaiveTime::MIN).and_utc())
}

/// Three months of hourly bars.
#[instrument(skip(market, levels))]
pub async fn long_period_plot(
    market: &dyn MarketData,
    symbol: &str,
    levels: &Levels,
    today: NaiveDate,
) -> AppResult<String> {
    let bars = market
        .history(symbol, Interval::Minutes60, since(long_period_start(today)))
        .await?;
    debug!(bars = bars.len(), "Loaded long period history");
    Ok(h(5, "Longterm chart with extra data:") + &stock_plot_with_levels(symbol, &bars, levels)?)
}

/// Recent 15-minute bars, reaching over the weekend early in the week.
#[instrument(skip(market, levels))]
pub async fn one_day_plot(
    market: &dyn MarketData,
    symbol: &str,
    levels: &Levels,
    today: NaiveDate,
) -> AppResult<String> {
    let start = today - Days::new(intraday_lookback_days(today));
    let bars = market
        .history(symbol, Interval::Minutes15, since(start))
        .await?;
    debug!(bars = bars.len(), "Loaded intraday history");
    Ok(h(5, "One day trading chart with extra data:")
        + &stock_plot_with_levels(symbol, &bars, levels)?)
}

fn side_label(side: OptionType) -> &'static str {
    match side {
        OptionType::Call => "CALL:",
        OptionType::Put => "PUT:",
    }
}

fn join_dates(dates: &[NaiveDate]) -> String {
    let joined: Vec<String> = dates.iter().map(NaiveDate::to_string).collect();
    format!("[{}]", joined.join(", "))
}

/// RSI of the daily closes of one out-of-the-money contract per expiration.
#[instrument(skip(market, expirations), fields(expirations = expirations.len()))]
pub async fn rsi_options_plot(
    market: &dyn MarketData,
    symbol: &str,
    expirations: &[NaiveDate],
    side: OptionType,
    price: f64,
) -> AppResult<String> {
    let mut figure = Figure::new().category_x();
    let mut last_strike = None;

    for (index, expiration) in expirations.iter().enumerate() {
        let chain = market.option_chain(symbol, *expiration).await?;
        let Some(contract) = select_momentum_contract(&chain, price, side) else {
            debug!(%expiration, "No contract to follow");
            continue;
        };
        info!(contract = %contract.contract_symbol, strike = contract.strike, "Momentum contract");

        let bars = match market
            .history(&contract.contract_symbol, Interval::Daily, HistoryRange::Max)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(contract = %contract.contract_symbol, error = %e, "No contract history");
                continue;
            }
        };
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let points: Vec<(String, f64)> = rsi(&closes, DEFAULT_RSI_PERIOD)
            .into_iter()
            .zip(&bars)
            .filter_map(|(value, bar)| Some((bar.time.format("%Y-%m-%d").to_string(), value?)))
            .collect();
        if points.is_empty() {
            continue;
        }

        if figure.is_empty() {
            figure.hline(RSI_MIDLINE, "RSI Trend", Line::solid("white", 0.8));
        }
        let (x, y): (Vec<String>, Vec<f64>) = points.into_iter().unzip();
        figure.line(
            Axis::Labels(x),
            y,
            format!("{expiration}: {}", contract.strike),
            Line::solid(RSI_COLORS[index % RSI_COLORS.len()], 0.8),
        );
        last_strike = Some(contract.strike);
    }

    let kind = side_label(side);
    match last_strike {
        Some(strike) => Ok(h(
            5,
            &format!(
                "The RSI momentum plot for following options expirations {}.",
                join_dates(expirations)
            ),
        ) + &h(5, &format!("{kind} STRIKE: {strike}"))
            + &chart(&figure)?),
        None => Ok(h(
            5,
            &format!(
                "No data for {symbol} type {kind} with {} expiration.",
                join_dates(expirations)
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMarket, call, date, put};

    fn chain() -> OptionChain {
        OptionChain::new(
            "SPY",
            vec![
                call("2026-10-19", 100.0, 500, 1_000),
                put("2026-10-19", 100.0, 400, 2_000),
                call("2026-10-19", 102.0, 900, 3_000),
                put("2026-10-19", 102.0, 10, 100),
                call("2026-10-23", 98.0, 50, 700),
                put("2026-10-23", 98.0, 60, 4_000),
            ],
        )
    }

    fn params() -> GreeksParams {
        GreeksParams {
            spot: 100.0,
            risk_free_rate: 0.045,
            dividend_yield: 0.0,
            today: date("2026-10-18"),
        }
    }

    #[test]
    fn scope_selection() {
        let (current, exp) = Scope::Current.select(&chain());
        assert_eq!(exp, Some(date("2026-10-19")));
        assert_eq!(current.len(), 4);

        let (friday, exp) = Scope::NextFriday(date("2026-10-23")).select(&chain());
        assert_eq!(exp, Some(date("2026-10-23")));
        assert_eq!(friday.len(), 2);

        assert_eq!(Scope::All.select(&chain()).0.len(), 6);
    }

    #[test]
    fn concentration_sections_have_headings_and_charts() {
        let html = expiration_concentration_plot(&chain(), Concentration::OpenInterest).unwrap();
        assert!(html.starts_with("<h5>Expiration concentration for openInterest</h5>"));
        assert!(html.contains("Plotly.newPlot"));

        let html = absolute_concentration_plot(
            &chain(),
            100.0,
            Scope::Current,
            Concentration::OpenInterest,
            0.05,
        )
        .unwrap();
        assert!(html.contains("Absolute openInterest: current expiration: 2026-10-19"));
        assert!(html.contains("Put wall = 100"));
        assert!(html.contains("Call wall = 102"));
    }

    #[test]
    fn empty_scope_renders_note() {
        let html = absolute_concentration_plot(
            &chain(),
            100.0,
            Scope::NextFriday(date("2026-10-30")),
            Concentration::Volume,
            0.05,
        )
        .unwrap();
        assert!(html.contains("No strikes listed"));
        assert!(!html.contains("Plotly.newPlot"));
    }

    #[test]
    fn gex_section() {
        let html = gex_plot(&chain(), 100.0, Scope::All, 0.05, &params()).unwrap();
        assert!(html.contains("Gamma exposure: all expirations"));
        assert!(html.contains("Net GEX"));
        assert!(html.contains("Call GEX"));
    }

    #[tokio::test]
    async fn price_charts_draw_levels() {
        let market = FakeMarket::new();
        let mut levels = Levels::default();
        levels.push(opreport_analytics::LevelKind::CurrentPrice, 100.0);
        levels.push(opreport_analytics::LevelKind::PutWall, 98.0);

        let html = long_period_plot(&market, "SPY", &levels, date("2026-10-19"))
            .await
            .unwrap();
        assert!(html.contains("Longterm chart"));
        assert!(html.contains("Put wall : 98.00"));
        assert!(html.contains(r#""color":"red""#));

        let html = one_day_plot(&market, "SPY", &levels, date("2026-10-19"))
            .await
            .unwrap();
        assert!(html.contains("One day trading chart"));
    }

    #[tokio::test]
    async fn rsi_plot_follows_one_contract_per_expiration() {
        let market = FakeMarket::new();
        let expirations = [date("2026-10-19"), date("2026-10-23")];
        let html = rsi_options_plot(&market, "SPY", &expirations, OptionType::Put, 100.0)
            .await
            .unwrap();
        assert!(html.contains("[2026-10-19, 2026-10-23]"));
        assert!(html.contains("PUT: STRIKE: 90"));
        assert!(html.contains("RSI Trend"));
        assert!(html.contains(r#""color":"red""#));
    }

    #[tokio::test]
    async fn rsi_plot_skips_contracts_whose_history_fails() {
        let market = FakeMarket::new().failing_contract_history();
        let html = rsi_options_plot(&market, "SPY", &[date("2026-10-19")], OptionType::Call, 100.0)
            .await
            .unwrap();
        assert!(html.starts_with("<h5>No data for SPY type CALL: with [2026-10-19] expiration."));
        assert!(!html.contains("Plotly.newPlot"));

        // the underlying still charts
        assert!(
            long_period_plot(&market, "SPY", &Levels::default(), date("2026-10-19"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn rsi_plot_without_history_reports_no_data() {
        let market = FakeMarket::new().without_history();
        let html = rsi_options_plot(&market, "SPY", &[date("2026-10-19")], OptionType::Call, 100.0)
            .await
            .unwrap();
        assert!(html.starts_with("<h5>No data for SPY type CALL:"));
    }
}
