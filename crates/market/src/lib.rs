//! Market data access for option chains and underlying price history.
//!
//! Report code depends only on the [`MarketData`] trait so that the data
//! provider can be swapped or faked in tests. [`YahooClient`] is the
//! production implementation.

mod models;
mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use opreport_core::AppResult;

pub use models::{
    HistoryRange, Interval, OptionChain, OptionContract, OptionType, PriceBar,
};
pub use yahoo::{YahooClient, YahooConfig};

/// Source of option chains and price history.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Listed expirations for the underlying, ascending.
    async fn expirations(&self, symbol: &str) -> AppResult<Vec<NaiveDate>>;

    /// Calls and puts of a single expiration.
    async fn option_chain(&self, symbol: &str, expiration: NaiveDate) -> AppResult<OptionChain>;

    /// Every listed expiration concatenated into one chain.
    async fn full_chain(&self, symbol: &str) -> AppResult<OptionChain>;

    /// Last regular-market price of the underlying.
    async fn price(&self, symbol: &str) -> AppResult<f64>;

    /// OHLCV bars for the symbol, which may be an option contract symbol.
    async fn history(
        &self,
        symbol: &str,
        interval: Interval,
        range: HistoryRange,
    ) -> AppResult<Vec<PriceBar>>;
}
