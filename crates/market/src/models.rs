//! Market data models shared by the client and the analytics crate.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Option type (Call or Put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single listed option contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub contract_symbol: String,
    pub option_type: OptionType,
    pub expiration: NaiveDate,
    pub strike: f64,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub open_interest: u64,
    pub volume: u64,
    /// Annualized implied volatility as a fraction (0.20 = 20%).
    pub implied_volatility: f64,
}

impl OptionContract {
    #[inline]
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.option_type == OptionType::Call
    }

    #[inline]
    #[must_use]
    pub fn is_put(&self) -> bool {
        self.option_type == OptionType::Put
    }
}

/// Calls and puts for one underlying, possibly spanning many expirations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub contracts: Vec<OptionContract>,
}

impl OptionChain {
    #[must_use]
    pub fn new(symbol: impl Into<String>, contracts: Vec<OptionContract>) -> Self {
        Self {
            symbol: symbol.into(),
            contracts,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Distinct expirations in ascending order.
    #[must_use]
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.contracts.iter().map(|c| c.expiration).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Earliest listed expiration.
    #[must_use]
    pub fn first_expiration(&self) -> Option<NaiveDate> {
        self.contracts.iter().map(|c| c.expiration).min()
    }

    #[must_use]
    pub fn filter(&self, pred: impl Fn(&OptionContract) -> bool) -> Self {
        Self {
            symbol: self.symbol.clone(),
            contracts: self.contracts.iter().filter(|c| pred(c)).cloned().collect(),
        }
    }

    #[must_use]
    pub fn for_expiration(&self, expiration: NaiveDate) -> Self {
        self.filter(|c| c.expiration == expiration)
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_call())
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_put())
    }

    /// Append another chain's contracts (used to stitch expirations together).
    pub fn extend(&mut self, other: Self) {
        self.contracts.extend(other.contracts);
    }
}

/// OHLCV bar of the underlying or of an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bar interval supported by the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minutes15,
    Minutes60,
    Daily,
}

impl Interval {
    /// Provider query-string value.
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Minutes15 => "15m",
            Self::Minutes60 => "60m",
            Self::Daily => "1d",
        }
    }
}

/// How far back to request history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    Since(DateTime<Utc>),
    Max,
}
