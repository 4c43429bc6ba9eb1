//! In-memory market data for report tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use opreport_core::{AppError, AppResult};
use opreport_market::{
    HistoryRange, Interval, MarketData, OptionChain, OptionContract, OptionType, PriceBar,
};

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn contract(
    option_type: OptionType,
    expiration: &str,
    strike: f64,
    volume: u64,
    open_interest: u64,
) -> OptionContract {
    OptionContract {
        contract_symbol: format!("SPY{}{}{strike}", expiration.replace('-', ""), option_type),
        option_type,
        expiration: date(expiration),
        strike,
        last_price: 1.25,
        bid: 1.2,
        ask: 1.3,
        open_interest,
        volume,
        implied_volatility: 0.2,
    }
}

pub fn call(expiration: &str, strike: f64, volume: u64, open_interest: u64) -> OptionContract {
    contract(OptionType::Call, expiration, strike, volume, open_interest)
}

pub fn put(expiration: &str, strike: f64, volume: u64, open_interest: u64) -> OptionContract {
    contract(OptionType::Put, expiration, strike, volume, open_interest)
}

pub const EXPIRATIONS: [&str; 3] = ["2026-10-19", "2026-10-23", "2026-11-20"];

/// Strikes 86 to 114 on both sides, most traded 10% out of the money.
pub fn sample_chain() -> OptionChain {
    let mut contracts = Vec::new();
    for expiration in EXPIRATIONS {
        for strike in (86..=114).step_by(2) {
            let strike = f64::from(strike);
            let call_volume = if (strike - 110.0).abs() < 1.0 { 900 } else { 100 };
            let put_volume = if (strike - 90.0).abs() < 1.0 { 800 } else { 100 };
            contracts.push(call(expiration, strike, call_volume, 1_000));
            contracts.push(put(expiration, strike, put_volume, 1_500));
        }
    }
    OptionChain::new("SPY", contracts)
}

pub struct FakeMarket {
    chain: OptionChain,
    price: f64,
    with_history: bool,
    contract_history_fails: bool,
    broken: Vec<String>,
    flaky_failures: AtomicU32,
    chain_requests: AtomicU32,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self {
            chain: sample_chain(),
            price: 100.0,
            with_history: true,
            contract_history_fails: false,
            broken: Vec::new(),
            flaky_failures: AtomicU32::new(0),
            chain_requests: AtomicU32::new(0),
        }
    }

    pub fn without_history(mut self) -> Self {
        self.with_history = false;
        self
    }

    /// History requests for option contracts fail; the underlying still answers.
    pub fn failing_contract_history(mut self) -> Self {
        self.contract_history_fails = true;
        self
    }

    /// Every request for `symbol` fails.
    pub fn broken(mut self, symbol: &str) -> Self {
        self.broken.push(symbol.to_string());
        self
    }

    /// The first `n` full chain requests fail.
    pub fn flaky(self, n: u32) -> Self {
        self.flaky_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn chain_requests(&self) -> u32 {
        self.chain_requests.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> AppResult<()> {
        if self.broken.iter().any(|s| s == symbol) {
            return Err(AppError::upstream("fake", format!("{symbol} unavailable")));
        }
        Ok(())
    }

    fn for_symbol(&self, symbol: &str, chain: OptionChain) -> OptionChain {
        OptionChain::new(symbol, chain.contracts)
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn expirations(&self, symbol: &str) -> AppResult<Vec<NaiveDate>> {
        self.check(symbol)?;
        Ok(self.chain.expirations())
    }

    async fn option_chain(&self, symbol: &str, expiration: NaiveDate) -> AppResult<OptionChain> {
        self.check(symbol)?;
        Ok(self.for_symbol(symbol, self.chain.for_expiration(expiration)))
    }

    async fn full_chain(&self, symbol: &str) -> AppResult<OptionChain> {
        self.chain_requests.fetch_add(1, Ordering::SeqCst);
        self.check(symbol)?;
        let pending = self
            .flaky_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(AppError::upstream("fake", "temporarily unavailable"));
        }
        Ok(self.for_symbol(symbol, self.chain.clone()))
    }

    async fn price(&self, symbol: &str) -> AppResult<f64> {
        self.check(symbol)?;
        Ok(self.price)
    }

    async fn history(
        &self,
        symbol: &str,
        _interval: Interval,
        _range: HistoryRange,
    ) -> AppResult<Vec<PriceBar>> {
        if self.contract_history_fails && symbol != self.chain.symbol {
            return Err(AppError::upstream(
                &format!("chart/{symbol}"),
                "No data found, symbol may be delisted",
            ));
        }
        if !self.with_history {
            return Ok(Vec::new());
        }
        let start = DateTime::from_timestamp(1_788_220_800, 0).unwrap_or_default(); // 2026-09-01
        Ok((0..40u32)
            .map(|i| {
                let close = 10.0 + f64::from(i % 5) + f64::from(i) * 0.1;
                PriceBar {
                    time: start + Days::new(u64::from(i)),
                    open: close - 0.2,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 100,
                }
            })
            .collect())
    }
}
