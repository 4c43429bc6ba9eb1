//! Option chain analytics for the daily report.
//!
//! Every function here is a pure transformation of an [`OptionChain`]
//! (or a price series) so the report layer can be tested without network
//! access. Gamma comes from a local Black-Scholes evaluation using the
//! implied volatility quoted with each contract.
//!
//! [`OptionChain`]: opreport_market::OptionChain

pub mod calendar;
pub mod concentration;
pub mod exposure;
pub mod greeks;
pub mod levels;
pub mod rsi;
pub mod selection;
pub mod strikes;

pub use calendar::{intraday_lookback_days, long_period_start, next_friday, should_include_friday};
pub use concentration::{
    Concentration, ExpirationTotals, expiration_concentration, filter_active_volume_expirations,
    volatile_concentration,
};
pub use exposure::{StrikeExposure, gamma_exposure};
pub use greeks::{GreeksParams, StrikeGamma, black_scholes_gamma, strike_gammas};
pub use levels::{Level, LevelKind, Levels, largest_gamma, options_levels};
pub use rsi::{DEFAULT_RSI_PERIOD, rsi};
pub use selection::{momentum_target, select_momentum_contract};
pub use strikes::{StrikeBand, StrikeRow, Walls, call_put_walls, strike_table};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use opreport_market::{OptionContract, OptionType};

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
            contract_symbol: format!("SPY-{expiration}-{option_type}-{strike}"),
            option_type,
            expiration: date(expiration),
            strike,
            last_price: 1.0,
            bid: 0.95,
            ask: 1.05,
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
}
