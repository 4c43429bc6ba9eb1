//! Black-Scholes gamma from quoted implied volatility.

use chrono::NaiveDate;
use opreport_market::{OptionContract, OptionType};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

const DAYS_PER_YEAR: f64 = 365.0;

/// Market inputs shared by every contract of one underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksParams {
    /// Current spot price of underlying
    pub spot: f64,
    /// Risk-free interest rate (annualized, e.g., 0.045 for 4.5%)
    pub risk_free_rate: f64,
    /// Dividend yield (annualized)
    pub dividend_yield: f64,
    /// Valuation date
    pub today: NaiveDate,
}

/// Year fraction to expiry, floored at one day so expiring contracts stay finite.
#[must_use]
pub fn time_to_expiry(today: NaiveDate, expiration: NaiveDate) -> f64 {
    let days = (expiration - today).num_days().max(1);
    #[allow(clippy::cast_precision_loss)]
    let days = days as f64;
    days / DAYS_PER_YEAR
}

/// Γ = e^(-qT) · φ(d1) / (S · σ · √T)
///
/// Returns `None` for non-positive inputs or a non-finite result.
#[must_use]
pub fn black_scholes_gamma(
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    risk_free_rate: f64,
    dividend_yield: f64,
    iv: f64,
) -> Option<f64> {
    if spot <= 0.0 || strike <= 0.0 || time_to_expiry <= 0.0 || iv <= 0.0 {
        return None;
    }

    let sqrt_t = time_to_expiry.sqrt();
    let d1 = ((spot / strike).ln()
        + (risk_free_rate - dividend_yield + 0.5 * iv * iv) * time_to_expiry)
        / (iv * sqrt_t);

    let normal = Normal::new(0.0, 1.0).ok()?;
    let gamma = (-dividend_yield * time_to_expiry).exp() * normal.pdf(d1) / (spot * iv * sqrt_t);

    gamma.is_finite().then_some(gamma)
}

/// Gamma of one contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrikeGamma {
    pub strike: f64,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub gamma: f64,
    pub open_interest: u64,
}

/// Gamma of every contract with a usable implied volatility, largest first.
#[must_use]
pub fn strike_gammas<'a>(
    contracts: impl IntoIterator<Item = &'a OptionContract>,
    params: &GreeksParams,
) -> Vec<StrikeGamma> {
    let mut gammas: Vec<StrikeGamma> = contracts
        .into_iter()
        .filter_map(|c| {
            let gamma = black_scholes_gamma(
                params.spot,
                c.strike,
                time_to_expiry(params.today, c.expiration),
                params.risk_free_rate,
                params.dividend_yield,
                c.implied_volatility,
            )?;
            Some(StrikeGamma {
                strike: c.strike,
                expiration: c.expiration,
                option_type: c.option_type,
                gamma,
                open_interest: c.open_interest,
            })
        })
        .collect();

    gammas.sort_by(|a, b| b.gamma.total_cmp(&a.gamma));
    gammas
}
