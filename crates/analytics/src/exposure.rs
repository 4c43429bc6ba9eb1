//! Dealer gamma exposure per strike.

use std::collections::BTreeMap;

use opreport_market::{OptionContract, OptionType};
use serde::Serialize;

use crate::greeks::{GreeksParams, strike_gammas};
use crate::strikes::StrikeBand;

/// Shares per listed contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StrikeExposure {
    pub strike: f64,
    pub call_gex: f64,
    /// Non-positive.
    pub put_gex: f64,
}

impl StrikeExposure {
    #[must_use]
    pub fn net(&self) -> f64 {
        self.call_gex + self.put_gex
    }
}

/// Gamma exposure for a 1% move: `gamma * OI * 100 * S^2 * 0.01`, puts negative.
///
/// Strikes outside `band` are ignored; result is ascending by strike.
#[must_use]
pub fn gamma_exposure<'a>(
    contracts: impl IntoIterator<Item = &'a OptionContract>,
    band: StrikeBand,
    params: &GreeksParams,
) -> Vec<StrikeExposure> {
    let scale = CONTRACT_MULTIPLIER * params.spot * params.spot * 0.01;
    let mut by_strike: BTreeMap<i64, StrikeExposure> = BTreeMap::new();

    let in_band = contracts.into_iter().filter(|c| band.contains(c.strike));
    for g in strike_gammas(in_band, params) {
        #[allow(clippy::cast_possible_truncation)]
        let key = (g.strike * 1_000.0).round() as i64;
        let entry = by_strike.entry(key).or_insert(StrikeExposure {
            strike: g.strike,
            ..StrikeExposure::default()
        });
        #[allow(clippy::cast_precision_loss)]
        let gex = g.gamma * g.open_interest as f64 * scale;
        match g.option_type {
            OptionType::Call => entry.call_gex += gex,
            OptionType::Put => entry.put_gex -= gex,
        }
    }

    by_strike.into_values().collect()
}
