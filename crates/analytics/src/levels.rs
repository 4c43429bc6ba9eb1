//! Price levels drawn over the underlying's charts.

use std::fmt;

use opreport_market::{OptionChain, OptionType};
use serde::Serialize;

use crate::concentration::Concentration;
use crate::greeks::{GreeksParams, StrikeGamma, strike_gammas};
use crate::strikes::{StrikeBand, call_put_walls, strike_table};

/// Band used for walls and gamma candidates.
pub const LEVELS_PRICE_RANGE: f64 = 0.05;

/// Number of `Large Gamma` levels kept.
pub const LARGE_GAMMA_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LevelKind {
    CurrentPrice,
    PutWall,
    CallWall,
    /// Rank among the gamma candidates, 0 being the largest.
    LargeGamma(usize),
}

impl LevelKind {
    /// Line colour on the price charts.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::PutWall => "red",
            Self::CurrentPrice => "yellow",
            Self::CallWall => "green",
            Self::LargeGamma(0) => "blue",
            Self::LargeGamma(_) => "white",
        }
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentPrice => f.write_str("Current price"),
            Self::PutWall => f.write_str("Put wall"),
            Self::CallWall => f.write_str("Call wall"),
            Self::LargeGamma(rank) => write!(f, "Large Gamma {rank}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Level {
    pub kind: LevelKind,
    pub value: f64,
}

/// Labelled levels in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Levels(Vec<Level>);

impl Levels {
    pub fn push(&mut self, kind: LevelKind, value: f64) {
        self.0.push(Level { kind, value });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, kind: LevelKind) -> Option<f64> {
        self.0.iter().find(|l| l.kind == kind).map(|l| l.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Current price, walls and the strikes with the largest gamma near the price.
#[must_use]
pub fn options_levels(chain: &OptionChain, price: f64, params: &GreeksParams) -> Levels {
    let band = StrikeBand::around(price, LEVELS_PRICE_RANGE);
    let rows = strike_table(&chain.contracts, band);
    let walls = call_put_walls(&rows, price, Concentration::Volume);

    let mut levels = Levels::default();
    levels.push(LevelKind::CurrentPrice, price);
    if let Some(put_wall) = walls.put_wall {
        levels.push(LevelKind::PutWall, put_wall);
    }
    if let Some(call_wall) = walls.call_wall {
        levels.push(LevelKind::CallWall, call_wall);
    }

    let mut candidates: Vec<StrikeGamma> = Vec::new();
    for expiration in chain.expirations() {
        for side in [OptionType::Call, OptionType::Put] {
            let contracts = chain.contracts.iter().filter(|c| {
                c.expiration == expiration && c.option_type == side && band.contains(c.strike)
            });
            if let Some(top) = strike_gammas(contracts, params).into_iter().next() {
                candidates.push(top);
            }
        }
    }
    candidates.sort_by(|a, b| b.gamma.total_cmp(&a.gamma));

    for (rank, candidate) in candidates.iter().take(LARGE_GAMMA_COUNT).enumerate() {
        levels.push(LevelKind::LargeGamma(rank), candidate.strike);
    }

    levels
}

/// The call with the highest gamma near the price, across all expirations.
#[must_use]
pub fn largest_gamma(chain: &OptionChain, price: f64, params: &GreeksParams) -> Option<StrikeGamma> {
    let band = StrikeBand::around(price, LEVELS_PRICE_RANGE);
    strike_gammas(
        chain.calls().filter(|c| band.contains(c.strike)),
        params,
    )
    .into_iter()
    .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{call, date, put};

    fn params() -> GreeksParams {
        GreeksParams {
            spot: 100.0,
            risk_free_rate: 0.045,
            dividend_yield: 0.0,
            today: date("2026-10-18"),
        }
    }

    fn chain() -> OptionChain {
        OptionChain::new(
            "SPY",
            vec![
                call("2026-10-23", 98.0, 10, 0),
                put("2026-10-23", 98.0, 300, 0),
                call("2026-10-23", 100.0, 50, 0),
                put("2026-10-23", 100.0, 50, 0),
                call("2026-10-23", 103.0, 400, 0),
                put("2026-10-23", 103.0, 20, 0),
                call("2026-11-20", 101.0, 5, 0),
                put("2026-11-20", 99.0, 5, 0),
                call("2026-11-20", 130.0, 5_000, 0),
            ],
        )
    }

    #[test]
    fn levels_are_ordered_and_labelled() {
        let levels = options_levels(&chain(), 100.0, &params());
        let labels: Vec<String> = levels.iter().map(|l| l.kind.to_string()).collect();
        assert_eq!(&labels[..3], ["Current price", "Put wall", "Call wall"]);
        assert_eq!(levels.get(LevelKind::PutWall), Some(98.0));
        assert_eq!(levels.get(LevelKind::CallWall), Some(103.0));
        // two expirations, two sides each
        assert_eq!(levels.len(), 3 + 4);
        assert_eq!(labels[3], "Large Gamma 0");
    }

    #[test]
    fn large_gamma_ignores_far_strikes() {
        let levels = options_levels(&chain(), 100.0, &params());
        assert!(
            levels
                .iter()
                .filter(|l| matches!(l.kind, LevelKind::LargeGamma(_)))
                .all(|l| (95.0..=105.0).contains(&l.value))
        );
    }

    #[test]
    fn largest_gamma_is_near_the_money_call() {
        let top = largest_gamma(&chain(), 100.0, &params()).unwrap();
        assert_eq!(top.option_type, OptionType::Call);
        assert!((top.strike - 100.0).abs() < f64::EPSILON);
        assert_eq!(top.expiration, date("2026-10-23"));
    }

    #[test]
    fn empty_chain_has_only_price() {
        let levels = options_levels(&OptionChain::default(), 100.0, &params());
        assert_eq!(levels.len(), 1);
        assert!(largest_gamma(&OptionChain::default(), 100.0, &params()).is_none());
    }

    #[test]
    fn colours() {
        assert_eq!(LevelKind::PutWall.color(), "red");
        assert_eq!(LevelKind::CurrentPrice.color(), "yellow");
        assert_eq!(LevelKind::CallWall.color(), "green");
        assert_eq!(LevelKind::LargeGamma(0).color(), "blue");
        assert_eq!(LevelKind::LargeGamma(3).color(), "white");
    }
}
