//! Per-strike aggregation and call/put walls.

use std::collections::BTreeMap;

use opreport_market::{OptionContract, OptionType};
use serde::Serialize;

use crate::concentration::Concentration;

/// Inclusive strike window around the underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrikeBand {
    pub min: f64,
    pub max: f64,
}

impl StrikeBand {
    /// `[price * (1 - range), price * (1 + range)]`.
    #[must_use]
    pub fn around(price: f64, range: f64) -> Self {
        Self {
            min: price * (1.0 - range),
            max: price * (1.0 + range),
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, strike: f64) -> bool {
        strike >= self.min && strike <= self.max
    }
}

/// Call and put figures aggregated at one strike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StrikeRow {
    pub strike: f64,
    pub call_volume: u64,
    pub put_volume: u64,
    pub call_open_interest: u64,
    pub put_open_interest: u64,
}

impl StrikeRow {
    #[must_use]
    pub const fn calls(&self, concentration: Concentration) -> u64 {
        match concentration {
            Concentration::Volume => self.call_volume,
            Concentration::OpenInterest => self.call_open_interest,
        }
    }

    #[must_use]
    pub const fn puts(&self, concentration: Concentration) -> u64 {
        match concentration {
            Concentration::Volume => self.put_volume,
            Concentration::OpenInterest => self.put_open_interest,
        }
    }
}

// Strikes are quoted to at most a tenth of a cent.
#[allow(clippy::cast_possible_truncation)]
fn strike_key(strike: f64) -> i64 {
    (strike * 1_000.0).round() as i64
}

/// Aggregate contracts inside `band` per strike, across expirations.
///
/// Only strikes listed on both sides are kept, ascending by strike.
#[must_use]
pub fn strike_table<'a>(
    contracts: impl IntoIterator<Item = &'a OptionContract>,
    band: StrikeBand,
) -> Vec<StrikeRow> {
    let mut rows: BTreeMap<i64, (StrikeRow, bool, bool)> = BTreeMap::new();

    for contract in contracts.into_iter().filter(|c| band.contains(c.strike)) {
        let (row, has_call, has_put) = rows.entry(strike_key(contract.strike)).or_insert((
            StrikeRow {
                strike: contract.strike,
                ..StrikeRow::default()
            },
            false,
            false,
        ));
        match contract.option_type {
            OptionType::Call => {
                row.call_volume += contract.volume;
                row.call_open_interest += contract.open_interest;
                *has_call = true;
            }
            OptionType::Put => {
                row.put_volume += contract.volume;
                row.put_open_interest += contract.open_interest;
                *has_put = true;
            }
        }
    }

    rows.into_values()
        .filter(|(_, has_call, has_put)| *has_call && *has_put)
        .map(|(row, _, _)| row)
        .collect()
}

/// Strikes holding the most put interest below and call interest above the price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Walls {
    pub put_wall: Option<f64>,
    pub call_wall: Option<f64>,
}

/// Put wall from strikes at or below `price`, call wall from strikes at or above.
///
/// Ties resolve to the lowest strike. A side with no strikes yields `None`.
#[must_use]
pub fn call_put_walls(rows: &[StrikeRow], price: f64, concentration: Concentration) -> Walls {
    fn heaviest<'a>(
        rows: impl Iterator<Item = &'a StrikeRow>,
        weight: impl Fn(&StrikeRow) -> u64,
    ) -> Option<f64> {
        let mut best: Option<(f64, u64)> = None;
        for row in rows {
            let w = weight(row);
            if best.is_none_or(|(_, top)| w > top) {
                best = Some((row.strike, w));
            }
        }
        best.map(|(strike, _)| strike)
    }

    Walls {
        put_wall: heaviest(rows.iter().filter(|r| r.strike <= price), |r| {
            r.puts(concentration)
        }),
        call_wall: heaviest(rows.iter().filter(|r| r.strike >= price), |r| {
            r.calls(concentration)
        }),
    }
}
