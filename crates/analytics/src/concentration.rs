//! Volume and open-interest concentration by expiration.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use opreport_market::{OptionChain, OptionContract, OptionType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Amount the volume threshold is lowered by when no expiration passes it.
pub const RELAXATION_STEP: u64 = 1_000;

/// Days-to-expiration targets used to pick representative expirations.
pub const DTE_BUCKETS: [i64; 3] = [0, 7, 30];

/// Which per-contract figure to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Concentration {
    Volume,
    OpenInterest,
}

impl Concentration {
    #[inline]
    #[must_use]
    pub const fn of(self, contract: &OptionContract) -> u64 {
        match self {
            Self::Volume => contract.volume,
            Self::OpenInterest => contract.open_interest,
        }
    }

    /// Column name used in chart legends and CSV exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::OpenInterest => "openInterest",
        }
    }
}

/// Call and put totals of one expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirationTotals {
    pub expiration: NaiveDate,
    pub calls: u64,
    pub puts: u64,
}

impl ExpirationTotals {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.calls + self.puts
    }
}

/// Per-expiration call and put totals, ascending by expiration.
#[must_use]
pub fn expiration_concentration(
    chain: &OptionChain,
    concentration: Concentration,
) -> Vec<ExpirationTotals> {
    let mut totals: BTreeMap<NaiveDate, ExpirationTotals> = BTreeMap::new();

    for contract in &chain.contracts {
        let entry = totals
            .entry(contract.expiration)
            .or_insert(ExpirationTotals {
                expiration: contract.expiration,
                calls: 0,
                puts: 0,
            });
        match contract.option_type {
            OptionType::Call => entry.calls += concentration.of(contract),
            OptionType::Put => entry.puts += concentration.of(contract),
        }
    }

    totals.into_values().collect()
}

/// Total traded volume per expiration, keeping those strictly above `filter_less_than`.
///
/// When nothing passes, the threshold is lowered by [`RELAXATION_STEP`] and
/// the filter re-applied until something passes or the threshold reaches zero.
#[must_use]
pub fn volatile_concentration(chain: &OptionChain, filter_less_than: u64) -> BTreeMap<NaiveDate, u64> {
    let totals: Vec<(NaiveDate, u64)> = expiration_concentration(chain, Concentration::Volume)
        .into_iter()
        .map(|t| (t.expiration, t.total()))
        .collect();

    let mut threshold = filter_less_than;
    loop {
        let kept: BTreeMap<NaiveDate, u64> = totals
            .iter()
            .filter(|(_, volume)| *volume > threshold)
            .copied()
            .collect();

        if !kept.is_empty() || threshold == 0 {
            return kept;
        }

        threshold = threshold.saturating_sub(RELAXATION_STEP);
        debug!(threshold, "No active expirations, relaxing volume filter");
    }
}

/// Representative active expirations: the ones nearest each of [`DTE_BUCKETS`].
///
/// Returns at most one expiration per bucket, deduplicated and ascending.
/// Expirations already in the past are ignored unless nothing else is active.
#[must_use]
pub fn filter_active_volume_expirations(
    chain: &OptionChain,
    filter_less_than: u64,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let active: Vec<NaiveDate> = volatile_concentration(chain, filter_less_than)
        .into_keys()
        .collect();

    let upcoming: Vec<NaiveDate> = active.iter().copied().filter(|d| *d >= today).collect();
    let candidates = if upcoming.is_empty() { active } else { upcoming };

    let picked: BTreeSet<NaiveDate> = DTE_BUCKETS
        .iter()
        .filter_map(|target| {
            // min_by_key keeps the first (earliest) date on ties
            candidates
                .iter()
                .copied()
                .min_by_key(|d| ((*d - today).num_days() - target).abs())
        })
        .collect();

    picked.into_iter().collect()
}
