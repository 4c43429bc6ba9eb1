//! Picks the contract whose price history feeds the momentum plots.

use opreport_market::{OptionChain, OptionContract, OptionType};

const PUT_TARGET_FACTOR: f64 = 0.90;
const CALL_TARGET_FACTOR: f64 = 1.10;
const CANDIDATE_COUNT: usize = 10;

/// Strike 10% out of the money on `side`.
#[must_use]
pub fn momentum_target(price: f64, side: OptionType) -> f64 {
    match side {
        OptionType::Put => price * PUT_TARGET_FACTOR,
        OptionType::Call => price * CALL_TARGET_FACTOR,
    }
}

/// The most traded of the ten `side` contracts closest to [`momentum_target`].
///
/// Volume ties go to the contract closer to the target.
#[must_use]
pub fn select_momentum_contract(
    chain: &OptionChain,
    price: f64,
    side: OptionType,
) -> Option<&OptionContract> {
    let target = momentum_target(price, side);

    let mut candidates: Vec<&OptionContract> = chain
        .contracts
        .iter()
        .filter(|c| c.option_type == side)
        .collect();
    candidates.sort_by(|a, b| (a.strike - target).abs().total_cmp(&(b.strike - target).abs()));

    candidates
        .into_iter()
        .take(CANDIDATE_COUNT)
        .fold(None, |best: Option<&OptionContract>, c| match best {
            Some(b) if b.volume >= c.volume => Some(b),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{call, put};

    #[test]
    fn targets() {
        assert!((momentum_target(100.0, OptionType::Put) - 90.0).abs() < 1e-9);
        assert!((momentum_target(100.0, OptionType::Call) - 110.0).abs() < 1e-9);
    }

    #[test]
    fn picks_most_traded_near_target() {
        let mut contracts: Vec<_> = (0..12)
            .map(|i| call("2026-10-23", 105.0 + f64::from(i), 10, 0))
            .collect();
        // 116 is the 11th closest to 110 and must be ignored despite its volume
        contracts[11].volume = 10_000;
        contracts[3].volume = 500;
        contracts.push(put("2026-10-23", 110.0, 99_999, 0));

        let chain = OptionChain::new("SPY", contracts);
        let picked = select_momentum_contract(&chain, 100.0, OptionType::Call).unwrap();
        assert!((picked.strike - 108.0).abs() < f64::EPSILON);
        assert!(picked.is_call());
    }

    #[test]
    fn volume_ties_prefer_closest() {
        let chain = OptionChain::new(
            "SPY",
            vec![put("2026-10-23", 85.0, 5, 0), put("2026-10-23", 91.0, 5, 0)],
        );
        let picked = select_momentum_contract(&chain, 100.0, OptionType::Put).unwrap();
        assert!((picked.strike - 91.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_contracts_on_side() {
        let chain = OptionChain::new("SPY", vec![put("2026-10-23", 90.0, 5, 0)]);
        assert!(select_momentum_contract(&chain, 100.0, OptionType::Call).is_none());
    }
}
