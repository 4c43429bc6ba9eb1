//! Relative strength index with Wilder smoothing.

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// RSI aligned with `closes`; the first `period` entries are `None`.
///
/// Seeds with the simple average of the first `period` changes, then
/// smooths as `avg = (avg * (period - 1) + x) / period`. A flat window yields 0.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    #[allow(clippy::cast_precision_loss)]
    let p = period as f64;

    let (mut gain, mut loss) = closes[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), d| {
            if d > 0.0 { (g + d, l) } else { (g, l - d) }
        });
    gain /= p;
    loss /= p;
    out[period] = Some(strength(gain, loss));

    for i in period + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (up, down) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        gain = (gain * (p - 1.0) + up) / p;
        loss = (loss * (p - 1.0) + down) / p;
        out[i] = Some(strength(gain, loss));
    }

    out
}

fn strength(gain: f64, loss: f64) -> f64 {
    let total = gain + loss;
    if total == 0.0 { 0.0 } else { 100.0 * gain / total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) {
        let a = a.unwrap();
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn warmup_is_none() {
        let out = rsi(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out.len(), 4);
        assert!(out[0].is_none() && out[1].is_none());
        assert!(out[2].is_some());
    }

    #[test]
    fn too_short_is_all_none() {
        assert!(rsi(&[1.0, 2.0], 2).iter().all(Option::is_none));
        assert!(rsi(&[], DEFAULT_RSI_PERIOD).is_empty());
        assert!(rsi(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn monotonic_series_saturate() {
        let up: Vec<f64> = (0..30).map(f64::from).collect();
        approx(rsi(&up, DEFAULT_RSI_PERIOD)[29], 100.0);

        let down: Vec<f64> = (0..30).rev().map(f64::from).collect();
        approx(rsi(&down, DEFAULT_RSI_PERIOD)[29], 0.0);
    }

    #[test]
    fn flat_series_is_zero() {
        approx(rsi(&[5.0; 20], DEFAULT_RSI_PERIOD)[19], 0.0);
    }

    #[test]
    fn wilder_smoothing() {
        // changes +1 -1 +1 -1: seed 0.5/0.5, then 0.75/0.25, then 0.375/0.625
        let out = rsi(&[1.0, 2.0, 1.0, 2.0, 1.0], 2);
        approx(out[2], 50.0);
        approx(out[3], 75.0);
        approx(out[4], 37.5);
    }
}
