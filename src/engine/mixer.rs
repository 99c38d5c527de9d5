//! Per-sample mixing, output gain and the hard limiter.
//!
//! Each oscillator sample is scaled by its amplitude-modulation factor
//! and its quantized mixer input level, then summed; the sum is scaled by
//! the output gain and clamped symmetrically at the limiter thresholds.
//! All multiplies widen internally, and the Q12.20 integer headroom
//! absorbs the worst-case six-oscillator sum without wrapping.

use crate::fixedmath::{mul, Level};
use crate::NUM_OSCILLATORS;

/// Limiter threshold when the patch disables limiting (limiter level 0):
/// just below full scale, so the engine never emits a wrapped sample.
pub const MAX_CLIPPING_LEVEL: Level = Level::lit("0.97");

/// Weighted six-input mix: each sample scaled by its modulation factor
/// and input level, then accumulated.
#[inline]
pub fn mix(
    samples: &[Level; NUM_OSCILLATORS],
    am: &[Level; NUM_OSCILLATORS],
    level: &[Level; NUM_OSCILLATORS],
) -> Level {
    let mut acc = Level::ZERO;
    for i in 0..NUM_OSCILLATORS {
        acc += mul(mul(samples[i], am[i]), level[i]);
    }
    acc
}

/// Hard symmetric clamp at the given positive/negative thresholds.
#[inline]
pub fn limit(x: Level, threshold_pos: Level, threshold_neg: Level) -> Level {
    if x > threshold_pos {
        threshold_pos
    } else if x < threshold_neg {
        threshold_neg
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_levels_mix_to_exact_zero() {
        let samples = [Level::from_num(0.73); NUM_OSCILLATORS];
        let am = [Level::ONE; NUM_OSCILLATORS];
        let level = [Level::ZERO; NUM_OSCILLATORS];
        assert_eq!(mix(&samples, &am, &level), Level::ZERO);
    }

    #[test]
    fn unity_mix_sums() {
        let samples = [Level::from_num(0.5); NUM_OSCILLATORS];
        let am = [Level::ONE; NUM_OSCILLATORS];
        let level = [Level::ONE; NUM_OSCILLATORS];
        assert_eq!(mix(&samples, &am, &level), Level::from_num(3));
    }

    #[test]
    fn am_factor_scales_each_input() {
        let mut samples = [Level::ZERO; NUM_OSCILLATORS];
        samples[0] = Level::ONE;
        let mut am = [Level::ZERO; NUM_OSCILLATORS];
        am[0] = Level::from_num(0.25);
        let level = [Level::ONE; NUM_OSCILLATORS];
        assert_eq!(mix(&samples, &am, &level), Level::from_num(0.25));
    }

    #[test]
    fn limiter_clamps_symmetrically() {
        let t = Level::from_num(0.8);
        assert_eq!(limit(Level::from_num(2), t, -t), t);
        assert_eq!(limit(Level::from_num(-2), t, -t), -t);
        assert_eq!(limit(Level::from_num(0.5), t, -t), Level::from_num(0.5));
    }
}
