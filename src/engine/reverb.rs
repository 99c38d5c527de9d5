//! Single-tap delay-line reverb.
//!
//! A fixed-length circular buffer holds the reverberant loop.  Each
//! sample, the delayed tap is averaged with the previous tap (a one-pole
//! low-pass that darkens successive echoes), fed back into the line with
//! the attenuated dry signal, and mixed with the dry path by the
//! configured wet percentage.  The feedback coefficient is a compile-time
//! constant derived from the loop and decay times; with the wet mix at
//! zero the output is the dry input, bit for bit.

use crate::fixedmath::{exp_f32, mul, Level};
use crate::SAMPLE_RATE_HZ;

/// Upper bound on the delay line length, samples.
pub const DELAY_MAX_SIZE: usize = 2000;

/// Reverberant loop time, seconds x 1000 (40 ms).
const LOOP_TIME_MS: usize = 40;

/// Loop length in samples at the engine rate.
const LOOP_SAMPLES: usize = (SAMPLE_RATE_HZ as usize) * LOOP_TIME_MS / 1000;

// Decay to -60 dB over 1.5 s: g = 0.001^(loop_time / decay_time)
const DECAY_TIME_MS: usize = 1500;
const FEEDBACK: Level = {
    let t = -6.907_755 * (LOOP_TIME_MS as f32) / (DECAY_TIME_MS as f32);
    Level::from_bits((exp_f32(t) * (1u32 << 20) as f32) as i32)
};

/// Dry-signal attenuation into the delay line, percent.
const ATTENUATION_PC: u32 = 70;
const ATTENUATION: Level = Level::from_bits(((ATTENUATION_PC << 20) / 100) as i32);

const _: () = assert!(LOOP_SAMPLES <= DELAY_MAX_SIZE);

/// The delay line and its indices.  Owned exclusively by the sample path.
#[derive(Clone)]
pub struct Reverb {
    line: [Level; LOOP_SAMPLES],
    index: usize,
    prev_tap: Level,
}

impl Default for Reverb {
    fn default() -> Self {
        Self {
            line: [Level::ZERO; LOOP_SAMPLES],
            index: 0,
            prev_tap: Level::ZERO,
        }
    }
}

impl Reverb {
    /// Flush the delay line (preset change, all-sound-off).
    pub fn clear(&mut self) {
        self.line = [Level::ZERO; LOOP_SAMPLES];
        self.prev_tap = Level::ZERO;
    }

    /// Process one sample.  `wet_mix` is the wet fraction, 0..=1; at
    /// exactly zero the dry input passes through untouched.
    #[inline]
    pub fn next(&mut self, dry: Level, wet_mix: Level) -> Level {
        let tap = self.line[self.index];
        // one-pole low-pass: average with the previous tap
        let filtered = Level::from_bits((tap.to_bits() + self.prev_tap.to_bits()) >> 1);
        self.prev_tap = tap;
        self.line[self.index] = mul(dry, ATTENUATION) + mul(filtered, FEEDBACK);
        self.index += 1;
        if self.index == LOOP_SAMPLES {
            self.index = 0;
        }
        dry + mul(wet_mix, filtered - dry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_coefficient_sane() {
        let g = FEEDBACK.to_num::<f32>();
        // 0.001^(40/1500) ~= 0.8318
        assert!((g - 0.8318).abs() < 0.001);
        assert_eq!(ATTENUATION, Level::from_num(0.7));
    }

    #[test]
    fn zero_wet_mix_is_bit_exact_dry() {
        let mut rv = Reverb::default();
        // salt the delay line so pass-through cannot be an empty-line fluke
        for i in 0..LOOP_SAMPLES {
            rv.line[i] = Level::from_bits((i as i32).wrapping_mul(7919));
        }
        for i in 0..(3 * LOOP_SAMPLES) {
            let dry = Level::from_bits(((i as i32) % 2_000_000) - 1_000_000);
            assert_eq!(rv.next(dry, Level::ZERO), dry);
        }
    }

    #[test]
    fn impulse_echoes_at_loop_period_and_decays() {
        let mut rv = Reverb::default();
        let wet = Level::ONE;
        let first = rv.next(Level::from_num(0.5), wet);
        // nothing in the line yet: full-wet output of silence minus... the
        // tap is zero, so output = dry + (0 - dry) = 0
        assert_eq!(first, Level::ZERO);
        // the tap filter smears each echo across two samples, so the
        // first window extends past the loop period to cover both
        let mut echo1 = Level::ZERO;
        for _ in 0..(LOOP_SAMPLES + 2) {
            echo1 = echo1.max(rv.next(Level::ZERO, wet).abs());
        }
        // echo of the attenuated impulse came back within one loop
        assert!(echo1 > Level::from_num(0.1));
        let mut later = Level::ZERO;
        for _ in 0..(4 * LOOP_SAMPLES) {
            later = later.max(rv.next(Level::ZERO, wet).abs());
        }
        assert!(later < echo1, "echoes must decay");
    }

    #[test]
    fn output_bounded_under_sustained_input() {
        let mut rv = Reverb::default();
        let wet = Level::from_num(0.5);
        for _ in 0..(10 * LOOP_SAMPLES) {
            let y = rv.next(Level::from_num(0.9), wet);
            assert!(y.abs() < Level::from_num(4));
        }
    }
}
