//! The six-oscillator wavetable bank.
//!
//! Each oscillator is a phase accumulator over the shared sine table.
//! All tuning math (note frequency x multiple ratio x detune x master
//! fine tuning) happens at control rate, producing a per-oscillator base
//! phase step; the sample path only adds the (modulated) step and wraps.
//! An oscillator tuned above the frequency ceiling is muted - reported to
//! the caller so the mixer can zero its level - rather than allowed to
//! alias.

use crate::fixedmath::{
    cents_to_ratio, note_frequency, phase_step_for, sine_at, Freq, Level, Phase, FREQ_MULT,
};
use crate::{MAX_OSC_FREQ_HZ, NUM_OSCILLATORS, WAVE_TABLE_SIZE};

const TABLE_LEN: Phase = Phase::from_bits((WAVE_TABLE_SIZE as u32) << 16);

/// Tuning for one oscillator: either a valid phase step or muted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscTuning {
    /// Above the frequency ceiling; contributes nothing to the mix.
    #[default]
    Muted,
    /// In range, with the per-sample base phase step.
    Step(Phase),
}

/// Derive one oscillator's base tuning from the patch and sounding note.
///
/// `mult_sel` indexes [FREQ_MULT]; detune and fine tuning are in cents.
/// Returns [OscTuning::Muted] when the resulting frequency exceeds
/// [MAX_OSC_FREQ_HZ].
pub fn derive_tuning(note: u8, mult_sel: u8, detune_cents: i16, fine_cents: i16) -> OscTuning {
    let base = note_frequency(note);
    let mult = FREQ_MULT[(mult_sel as usize) % FREQ_MULT.len()];
    // widen: note freq x ratio can exceed the Freq format before the
    // ceiling check rejects it
    let mut hz = (base.to_bits() as u64 * mult.to_bits() as u64) >> 18;
    let detune = cents_to_ratio(detune_cents.saturating_add(fine_cents));
    hz = (hz * detune.to_bits() as u64) >> 20;
    if hz > (MAX_OSC_FREQ_HZ as u64) << 18 {
        OscTuning::Muted
    } else {
        OscTuning::Step(phase_step_for(Freq::from_bits(hz as u32)))
    }
}

/// The bank's phase accumulators.  This struct is owned by the sample
/// path exclusively; the control task never touches it.
#[derive(Clone, Debug, Default)]
pub struct OscBank {
    phase: [Phase; NUM_OSCILLATORS],
}

impl OscBank {
    /// Reset all phase accumulators (non-legato note-on).
    pub fn sync(&mut self) {
        self.phase = [Phase::ZERO; NUM_OSCILLATORS];
    }

    /// Produce one sample from each oscillator and advance the
    /// accumulators by `steps`.  Constant work per oscillator: one table
    /// read, one add, one conditional subtract.
    #[inline]
    pub fn next(&mut self, steps: &[Phase; NUM_OSCILLATORS]) -> [Level; NUM_OSCILLATORS] {
        let mut out = [Level::ZERO; NUM_OSCILLATORS];
        for i in 0..NUM_OSCILLATORS {
            out[i] = sine_at(self.phase[i]);
            let mut p = self.phase[i] + steps[i];
            if p >= TABLE_LEN {
                p -= TABLE_LEN;
            }
            self.phase[i] = p;
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn phase(&self, i: usize) -> Phase {
        self.phase[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wraps_exactly_at_table_length() {
        let mut bank = OscBank::default();
        // an awkward step that never divides the table evenly
        let step = Phase::from_num(511.3);
        let steps = [step; NUM_OSCILLATORS];
        let mut total = 0u64;
        for _ in 0..100_000 {
            bank.next(&steps);
            total += step.to_bits() as u64;
            let expect = (total % ((WAVE_TABLE_SIZE as u64) << 16)) as u32;
            assert_eq!(bank.phase(0).to_bits(), expect);
        }
    }

    #[test]
    fn tuning_in_range_produces_step() {
        // A4 at unity multiple: 440 Hz -> 28.16 table indices per sample
        match derive_tuning(69, 1, 0, 0) {
            OscTuning::Step(step) => {
                let got = step.to_num::<f32>();
                assert!((got - 28.16).abs() < 0.01);
            }
            OscTuning::Muted => panic!("A4 must not mute"),
        }
    }

    #[test]
    fn tuning_above_ceiling_mutes() {
        // C8 (4186 Hz) at x4 = 16744 Hz, past the 12 kHz ceiling
        assert_eq!(derive_tuning(108, 6, 0, 0), OscTuning::Muted);
        // ...but at unity it is fine
        assert!(matches!(derive_tuning(108, 1, 0, 0), OscTuning::Step(_)));
    }

    #[test]
    fn detune_moves_the_step() {
        let plain = match derive_tuning(60, 1, 0, 0) {
            OscTuning::Step(s) => s,
            _ => panic!(),
        };
        let sharp = match derive_tuning(60, 1, 600, 0) {
            OscTuning::Step(s) => s,
            _ => panic!(),
        };
        let ratio = sharp.to_num::<f32>() / plain.to_num::<f32>();
        assert!((ratio - core::f32::consts::SQRT_2).abs() < 0.001);
    }

    #[test]
    fn fine_tuning_combines_with_detune() {
        let a = derive_tuning(60, 1, 50, 50);
        let b = derive_tuning(60, 1, 100, 0);
        assert_eq!(a, b);
    }
}
