//! The low-frequency oscillator and the vibrato depth-ramp generator.
//!
//! The LFO reads the shared sine wavetable through its own 24:8 phase
//! accumulator and is advanced on the 5 ms modulation tick - its step is
//! small enough that the narrow fraction is plenty at that rate.  The
//! vibrato ramp shapes the *depth* of vibrato over time: a delay after
//! note-on, a linear ramp up to full depth, and a fixed 100 ms ramp down
//! at note-off or a legato pitch change.

use crate::fixedmath::{sine_at_lfo, Level, LfoPhase};
use crate::WAVE_TABLE_SIZE;

/// Modulation tick period, ms.
pub const MOD_TICK_MS: u32 = 5;

/// Fixed vibrato ramp-down window, ms.
const RAMP_DOWN_MS: u32 = 100;

/// Sine LFO on a 24:8 phase accumulator.
#[derive(Clone, Debug, Default)]
pub struct Lfo {
    phase: LfoPhase,
}

impl Lfo {
    /// Reset the phase to zero (done at non-legato note-on so every note
    /// starts its modulation cycle from the same place).
    pub fn sync(&mut self) {
        self.phase = LfoPhase::ZERO;
    }

    /// Current output, bipolar -1..=1.
    pub fn value(&self) -> Level {
        sine_at_lfo(self.phase)
    }

    /// Advance by one modulation tick.  `freq_x10` is the patch LFO
    /// frequency in tenths of Hz; the step is recomputed here every tick
    /// so controller edits take effect immediately.
    pub fn advance(&mut self, freq_x10: u16) {
        // step = freq * tick_period * table_len, in Q24.8 index units
        let step = (freq_x10 as u64 * MOD_TICK_MS as u64 * WAVE_TABLE_SIZE as u64 * 256)
            / 10_000;
        // the table span is a power of two, so the wrap is a mask
        const PHASE_MASK: u32 = (WAVE_TABLE_SIZE as u32 * 256) - 1;
        self.phase = LfoPhase::from_bits((self.phase.to_bits() + step as u32) & PHASE_MASK);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum RampState {
    #[default]
    Idle,
    Delay,
    RampUp,
    RampDown,
}

/// The vibrato depth ramp: `Idle -> Delay -> RampUp`, with `RampDown`
/// entered from note-off (back to Idle) or a legato note change (back to
/// Delay, so vibrato re-establishes on the new pitch).
#[derive(Clone, Debug, Default)]
pub struct VibratoRamp {
    state: RampState,
    timer_ms: u32,
    depth: Level,
    redelay: bool,
}

impl VibratoRamp {
    /// Note-on: restart the delay/ramp cycle from zero depth.
    pub fn note_on(&mut self) {
        self.state = RampState::Delay;
        self.timer_ms = 0;
        self.depth = Level::ZERO;
        self.redelay = false;
    }

    /// Note-off: ramp the depth down, then go idle.
    pub fn note_off(&mut self) {
        if self.state != RampState::Idle {
            self.state = RampState::RampDown;
            self.timer_ms = 0;
            self.redelay = false;
        }
    }

    /// Legato pitch change: ramp down, then re-enter the delay so the
    /// vibrato builds again on the new note.
    pub fn note_change(&mut self) {
        self.state = RampState::RampDown;
        self.timer_ms = 0;
        self.redelay = true;
    }

    /// Current depth factor, 0..=1.
    pub fn depth(&self) -> Level {
        self.depth
    }

    /// Advance by one modulation tick ([MOD_TICK_MS] milliseconds).
    /// `ramp_ms` is the patch vibrato ramp time, also used as the delay.
    pub fn tick(&mut self, ramp_ms: u16) {
        self.timer_ms += MOD_TICK_MS;
        match self.state {
            RampState::Idle => {
                self.depth = Level::ZERO;
            }
            RampState::Delay => {
                self.depth = Level::ZERO;
                if self.timer_ms >= ramp_ms as u32 {
                    self.state = RampState::RampUp;
                    self.timer_ms = 0;
                }
            }
            RampState::RampUp => {
                let ramp = ramp_ms.max(1) as i64;
                let step =
                    Level::from_bits(((Level::ONE.to_bits() as i64 * MOD_TICK_MS as i64) / ramp) as i32);
                self.depth = self.depth.saturating_add(step).min(Level::ONE);
            }
            RampState::RampDown => {
                let step = Level::from_bits(
                    (Level::ONE.to_bits() as i64 * MOD_TICK_MS as i64 / RAMP_DOWN_MS as i64) as i32,
                );
                self.depth = self.depth.saturating_sub(step).max(Level::ZERO);
                if self.depth == Level::ZERO && self.timer_ms >= RAMP_DOWN_MS {
                    self.timer_ms = 0;
                    self.state = if self.redelay {
                        RampState::Delay
                    } else {
                        RampState::Idle
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(r: &mut VibratoRamp, ms: u32, ramp_ms: u16) {
        for _ in 0..(ms / MOD_TICK_MS) {
            r.tick(ramp_ms);
        }
    }

    #[test]
    fn lfo_phase_wraps_and_oscillates() {
        let mut lfo = Lfo::default();
        // 6.5 Hz for one full second of 5 ms ticks
        let mut min = Level::ZERO;
        let mut max = Level::ZERO;
        for _ in 0..200 {
            lfo.advance(65);
            min = min.min(lfo.value());
            max = max.max(lfo.value());
        }
        assert!(max > Level::from_num(0.9));
        assert!(min < Level::from_num(-0.9));
    }

    #[test]
    fn lfo_sync_restarts_cycle() {
        let mut lfo = Lfo::default();
        lfo.advance(250);
        assert!(lfo.value() != Level::ZERO);
        lfo.sync();
        assert_eq!(lfo.value(), Level::ZERO);
    }

    #[test]
    fn ramp_delays_then_builds() {
        let mut r = VibratoRamp::default();
        r.note_on();
        run(&mut r, 500, 500);
        assert_eq!(r.depth(), Level::ZERO, "still in delay");
        run(&mut r, 500, 500);
        assert!(r.depth() >= Level::from_num(0.99), "ramped to full depth");
        run(&mut r, 100, 500);
        assert!(r.depth() >= Level::from_num(0.99), "holds at full depth");
    }

    #[test]
    fn note_off_ramps_down_to_idle() {
        let mut r = VibratoRamp::default();
        r.note_on();
        run(&mut r, 1200, 500);
        r.note_off();
        run(&mut r, 50, 500);
        let mid = r.depth();
        assert!(mid > Level::ZERO && mid < Level::ONE);
        run(&mut r, 100, 500);
        assert_eq!(r.depth(), Level::ZERO);
        // stays idle: no re-ramp
        run(&mut r, 1500, 500);
        assert_eq!(r.depth(), Level::ZERO);
    }

    #[test]
    fn legato_change_reenters_delay() {
        let mut r = VibratoRamp::default();
        r.note_on();
        run(&mut r, 1200, 400);
        assert!(r.depth() > Level::from_num(0.99));
        r.note_change();
        run(&mut r, 150, 400);
        assert_eq!(r.depth(), Level::ZERO);
        // vibrato re-establishes after the delay
        run(&mut r, 900, 400);
        assert!(r.depth() > Level::from_num(0.9));
    }
}
