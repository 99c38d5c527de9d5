//! The contour generator: an auxiliary, independently-timed ramp used as
//! an amplitude-modulation source, distinct from the loudness envelopes.

use crate::fixedmath::Level;

/// Contour state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ContourSegment {
    /// Off - output maintains the start (or last hold) level.
    #[default]
    Idle,
    /// Waiting out the configured delay after note-on.
    Delay,
    /// Linear ramp from the start level to the hold level.
    Ramp,
    /// Holding at the hold level indefinitely.
    Hold,
}

/// Four-state contour: `Idle -> Delay -> Ramp -> Hold`, entered at
/// note-on and reset to idle at note-off.
#[derive(Clone, Debug, Default)]
pub struct ContourGen {
    segment: ContourSegment,
    timer_ms: u32,
    level: Level,
    step: Level,
    trigger_pending: bool,
    reset_pending: bool,
}

/// Timing and level parameters for one contour evaluation.
#[derive(Clone, Copy, Debug)]
pub struct ContourParams {
    /// Level at the start of the ramp, 0..=1.
    pub start: Level,
    /// Delay after note-on before the ramp begins, ms.
    pub delay_ms: u16,
    /// Ramp duration, ms (clamped to >= 1 internally).
    pub ramp_ms: u16,
    /// Level held after the ramp completes, 0..=1.
    pub hold: Level,
}

impl ContourGen {
    /// Post a note-on trigger; enters Delay on the next tick.
    pub fn trigger(&mut self) {
        self.trigger_pending = true;
    }

    /// Post a note-off reset; returns to Idle on the next tick.
    pub fn reset(&mut self) {
        self.reset_pending = true;
    }

    /// Current output level, 0..=1.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Advance the state machine by one millisecond.
    pub fn tick(&mut self, p: &ContourParams) {
        if self.reset_pending {
            self.reset_pending = false;
            self.segment = ContourSegment::Idle;
        }
        if self.trigger_pending {
            self.trigger_pending = false;
            self.segment = ContourSegment::Delay;
            self.level = p.start;
            self.timer_ms = 0;
        }
        self.timer_ms = self.timer_ms.saturating_add(1);
        match self.segment {
            ContourSegment::Idle => {}
            ContourSegment::Delay => {
                self.level = p.start;
                if self.timer_ms >= p.delay_ms as u32 {
                    let ramp = p.ramp_ms.max(1) as i32;
                    self.step = Level::from_bits((p.hold - p.start).to_bits() / ramp);
                    self.segment = ContourSegment::Ramp;
                    self.timer_ms = 0;
                }
            }
            ContourSegment::Ramp => {
                self.level += self.step;
                if self.timer_ms >= p.ramp_ms.max(1) as u32 {
                    self.level = p.hold;
                    self.segment = ContourSegment::Hold;
                }
            }
            ContourSegment::Hold => {
                self.level = p.hold;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: f32, delay: u16, ramp: u16, hold: f32) -> ContourParams {
        ContourParams {
            start: Level::from_num(start),
            delay_ms: delay,
            ramp_ms: ramp,
            hold: Level::from_num(hold),
        }
    }

    #[test]
    fn delay_then_ramp_then_hold() {
        let p = params(0.2, 10, 100, 0.9);
        let mut c = ContourGen::default();
        c.trigger();
        for _ in 0..10 {
            c.tick(&p);
            assert_eq!(c.level(), p.start);
        }
        // halfway through the ramp
        for _ in 0..50 {
            c.tick(&p);
        }
        let mid = c.level().to_num::<f32>();
        assert!((mid - 0.55).abs() < 0.01);
        for _ in 0..60 {
            c.tick(&p);
        }
        assert_eq!(c.level(), p.hold);
    }

    #[test]
    fn downward_ramp() {
        let p = params(1.0, 0, 50, 0.3);
        let mut c = ContourGen::default();
        c.trigger();
        for _ in 0..60 {
            c.tick(&p);
        }
        assert_eq!(c.level(), p.hold);
    }

    #[test]
    fn note_off_resets_to_idle() {
        let p = params(0.0, 0, 100, 1.0);
        let mut c = ContourGen::default();
        c.trigger();
        for _ in 0..50 {
            c.tick(&p);
        }
        let frozen = c.level();
        c.reset();
        for _ in 0..20 {
            c.tick(&p);
        }
        // idle maintains the level it had; no further ramping
        assert_eq!(c.level(), frozen);
    }

    #[test]
    fn retrigger_restarts_from_start_level() {
        let p = params(0.1, 5, 20, 0.8);
        let mut c = ContourGen::default();
        c.trigger();
        for _ in 0..40 {
            c.tick(&p);
        }
        assert_eq!(c.level(), p.hold);
        c.reset();
        c.trigger();
        c.tick(&p);
        assert_eq!(c.level(), p.start);
    }
}
