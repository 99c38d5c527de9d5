//! The amplitude (primary) and transient (secondary) envelope generators.
//!
//! Both are timed state machines evaluated once per millisecond.  The
//! decay and release segments use a decaying-step approach: each tick
//! moves one fifth-of-the-remaining-time's worth toward the target, which
//! gives a roughly exponential contour without any per-sample math.  The
//! step is clamped to a minimum of one fraction bit and the segment
//! force-terminates after twice its nominal time, so the machine always
//! reaches its target regardless of numerical stall.

use crate::fixedmath::{mul, Level};

/// Minimum nonzero per-tick level step (one Q12.20 fraction bit).
const MIN_STEP: Level = Level::from_bits(1);

/// Envelope peak level.
const PEAK: Level = Level::ONE;

/// A named phase of the envelope state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvSegment {
    /// Off, output zero.
    #[default]
    Idle,
    /// Linear ramp up to peak.
    Attack,
    /// Constant output at peak.
    PeakHold,
    /// Decaying-step ramp down to the sustain level.
    Decay,
    /// Constant output at the sustain level.
    Sustain,
    /// Decaying-step ramp down to zero.
    Release,
}

/// Timing and level parameters for one envelope evaluation.
///
/// Rebuilt from the active patch on every tick, so controller edits take
/// effect within a millisecond.
#[derive(Clone, Copy, Debug)]
pub struct EnvParams {
    /// Attack time, ms (clamped to >= 1 internally).
    pub attack_ms: u16,
    /// Peak-hold time, ms.  Zero skips peak-hold and decay.
    pub hold_ms: u16,
    /// Decay time, ms.
    pub decay_ms: u16,
    /// Sustain level, 0..=1.
    pub sustain: Level,
    /// Release time, ms.
    pub release_ms: u16,
}

/// The primary amplitude envelope:
/// `Idle -> Attack -> [PeakHold -> Decay] -> Sustain -> Release -> Idle`.
///
/// Attack and release triggers are posted by the dispatcher and consumed
/// here on the next tick (single-writer, single-consumer).  A release is
/// honored from any segment.
#[derive(Clone, Debug, Default)]
pub struct EnvGen {
    segment: EnvSegment,
    timer_ms: u32,
    level: Level,
    attack_step: Level,
    attack_pending: bool,
    release_pending: bool,
}

impl EnvGen {
    /// Post an attack trigger (note-on).  Takes effect on the next tick.
    pub fn trigger_attack(&mut self) {
        self.attack_pending = true;
    }

    /// Post a release trigger (note-off).  Takes effect on the next tick,
    /// from any segment.
    pub fn trigger_release(&mut self) {
        self.release_pending = true;
    }

    /// Immediately silence and reset the generator (all-sound-off).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current output level, 0..=1.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Current segment.
    pub fn segment(&self) -> EnvSegment {
        self.segment
    }

    /// True when the envelope has fully closed.
    pub fn is_idle(&self) -> bool {
        self.segment == EnvSegment::Idle
    }

    /// Advance the state machine by one millisecond.
    pub fn tick(&mut self, p: &EnvParams) {
        if self.attack_pending {
            self.attack_pending = false;
            // a note-off and note-on can land between two ticks; the
            // newer note-on supersedes the release
            self.release_pending = false;
            let attack = p.attack_ms.max(1) as i32;
            // ramp from the current level so a retrigger does not click;
            // round the step up so the ramp peaks within attack_ms ticks
            self.attack_step = Level::from_bits((PEAK.to_bits() + attack - 1) / attack);
            self.segment = EnvSegment::Attack;
            self.timer_ms = 0;
        } else if self.release_pending {
            self.release_pending = false;
            self.segment = EnvSegment::Release;
            self.timer_ms = 0;
        }
        self.timer_ms = self.timer_ms.saturating_add(1);
        match self.segment {
            EnvSegment::Idle => {}
            EnvSegment::Attack => {
                self.level = self.level.saturating_add(self.attack_step);
                if self.level >= PEAK {
                    self.level = PEAK;
                    if p.hold_ms == 0 {
                        // no hold: skip peak-hold and decay entirely
                        self.segment = EnvSegment::Sustain;
                    } else {
                        self.segment = EnvSegment::PeakHold;
                    }
                    self.timer_ms = 0;
                }
            }
            EnvSegment::PeakHold => {
                self.level = PEAK;
                if self.timer_ms >= p.hold_ms as u32 {
                    self.segment = EnvSegment::Decay;
                    self.timer_ms = 0;
                }
            }
            EnvSegment::Decay => {
                let done = self.approach(p.sustain, p.decay_ms);
                if done || self.timer_ms >= 2 * p.decay_ms.max(1) as u32 {
                    self.level = p.sustain;
                    self.segment = EnvSegment::Sustain;
                    self.timer_ms = 0;
                }
            }
            EnvSegment::Sustain => {
                // track the patch so controller edits are audible
                self.level = p.sustain;
            }
            EnvSegment::Release => {
                let done = self.approach(Level::ZERO, p.release_ms);
                if done || self.timer_ms >= 2 * p.release_ms.max(1) as u32 {
                    self.level = Level::ZERO;
                    self.segment = EnvSegment::Idle;
                    self.timer_ms = 0;
                }
            }
        }
    }

    // One decaying step toward `target`: distance over a fifth of the
    // segment time, never less than MIN_STEP.  Returns true on arrival.
    fn approach(&mut self, target: Level, time_ms: u16) -> bool {
        if self.level <= target {
            self.level = target;
            return true;
        }
        let tc = (time_ms / 5).max(1) as i32;
        let dist = self.level - target;
        let mut step = Level::from_bits(dist.to_bits() / tc);
        if step < MIN_STEP {
            step = MIN_STEP;
        }
        self.level -= step;
        if self.level <= target {
            self.level = target;
            true
        } else {
            false
        }
    }
}

/// Transient envelope attack time, ms (fixed).
const TRANSIENT_ATTACK_MS: u16 = 10;
/// Transient envelope peak-hold time, ms (fixed).
const TRANSIENT_HOLD_MS: u16 = 20;

/// The transient (secondary) envelope: same machine as [EnvGen] but with
/// fixed attack and peak-hold times, and one configured time shared by
/// decay and release.  Used as an amplitude-modulation source, not the
/// primary loudness control.
#[derive(Clone, Debug, Default)]
pub struct TransientGen {
    env: EnvGen,
}

impl TransientGen {
    /// Post an attack trigger (note-on).
    pub fn trigger_attack(&mut self) {
        self.env.trigger_attack();
    }

    /// Post a release trigger (note-off).
    pub fn trigger_release(&mut self) {
        self.env.trigger_release();
    }

    /// Immediately silence and reset.
    pub fn reset(&mut self) {
        self.env.reset();
    }

    /// Current output level, 0..=1.
    pub fn level(&self) -> Level {
        self.env.level()
    }

    /// Advance by one millisecond.
    pub fn tick(&mut self, decay_ms: u16, sustain: Level) {
        self.env.tick(&EnvParams {
            attack_ms: TRANSIENT_ATTACK_MS,
            hold_ms: TRANSIENT_HOLD_MS,
            decay_ms,
            sustain,
            release_ms: decay_ms,
        });
    }
}

/// Velocity-scaled envelope output, the `EnvVelocity` output-level source.
pub fn env_times_velocity(env: &EnvGen, velocity: Level) -> Level {
    mul(env.level(), velocity)
}
