//! The voice: note state, the five generators, and the control-rate
//! derivation of everything the sample path consumes.
//!
//! The split is type-level.  [Voice] and [SharedScalars] belong to the
//! control task: the voice consumes note and controller events, ticks its
//! generators once per millisecond, and every fifth tick rewrites the
//! shared scalars (phase steps, modulation factors, mix levels, limiter
//! thresholds).  [SampleGen] belongs to the sample path: it owns the
//! oscillator bank and the reverb delay line, and its [SampleGen::render]
//! only ever reads the scalars.  Nothing is shared mutably across the
//! boundary.

use crate::config::{AmpldOverride, Config, PitchBendMode, VibratoMode};
use crate::engine::contour::ContourParams;
use crate::engine::env::{env_times_velocity, EnvParams};
use crate::engine::mixer::{self, MAX_CLIPPING_LEVEL};
use crate::engine::osc::{derive_tuning, OscTuning};
use crate::engine::{ContourGen, EnvGen, Lfo, OscBank, Reverb, TransientGen, VibratoRamp};
use crate::fixedmath::{exp2, mul, Level, Phase, MIXER_LEVEL};
use crate::patch::{AmSource, AmpldControl, Patch};
use crate::NUM_OSCILLATORS;

/// Modulation tick period in control ticks.
const MOD_TICK_DIV: u32 = 5;

/// Output level used by [AmpldControl::ConstLow] while a note is gated.
const CONST_LOW_LEVEL: Level = Level::lit("0.25");

/// Everything the sample path reads, refreshed by the control task.
/// Plain scalars only - written whole, read whole, no handshake needed.
#[derive(Clone, Debug)]
pub struct SharedScalars {
    /// Per-oscillator phase step with frequency modulation applied.
    pub osc_step: [Phase; NUM_OSCILLATORS],
    /// Per-oscillator amplitude-modulation factor, 0..=1.
    pub osc_am: [Level; NUM_OSCILLATORS],
    /// Per-oscillator mixer input level (zero for muted oscillators).
    pub mix_level: [Level; NUM_OSCILLATORS],
    /// Mixer output gain, 0..=10.
    pub out_gain: Level,
    /// Output level from the amplitude controller, 0..=1.
    pub out_level: Level,
    /// Limiter thresholds, symmetric about zero.
    pub limit_pos: Level,
    /// Negative limiter threshold.
    pub limit_neg: Level,
    /// Reverb wet fraction, 0..=1.
    pub reverb_mix: Level,
}

impl Default for SharedScalars {
    fn default() -> Self {
        Self {
            osc_step: [Phase::ZERO; NUM_OSCILLATORS],
            osc_am: [Level::ONE; NUM_OSCILLATORS],
            mix_level: [Level::ZERO; NUM_OSCILLATORS],
            out_gain: Level::ONE,
            out_level: Level::ZERO,
            limit_pos: MAX_CLIPPING_LEVEL,
            limit_neg: -MAX_CLIPPING_LEVEL,
            reverb_mix: Level::ZERO,
        }
    }
}

/// Sample-path state: the oscillator bank and the reverb line.
#[derive(Clone, Default)]
pub struct SampleGen {
    /// The six phase accumulators.
    pub osc: OscBank,
    /// The reverb delay line.
    pub reverb: Reverb,
}

impl SampleGen {
    /// Produce one output sample from the current scalars.  Constant
    /// work: no branches on note state, no parameter math.
    #[inline]
    pub fn render(&mut self, shared: &SharedScalars) -> Level {
        let samples = self.osc.next(&shared.osc_step);
        let mixed = mixer::mix(&samples, &shared.osc_am, &shared.mix_level);
        let driven = mul(mixed, shared.out_gain);
        let limited = mixer::limit(driven, shared.limit_pos, shared.limit_neg);
        let leveled = mul(limited, shared.out_level);
        self.reverb.next(leveled, shared.reverb_mix)
    }
}

/// Note state plus the five control-rate generators.
#[derive(Clone, Debug, Default)]
pub struct Voice {
    gate: bool,
    note: u8,
    velocity: Level,
    bend: Level,
    mod_wheel: Level,
    expression: Level,
    expr_smooth: Level,
    env: EnvGen,
    transient: TransientGen,
    contour: ContourGen,
    lfo: Lfo,
    vibrato: VibratoRamp,
    base: [OscTuning; NUM_OSCILLATORS],
    tick: u32,
}

fn pc_level(pc: u16) -> Level {
    Level::from_bits(((pc as i32) << 20) / 100)
}

impl Voice {
    /// Note-on.  A note arriving while the gate is open is a legato
    /// change: the oscillators retune without an envelope retrigger and
    /// the vibrato ramp restarts.  Otherwise everything triggers fresh
    /// and the oscillator and LFO phases sync to zero.
    pub fn note_on(
        &mut self,
        note: u8,
        velocity: u8,
        patch: &Patch,
        config: &Config,
        gen: &mut SampleGen,
    ) {
        self.note = note & 0x7F;
        self.velocity = Level::from_bits((((velocity & 0x7F) as i32) << 20) / 127);
        self.retune(patch, config);
        if self.gate {
            self.vibrato.note_change();
        } else {
            self.gate = true;
            gen.osc.sync();
            self.lfo.sync();
            self.env.trigger_attack();
            self.transient.trigger_attack();
            self.contour.trigger();
            self.vibrato.note_on();
        }
    }

    /// Note-off for `note`.  Ignored unless it matches the sounding note
    /// (a stale note-off after a legato change releases nothing).
    pub fn note_off(&mut self, note: u8) {
        if self.gate && note & 0x7F == self.note {
            self.gate = false;
            self.env.trigger_release();
            self.transient.trigger_release();
            self.contour.reset();
            self.vibrato.note_off();
        }
    }

    /// Immediately silence the voice and flush the reverb tail.
    pub fn sound_off(&mut self, gen: &mut SampleGen) {
        self.gate = false;
        self.env.reset();
        self.transient.reset();
        self.contour = ContourGen::default();
        self.vibrato = VibratoRamp::default();
        gen.reverb.clear();
    }

    /// Re-derive the per-oscillator base tunings.  Called at note-on and
    /// whenever a frequency-affecting parameter changes under a held note
    /// (program change, detune edit, master fine tuning).
    pub fn retune(&mut self, patch: &Patch, config: &Config) {
        for i in 0..NUM_OSCILLATORS {
            self.base[i] = derive_tuning(
                self.note,
                patch.osc_freq_mult[i],
                patch.osc_detune_cents[i],
                config.fine_tuning_cents,
            );
        }
    }

    /// Pitch-bend position, bipolar -1..=1.
    pub fn set_pitch_bend(&mut self, bend: Level) {
        self.bend = bend;
    }

    /// Modulation wheel level, 0..=1.
    pub fn set_mod_wheel(&mut self, level: Level) {
        self.mod_wheel = level;
    }

    /// Expression level, 0..=1.  Smoothed before use so coarse 7-bit
    /// controller steps do not zipper.
    pub fn set_expression(&mut self, level: Level) {
        self.expression = level;
    }

    /// True once the envelope has fully closed and no note is gated.
    pub fn is_quiet(&self) -> bool {
        !self.gate && self.env.is_idle()
    }

    /// The sounding note, if gated.
    pub fn sounding_note(&self) -> Option<u8> {
        self.gate.then_some(self.note)
    }

    /// One millisecond of control work.  Generators advance every call;
    /// every fifth call runs the modulation group that rewrites the
    /// shared scalars.
    pub fn control_tick_1ms(&mut self, patch: &Patch, config: &Config, shared: &mut SharedScalars) {
        self.env.tick(&EnvParams {
            attack_ms: patch.env_attack_ms,
            hold_ms: patch.env_hold_ms,
            decay_ms: patch.env_decay_ms,
            sustain: pc_level(patch.env_sustain_pc),
            release_ms: patch.env_release_ms,
        });
        self.transient
            .tick(patch.env2_decay_ms, pc_level(patch.env2_sustain_pc));
        self.contour.tick(&ContourParams {
            start: pc_level(patch.contour_start_pc),
            delay_ms: patch.contour_delay_ms,
            ramp_ms: patch.contour_ramp_ms,
            hold: pc_level(patch.contour_hold_pc),
        });
        let delta = self.expression - self.expr_smooth;
        self.expr_smooth += Level::from_bits(delta.to_bits() >> 4);

        shared.out_level = self.output_level(patch, config);

        self.tick = self.tick.wrapping_add(1);
        if self.tick % MOD_TICK_DIV == 0 {
            self.mod_tick_5ms(patch, config, shared);
        }
    }

    // The output-level controller, evaluated every millisecond so the
    // envelope path has full resolution.
    fn output_level(&self, patch: &Patch, config: &Config) -> Level {
        let source = match config.ampld_override {
            AmpldOverride::ByPatch => patch.ampld_control,
            AmpldOverride::ConstMax => AmpldControl::ConstMax,
            AmpldOverride::EnvVelocity => AmpldControl::EnvVelocity,
            AmpldOverride::Expression => AmpldControl::Expression,
        };
        match source {
            AmpldControl::ConstMax => Level::ONE,
            AmpldControl::ConstLow => {
                if self.gate {
                    CONST_LOW_LEVEL
                } else {
                    Level::ZERO
                }
            }
            AmpldControl::EnvVelocity => env_times_velocity(&self.env, self.velocity),
            AmpldControl::Expression => self.expr_smooth,
        }
    }

    // The 5 ms modulation group: advance the LFO and vibrato ramp, then
    // rewrite every shared scalar from current patch and generator state.
    fn mod_tick_5ms(&mut self, patch: &Patch, config: &Config, shared: &mut SharedScalars) {
        self.lfo.advance(patch.lfo_freq_x10);
        self.vibrato.tick(patch.lfo_ramp_ms);

        let fm_ratio = self.fm_ratio(patch, config);
        for i in 0..NUM_OSCILLATORS {
            match self.base[i] {
                OscTuning::Muted => {
                    shared.osc_step[i] = Phase::ZERO;
                    shared.mix_level[i] = Level::ZERO;
                    shared.osc_am[i] = Level::ZERO;
                }
                OscTuning::Step(step) => {
                    // ratio <= 2 and the base step is under the frequency
                    // ceiling, so the scaled step stays below the table
                    // length and the widening cannot overflow
                    shared.osc_step[i] = Phase::from_bits(
                        ((step.to_bits() as u64 * fm_ratio.to_bits() as u64) >> 20) as u32,
                    );
                    shared.mix_level[i] =
                        MIXER_LEVEL[(patch.mixer_step[i] as usize).min(MIXER_LEVEL.len() - 1)];
                    shared.osc_am[i] = self.am_factor(patch.osc_am_source[i], patch);
                }
            }
        }

        shared.out_gain = Level::from_bits(((patch.mixer_gain_x10 as i32) << 20) / 10);
        let threshold = if patch.limiter_pc == 0 {
            MAX_CLIPPING_LEVEL
        } else {
            pc_level(patch.limiter_pc)
        };
        shared.limit_pos = threshold;
        shared.limit_neg = -threshold;
        shared.reverb_mix = pc_level(config.reverb_mix_pc as u16);
    }

    // Frequency-modulation ratio for this modulation tick.  Vibrato,
    // when enabled, takes priority over pitch bend.
    fn fm_ratio(&self, patch: &Patch, config: &Config) -> Level {
        match config.vibrato_mode {
            VibratoMode::Disabled => {
                if config.pitch_bend_mode == PitchBendMode::Enabled {
                    // bend * range/12 spans at most one octave either way
                    let arg = Level::from_bits(
                        (self.bend.to_bits() as i64 * config.pitch_bend_range as i64 / 12) as i32,
                    );
                    exp2(arg)
                } else {
                    Level::ONE
                }
            }
            VibratoMode::ModWheel | VibratoMode::Automatic => {
                let depth = if config.vibrato_mode == VibratoMode::ModWheel {
                    self.mod_wheel
                } else {
                    self.vibrato.depth()
                };
                let full = Level::from_bits(((patch.lfo_fm_depth_cents as i32) << 20) / 1200);
                exp2(mul(self.lfo.value(), mul(full, depth)))
            }
        }
    }

    // The amplitude-modulation router: one factor per source selector.
    fn am_factor(&self, source: AmSource, patch: &Patch) -> Level {
        match source {
            AmSource::None => Level::ONE,
            AmSource::Contour => self.contour.level(),
            AmSource::ContourInv => Level::ONE - self.contour.level(),
            AmSource::Transient => self.transient.level(),
            AmSource::ModWheel => self.mod_wheel,
            AmSource::Expression => self.expr_smooth,
            AmSource::ExpressionInv => Level::ONE - self.expr_smooth,
            AmSource::Lfo => {
                // tremolo: bias the bipolar LFO unipolar, then fade the
                // dip in by the patch depth so zero depth is unity
                let unipolar = Level::from_bits((Level::ONE + self.lfo.value()).to_bits() >> 1);
                let depth = pc_level(patch.lfo_am_depth_pc);
                Level::ONE - mul(depth, Level::ONE - unipolar)
            }
            AmSource::Velocity => self.velocity,
            AmSource::VelocityInv => Level::ONE - self.velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PRESETS;

    fn run_ms(v: &mut Voice, p: &Patch, c: &Config, s: &mut SharedScalars, ms: u32) {
        for _ in 0..ms {
            v.control_tick_1ms(p, c, s);
        }
    }

    #[test]
    fn note_on_opens_output_and_note_off_closes_it() {
        let patch = PRESETS[0];
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        voice.note_on(60, 100, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 50);
        assert!(shared.out_level > Level::from_num(0.5));
        assert!(shared.osc_step.iter().any(|s| *s > Phase::ZERO));

        let mut peak = Level::ZERO;
        for _ in 0..640 {
            peak = peak.max(gen.render(&shared).abs());
        }
        assert!(peak > Level::from_num(0.05), "gated voice must sound");

        voice.note_off(60);
        run_ms(&mut voice, &patch, &config, &mut shared, 400);
        assert!(voice.is_quiet());
        assert_eq!(shared.out_level, Level::ZERO);
    }

    #[test]
    fn zeroed_mixer_is_exactly_silent() {
        let mut patch = PRESETS[0];
        patch.mixer_step = [0; NUM_OSCILLATORS];
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        voice.note_on(69, 127, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 100);
        for _ in 0..2000 {
            assert_eq!(gen.render(&shared), Level::ZERO);
        }
    }

    #[test]
    fn stale_note_off_does_not_release() {
        let patch = PRESETS[0];
        let config = Config::default();
        let mut voice = Voice::default();
        let mut gen = SampleGen::default();

        voice.note_on(60, 100, &patch, &config, &mut gen);
        voice.note_on(64, 100, &patch, &config, &mut gen); // legato change
        voice.note_off(60); // release of the abandoned note
        assert_eq!(voice.sounding_note(), Some(64));
        voice.note_off(64);
        assert_eq!(voice.sounding_note(), None);
    }

    #[test]
    fn vibrato_takes_priority_over_bend() {
        let patch = PRESETS[0];
        let mut config = Config::default();
        config.vibrato_mode = VibratoMode::Automatic;
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        voice.note_on(69, 100, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 10);
        let steps_before = shared.osc_step;
        voice.set_pitch_bend(Level::ONE);
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        // vibrato is still in its delay (depth 0), and bend is ignored
        assert_eq!(shared.osc_step, steps_before);
    }

    #[test]
    fn pitch_bend_scales_steps_by_range() {
        let patch = PRESETS[0];
        let mut config = Config::default();
        config.pitch_bend_range = 12;
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        voice.note_on(69, 100, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 10);
        let plain = shared.osc_step[1].to_num::<f32>();
        voice.set_pitch_bend(Level::ONE);
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        let bent = shared.osc_step[1].to_num::<f32>();
        assert!((bent / plain - 2.0).abs() < 0.001, "full bend at 12 semitones doubles");
    }

    #[test]
    fn muted_oscillator_is_zeroed_in_the_scalars() {
        let mut patch = PRESETS[0];
        patch.osc_freq_mult = [1, 11, 11, 11, 11, 11]; // x9 on a high note mutes
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        voice.note_on(108, 100, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 10);
        assert!(shared.osc_step[0] > Phase::ZERO);
        for i in 1..NUM_OSCILLATORS {
            assert_eq!(shared.osc_step[i], Phase::ZERO);
            assert_eq!(shared.mix_level[i], Level::ZERO);
        }
    }

    #[test]
    fn const_low_level_is_gated() {
        let mut patch = PRESETS[0];
        patch.ampld_control = AmpldControl::ConstLow;
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();
        let mut gen = SampleGen::default();

        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        assert_eq!(shared.out_level, Level::ZERO);
        voice.note_on(60, 100, &patch, &config, &mut gen);
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        assert_eq!(shared.out_level, CONST_LOW_LEVEL);
        voice.note_off(60);
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        assert_eq!(shared.out_level, Level::ZERO);
    }

    #[test]
    fn limiter_thresholds_follow_the_patch() {
        let mut patch = PRESETS[0];
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();

        patch.limiter_pc = 80;
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        assert_eq!(shared.limit_pos, pc_level(80));
        assert_eq!(shared.limit_neg, -pc_level(80));

        patch.limiter_pc = 0;
        run_ms(&mut voice, &patch, &config, &mut shared, 5);
        assert_eq!(shared.limit_pos, MAX_CLIPPING_LEVEL);
    }

    #[test]
    fn expression_smoothing_converges() {
        let mut patch = PRESETS[0];
        patch.ampld_control = AmpldControl::Expression;
        let config = Config::default();
        let mut voice = Voice::default();
        let mut shared = SharedScalars::default();

        voice.set_expression(Level::ONE);
        voice.control_tick_1ms(&patch, &config, &mut shared);
        let first = shared.out_level;
        assert!(first > Level::ZERO && first < Level::from_num(0.1));
        run_ms(&mut voice, &patch, &config, &mut shared, 200);
        assert!(shared.out_level > Level::from_num(0.99));
    }
}
