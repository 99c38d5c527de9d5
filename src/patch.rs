//! The patch parameter record and the read-only preset catalog.
//!
//! A [Patch] is a plain record of integer-coded parameters, in the units a
//! controller message carries them (milliseconds, cents, percent,
//! selector indices).  The engine derives its fixed-point working values
//! from these on note-on, program change and the 5 ms modulation tick -
//! the patch itself never holds derived state.  Range checking happens at
//! the point of mutation (the controller dispatcher); the engine trusts
//! the record.

/// Per-oscillator amplitude-modulation source selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AmSource {
    /// No modulation - the oscillator contributes at a fixed 100 %.
    #[default]
    None = 0,
    /// Contour generator output.
    Contour = 1,
    /// Contour generator output, inverted.
    ContourInv = 2,
    /// Transient (secondary) envelope output.
    Transient = 3,
    /// Modulation wheel level (CC 1).
    ModWheel = 4,
    /// Expression level (CC 2/7/11).
    Expression = 5,
    /// Expression level, inverted.
    ExpressionInv = 6,
    /// LFO, biased unipolar and scaled by the patch AM depth.
    Lfo = 7,
    /// Key velocity.
    Velocity = 8,
    /// Key velocity, inverted.
    VelocityInv = 9,
}

impl AmSource {
    /// Decode a selector index, `None` if out of range.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Contour),
            2 => Some(Self::ContourInv),
            3 => Some(Self::Transient),
            4 => Some(Self::ModWheel),
            5 => Some(Self::Expression),
            6 => Some(Self::ExpressionInv),
            7 => Some(Self::Lfo),
            8 => Some(Self::Velocity),
            9 => Some(Self::VelocityInv),
            _ => None,
        }
    }
}

/// Output-level control source, selectable per patch (and overridable
/// process-wide, see [crate::config::AmpldOverride]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AmpldControl {
    /// Constant maximum output level.
    #[default]
    ConstMax = 0,
    /// Constant reduced output level while a note is gated.
    ConstLow = 1,
    /// Primary envelope scaled by key velocity.
    EnvVelocity = 2,
    /// Smoothed expression level.
    Expression = 3,
}

impl AmpldControl {
    /// Decode a selector index, `None` if out of range.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::ConstMax),
            1 => Some(Self::ConstLow),
            2 => Some(Self::EnvVelocity),
            3 => Some(Self::Expression),
            _ => None,
        }
    }
}

/// The complete set of per-voice timbre parameters.
///
/// Documented ranges are what the controller dispatcher enforces; preset
/// records in [PRESETS] stay inside them by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Patch {
    /// Preset name, NUL-padded UTF-8.
    pub name: [u8; 24],
    /// Frequency-multiple selector per oscillator, index into
    /// [crate::fixedmath::FREQ_MULT] (0..=11).
    pub osc_freq_mult: [u8; 6],
    /// Amplitude-modulation source per oscillator.
    pub osc_am_source: [AmSource; 6],
    /// Detune per oscillator, cents (-600..=600).
    pub osc_detune_cents: [i16; 6],
    /// Mixer input step per oscillator (0..=16, 3 dB apart).
    pub mixer_step: [u8; 6],
    /// Envelope attack time, ms (1..=5000).
    pub env_attack_ms: u16,
    /// Envelope peak-hold time, ms (0..=5000).  Zero skips peak-hold and
    /// decay entirely.
    pub env_hold_ms: u16,
    /// Envelope decay time, ms (1..=5000).
    pub env_decay_ms: u16,
    /// Envelope sustain level, percent of peak (0..=100).
    pub env_sustain_pc: u16,
    /// Envelope release time, ms (1..=5000).
    pub env_release_ms: u16,
    /// Output-level control source for this patch.
    pub ampld_control: AmpldControl,
    /// Contour start level, percent (0..=100).
    pub contour_start_pc: u16,
    /// Contour delay before ramp, ms (0..=5000).
    pub contour_delay_ms: u16,
    /// Contour ramp time, ms (1..=5000).
    pub contour_ramp_ms: u16,
    /// Contour hold level, percent (0..=100).
    pub contour_hold_pc: u16,
    /// Transient envelope decay and release time, ms (1..=5000).
    pub env2_decay_ms: u16,
    /// Transient envelope sustain level, percent (0..=100).
    pub env2_sustain_pc: u16,
    /// LFO frequency in tenths of Hz (5..=250).
    pub lfo_freq_x10: u16,
    /// Vibrato ramp (and delay) time, ms (1..=5000).
    pub lfo_ramp_ms: u16,
    /// Vibrato depth, cents (0..=600).
    pub lfo_fm_depth_cents: u16,
    /// Tremolo depth, percent of full scale (0..=100).
    pub lfo_am_depth_pc: u16,
    /// Mixer output gain in tenths (0..=100, i.e. x0.0 to x10.0).
    pub mixer_gain_x10: u16,
    /// Limiter threshold, percent of full scale; 0 disables limiting.
    pub limiter_pc: u16,
}

const fn name_bytes(s: &str) -> [u8; 24] {
    let mut out = [0u8; 24];
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && i < 24 {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

impl Patch {
    /// The preset name as a string slice.
    pub fn name_str(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(24);
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }
}

impl Default for Patch {
    /// The factory default patch (the first catalog entry).
    fn default() -> Self {
        PRESETS[0]
    }
}

use AmSource::{
    Contour, ContourInv, Expression, Lfo, Transient, Velocity, VelocityInv,
};

/// The read-only preset catalog.  Program change `i` copies entry `i`
/// into the active patch; indices at or past the catalog size are
/// silently ignored.
pub static PRESETS: [Patch; 8] = [
    Patch {
        name: name_bytes("Drawbar Organ"),
        osc_freq_mult: [0, 1, 2, 4, 5, 7],
        osc_am_source: [AmSource::None, AmSource::None, AmSource::None, AmSource::None, AmSource::None, AmSource::None],
        osc_detune_cents: [0, 0, 0, 0, 0, 0],
        mixer_step: [13, 16, 11, 13, 10, 8],
        env_attack_ms: 5,
        env_hold_ms: 0,
        env_decay_ms: 200,
        env_sustain_pc: 100,
        env_release_ms: 100,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 0,
        contour_delay_ms: 0,
        contour_ramp_ms: 500,
        contour_hold_pc: 100,
        env2_decay_ms: 300,
        env2_sustain_pc: 0,
        lfo_freq_x10: 65,
        lfo_ramp_ms: 500,
        lfo_fm_depth_cents: 10,
        lfo_am_depth_pc: 0,
        mixer_gain_x10: 10,
        limiter_pc: 0,
    },
    Patch {
        name: name_bytes("Glass Pad"),
        osc_freq_mult: [1, 2, 4, 6, 8, 10],
        osc_am_source: [AmSource::None, Contour, Contour, ContourInv, Lfo, Lfo],
        osc_detune_cents: [0, 3, -3, 5, -5, 8],
        mixer_step: [16, 12, 11, 9, 7, 5],
        env_attack_ms: 400,
        env_hold_ms: 0,
        env_decay_ms: 800,
        env_sustain_pc: 80,
        env_release_ms: 900,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 20,
        contour_delay_ms: 300,
        contour_ramp_ms: 1500,
        contour_hold_pc: 90,
        env2_decay_ms: 500,
        env2_sustain_pc: 0,
        lfo_freq_x10: 55,
        lfo_ramp_ms: 800,
        lfo_fm_depth_cents: 15,
        lfo_am_depth_pc: 30,
        mixer_gain_x10: 12,
        limiter_pc: 0,
    },
    Patch {
        name: name_bytes("Bell Tower"),
        osc_freq_mult: [1, 4, 6, 7, 9, 11],
        osc_am_source: [AmSource::None, Transient, Transient, Transient, Transient, Transient],
        osc_detune_cents: [0, 2, -4, 7, -9, 12],
        mixer_step: [16, 13, 12, 11, 9, 7],
        env_attack_ms: 2,
        env_hold_ms: 0,
        env_decay_ms: 2500,
        env_sustain_pc: 0,
        env_release_ms: 1800,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 0,
        contour_delay_ms: 0,
        contour_ramp_ms: 500,
        contour_hold_pc: 100,
        env2_decay_ms: 1200,
        env2_sustain_pc: 10,
        lfo_freq_x10: 50,
        lfo_ramp_ms: 500,
        lfo_fm_depth_cents: 0,
        lfo_am_depth_pc: 0,
        mixer_gain_x10: 9,
        limiter_pc: 0,
    },
    Patch {
        name: name_bytes("Reed Organ"),
        osc_freq_mult: [1, 3, 4, 5, 6, 8],
        osc_am_source: [AmSource::None, AmSource::None, Expression, Expression, Expression, Expression],
        osc_detune_cents: [0, 0, 4, -4, 6, -6],
        mixer_step: [16, 10, 12, 11, 9, 8],
        env_attack_ms: 60,
        env_hold_ms: 0,
        env_decay_ms: 300,
        env_sustain_pc: 100,
        env_release_ms: 150,
        ampld_control: AmpldControl::Expression,
        contour_start_pc: 0,
        contour_delay_ms: 0,
        contour_ramp_ms: 500,
        contour_hold_pc: 100,
        env2_decay_ms: 400,
        env2_sustain_pc: 0,
        lfo_freq_x10: 60,
        lfo_ramp_ms: 400,
        lfo_fm_depth_cents: 8,
        lfo_am_depth_pc: 0,
        mixer_gain_x10: 11,
        limiter_pc: 85,
    },
    Patch {
        name: name_bytes("Soft Flute"),
        osc_freq_mult: [1, 4, 6, 1, 4, 6],
        osc_am_source: [AmSource::None, Contour, ContourInv, Lfo, Lfo, AmSource::None],
        osc_detune_cents: [0, 0, 0, 6, 6, -6],
        mixer_step: [16, 10, 6, 8, 5, 9],
        env_attack_ms: 90,
        env_hold_ms: 0,
        env_decay_ms: 400,
        env_sustain_pc: 90,
        env_release_ms: 250,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 60,
        contour_delay_ms: 100,
        contour_ramp_ms: 700,
        contour_hold_pc: 100,
        env2_decay_ms: 300,
        env2_sustain_pc: 0,
        lfo_freq_x10: 58,
        lfo_ramp_ms: 600,
        lfo_fm_depth_cents: 20,
        lfo_am_depth_pc: 15,
        mixer_gain_x10: 13,
        limiter_pc: 0,
    },
    Patch {
        name: name_bytes("Synth Brass"),
        osc_freq_mult: [0, 1, 1, 2, 4, 5],
        osc_am_source: [AmSource::None, AmSource::None, Contour, Contour, Transient, Transient],
        osc_detune_cents: [0, -7, 7, 3, -3, 10],
        mixer_step: [12, 16, 15, 12, 10, 9],
        env_attack_ms: 30,
        env_hold_ms: 40,
        env_decay_ms: 350,
        env_sustain_pc: 70,
        env_release_ms: 300,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 100,
        contour_delay_ms: 0,
        contour_ramp_ms: 400,
        contour_hold_pc: 40,
        env2_decay_ms: 250,
        env2_sustain_pc: 20,
        lfo_freq_x10: 62,
        lfo_ramp_ms: 700,
        lfo_fm_depth_cents: 12,
        lfo_am_depth_pc: 0,
        mixer_gain_x10: 10,
        limiter_pc: 90,
    },
    Patch {
        name: name_bytes("Hollow Strings"),
        osc_freq_mult: [1, 1, 2, 4, 4, 6],
        osc_am_source: [AmSource::None, AmSource::None, AmSource::None, Lfo, Lfo, Contour],
        osc_detune_cents: [-5, 5, 0, -8, 8, 0],
        mixer_step: [15, 15, 13, 11, 11, 8],
        env_attack_ms: 250,
        env_hold_ms: 0,
        env_decay_ms: 600,
        env_sustain_pc: 85,
        env_release_ms: 600,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 30,
        contour_delay_ms: 200,
        contour_ramp_ms: 1200,
        contour_hold_pc: 80,
        env2_decay_ms: 500,
        env2_sustain_pc: 0,
        lfo_freq_x10: 55,
        lfo_ramp_ms: 900,
        lfo_fm_depth_cents: 18,
        lfo_am_depth_pc: 20,
        mixer_gain_x10: 11,
        limiter_pc: 0,
    },
    Patch {
        name: name_bytes("Plucked Wire"),
        osc_freq_mult: [1, 2, 5, 7, 9, 11],
        osc_am_source: [Transient, Transient, Transient, Transient, VelocityInv, Velocity],
        osc_detune_cents: [0, 0, 5, -5, 9, -9],
        mixer_step: [16, 12, 10, 9, 6, 8],
        env_attack_ms: 1,
        env_hold_ms: 0,
        env_decay_ms: 900,
        env_sustain_pc: 0,
        env_release_ms: 400,
        ampld_control: AmpldControl::EnvVelocity,
        contour_start_pc: 0,
        contour_delay_ms: 0,
        contour_ramp_ms: 500,
        contour_hold_pc: 100,
        env2_decay_ms: 180,
        env2_sustain_pc: 5,
        lfo_freq_x10: 50,
        lfo_ramp_ms: 500,
        lfo_fm_depth_cents: 0,
        lfo_am_depth_pc: 0,
        mixer_gain_x10: 12,
        limiter_pc: 0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_fields_in_range() {
        for p in PRESETS.iter() {
            for i in 0..6 {
                assert!(p.osc_freq_mult[i] < 12);
                assert!(p.mixer_step[i] <= 16);
                assert!(p.osc_detune_cents[i].abs() <= 600);
            }
            assert!(p.env_sustain_pc <= 100);
            assert!(p.env2_sustain_pc <= 100);
            assert!(p.contour_start_pc <= 100 && p.contour_hold_pc <= 100);
            assert!((5..=250).contains(&p.lfo_freq_x10));
            assert!(p.lfo_fm_depth_cents <= 600);
            assert!(p.lfo_am_depth_pc <= 100);
            assert!(p.mixer_gain_x10 <= 100);
            assert!(p.limiter_pc <= 100);
            assert!(!p.name_str().is_empty());
        }
    }

    #[test]
    fn default_is_first_preset() {
        assert_eq!(Patch::default(), PRESETS[0]);
    }
}
