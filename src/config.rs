//! Process-wide configuration, independent of the active patch.
//!
//! Set once at start-up and mutated by controller messages.  The record is
//! exposed (optionally via serde) for external persistence; the engine
//! neither knows nor cares where it is stored.

/// Reserved channel number that every voice accepts regardless of its
/// configured channel (the allocator broadcasts shared control changes
/// on it).
pub const BROADCAST_CHANNEL: u8 = 16;

/// MIDI receive mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MidiMode {
    /// Respond on all channels.
    #[default]
    Omni,
    /// Respond on the configured base channel (and the broadcast
    /// channel) only.
    BaseChannel,
}

/// Process-wide override of the patch output-level control source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AmpldOverride {
    /// No override - the active patch selects the source.
    #[default]
    ByPatch,
    /// Force constant maximum level.
    ConstMax,
    /// Force envelope x velocity.
    EnvVelocity,
    /// Force smoothed expression.
    Expression,
}

/// Vibrato control mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VibratoMode {
    /// Vibrato off; pitch bend (if enabled) drives frequency modulation.
    #[default]
    Disabled,
    /// Vibrato depth follows the modulation wheel (CC 1).
    ModWheel,
    /// Automatic vibrato: delay then ramp to the patch FM depth on every
    /// note.
    Automatic,
}

/// Pitch-bend control mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PitchBendMode {
    /// Bend messages are ignored.
    Disabled,
    /// Bend messages modulate oscillator frequency.
    #[default]
    Enabled,
}

/// Process-wide configuration record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Base MIDI channel, 1..=16.
    pub midi_channel: u8,
    /// Receive mode (omni or base-channel).
    pub midi_mode: MidiMode,
    /// Pitch-bend range in semitones, 1..=12 (set via RPN 0).
    pub pitch_bend_range: u8,
    /// Pitch-bend enable.
    pub pitch_bend_mode: PitchBendMode,
    /// Vibrato control mode.  When not [VibratoMode::Disabled], vibrato
    /// takes priority over pitch bend in the frequency-modulation router.
    pub vibrato_mode: VibratoMode,
    /// Output-level control override.
    pub ampld_override: AmpldOverride,
    /// Reverb wet/dry mix, percent 0..=100.
    pub reverb_mix_pc: u8,
    /// Master fine tuning, cents -100..=100 (set via RPN 1).
    pub fine_tuning_cents: i16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            midi_channel: 1,
            midi_mode: MidiMode::Omni,
            pitch_bend_range: 2,
            pitch_bend_mode: PitchBendMode::Enabled,
            vibrato_mode: VibratoMode::Disabled,
            ampld_override: AmpldOverride::ByPatch,
            reverb_mix_pc: 15,
            fine_tuning_cents: 0,
        }
    }
}
