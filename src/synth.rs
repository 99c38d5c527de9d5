//! The top-level engine: MIDI dispatch and the two-rate scheduler.
//!
//! [Synth] owns the framer, the active patch and configuration, the
//! voice, and both halves of the control/sample split.  Bytes go in
//! through [Synth::midi_in]; audio comes out through [Synth::next_sample]
//! or, period-at-a-time, [Synth::process_ms].  The caller provides the
//! clock: one [Synth::tick_1ms] per millisecond and 32 samples in
//! between, which is exactly what [Synth::process_ms] does for you.

use wmidi::MidiMessage;

use crate::config::{Config, MidiMode, BROADCAST_CHANNEL};
use crate::fixedmath::Level;
use crate::midi::{self, Framer, SYSEX_VENDOR_ID};
use crate::patch::{Patch, PRESETS};
use crate::voice::{SampleGen, SharedScalars, Voice};
use crate::SAMPLES_PER_MS;

/// Consumer of rendered samples.
pub trait AudioSink {
    /// Receive one rendered sample.
    fn put(&mut self, sample: Level);
}

// 14-bit controller value to a unit-range level.  Widened before the
// shift: the full-scale value does not fit an i32 once scaled.
fn level14(msb: u8, lsb: u8) -> Level {
    let v = (((msb & 0x7F) as i64) << 7) | ((lsb & 0x7F) as i64);
    Level::from_bits(((v << 20) / 16383) as i32)
}

/// The complete engine.
pub struct Synth {
    patch: Patch,
    config: Config,
    framer: Framer,
    voice: Voice,
    shared: SharedScalars,
    gen: SampleGen,
    // controller MSB/LSB pairing state
    mod_msb: u8,
    mod_lsb: u8,
    expr_msb: u8,
    expr_lsb: u8,
    data_msb: u8,
    rpn: u8,
}

impl Default for Synth {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Synth {
    /// A fresh engine on the given configuration, sounding the first
    /// catalog preset.
    pub fn new(config: Config) -> Self {
        Self {
            patch: Patch::default(),
            config,
            framer: Framer::default(),
            voice: Voice::default(),
            shared: SharedScalars::default(),
            gen: SampleGen::default(),
            mod_msb: 0,
            mod_lsb: 0,
            expr_msb: 0,
            expr_lsb: 0,
            data_msb: 0,
            // null parameter until a controller selects one
            rpn: 0x7F,
        }
    }

    /// The active patch.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Feed one byte of the incoming MIDI stream.
    pub fn midi_in(&mut self, byte: u8) {
        if let Some(frame) = self.framer.push(byte) {
            if let Some(msg) = midi::decode(&frame) {
                self.dispatch(msg);
            }
        }
    }

    /// One millisecond of control work.
    pub fn tick_1ms(&mut self) {
        self.voice
            .control_tick_1ms(&self.patch, &self.config, &mut self.shared);
    }

    /// Render one output sample.
    pub fn next_sample(&mut self) -> Level {
        self.gen.render(&self.shared)
    }

    /// One scheduler period: a millisecond of control work followed by
    /// the [SAMPLES_PER_MS] samples it governs.
    pub fn process_ms(&mut self, sink: &mut impl AudioSink) {
        self.tick_1ms();
        for _ in 0..SAMPLES_PER_MS {
            sink.put(self.gen.render(&self.shared));
        }
    }

    fn accepts(&self, ch: wmidi::Channel) -> bool {
        match self.config.midi_mode {
            MidiMode::Omni => true,
            MidiMode::BaseChannel => {
                let n = ch.index() + 1;
                n == self.config.midi_channel || n == BROADCAST_CHANNEL
            }
        }
    }

    fn dispatch(&mut self, msg: MidiMessage) {
        match msg {
            MidiMessage::NoteOn(ch, note, velocity) if self.accepts(ch) => {
                let vel = u8::from(velocity);
                if vel == 0 {
                    // note-on at zero velocity is a release
                    self.voice.note_off(u8::from(note));
                } else {
                    self.voice
                        .note_on(u8::from(note), vel, &self.patch, &self.config, &mut self.gen);
                }
            }
            MidiMessage::NoteOff(ch, note, _) if self.accepts(ch) => {
                self.voice.note_off(u8::from(note));
            }
            MidiMessage::PitchBendChange(ch, bend) if self.accepts(ch) => {
                let raw = u16::from(bend) as i32 - 8192;
                self.voice
                    .set_pitch_bend(Level::from_bits(((raw as i64) << 20 >> 13) as i32));
            }
            MidiMessage::ControlChange(ch, function, value) if self.accepts(ch) => {
                self.control_change(u8::from(function.0), u8::from(value));
            }
            MidiMessage::ProgramChange(ch, program) if self.accepts(ch) => {
                let idx = u8::from(program) as usize;
                if let Some(preset) = PRESETS.get(idx) {
                    self.patch = *preset;
                    self.voice.retune(&self.patch, &self.config);
                    log::debug!("program change: {}", self.patch.name_str());
                } else {
                    log::debug!("program change {idx} past the catalog, ignored");
                }
            }
            MidiMessage::SysEx(data) => {
                // recognized vendor, no remote operations defined yet
                if data.first().map(|b| u8::from(*b)) == Some(SYSEX_VENDOR_ID) {
                    log::debug!("sysex ({} bytes) accepted and ignored", data.len());
                }
            }
            _ => {}
        }
    }

    fn control_change(&mut self, cc: u8, value: u8) {
        match cc {
            1 => {
                self.mod_msb = value;
                self.voice.set_mod_wheel(level14(value, self.mod_lsb));
            }
            33 => {
                self.mod_lsb = value;
                self.voice.set_mod_wheel(level14(self.mod_msb, value));
            }
            // breath, channel volume and expression all drive the
            // expression level
            2 | 7 | 11 => {
                self.expr_msb = value;
                self.voice.set_expression(level14(value, self.expr_lsb));
            }
            34 | 43 => {
                self.expr_lsb = value;
                self.voice.set_expression(level14(self.expr_msb, value));
            }
            38 => {
                self.data_msb = value;
                self.apply_rpn_data(value, 0);
            }
            39 => {
                let msb = self.data_msb;
                self.apply_rpn_data(msb, value);
            }
            100 => self.rpn = value,
            120 => self.voice.sound_off(&mut self.gen),
            123 => {
                if let Some(note) = self.voice.sounding_note() {
                    self.voice.note_off(note);
                }
            }
            _ => {
                midi::apply_cc(&mut self.patch, &mut self.config, cc, value);
            }
        }
    }

    // Data entry for the registered parameter selected by CC 100.
    // Unknown parameters and out-of-range values are ignored.
    fn apply_rpn_data(&mut self, msb: u8, lsb: u8) {
        match self.rpn {
            // parameter 0: pitch-bend sensitivity, semitones
            0 => {
                if (1..=12).contains(&msb) {
                    self.config.pitch_bend_range = msb;
                } else {
                    log::debug!("bend range {msb} out of range, ignored");
                }
            }
            // parameter 1: master fine tuning, 14-bit centered at 8192
            1 => {
                let v = (((msb & 0x7F) as i32) << 7) | ((lsb & 0x7F) as i32);
                self.config.fine_tuning_cents = (((v - 8192) * 100) / 8192) as i16;
                self.voice.retune(&self.patch, &self.config);
            }
            0x7F => {} // null
            p => log::debug!("unknown registered parameter {p}, data ignored"),
        }
    }
}
