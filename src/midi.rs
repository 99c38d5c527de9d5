//! MIDI byte-stream framing and the patch-edit controller map.
//!
//! The [Framer] turns a raw serial byte stream into complete message
//! frames: it tracks running status, collects system-exclusive payloads,
//! passes real-time bytes through silently, and discards anything
//! malformed or oversized.  Complete frames decode through
//! [wmidi::MidiMessage]; dispatch happens in [crate::synth].
//!
//! Patch-edit control changes go through a data-driven table rather than
//! a match arm per controller, so the assignment map is one place to read
//! and one place to change.  Out-of-range values leave the parameter
//! untouched.

use arrayvec::ArrayVec;
use wmidi::MidiMessage;

use crate::config::Config;
use crate::patch::{AmSource, Patch};

/// Longest frame the parser will buffer, including both sysex markers.
pub const MSG_MAX_LENGTH: usize = 16;

/// System-exclusive manufacturer id this engine answers to.
pub const SYSEX_VENDOR_ID: u8 = 0x73;

/// One complete MIDI message, status byte first.
pub type Frame = ArrayVec<u8, MSG_MAX_LENGTH>;

// Channel-message frame length by status byte.
fn expected_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 2,
        _ => 3,
    }
}

/// Byte-at-a-time frame assembler with running-status tracking.
#[derive(Clone, Debug, Default)]
pub struct Framer {
    buf: Frame,
    running_status: u8,
    discarding: bool,
}

impl Framer {
    /// Feed one byte; returns a complete frame when this byte finishes
    /// one.  Real-time bytes (0xF8 and above) may arrive in the middle
    /// of any message and are swallowed without disturbing it.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if byte >= 0xF8 {
            return None;
        }
        if byte & 0x80 != 0 {
            self.discarding = false;
            match byte {
                0xF0 => {
                    self.buf.clear();
                    self.running_status = 0;
                    let _ = self.buf.try_push(byte);
                    None
                }
                0xF7 => {
                    let in_sysex = self.buf.first() == Some(&0xF0);
                    if in_sysex && self.buf.try_push(byte).is_ok() {
                        let frame = self.buf.clone();
                        self.buf.clear();
                        Some(frame)
                    } else {
                        // stray or oversized terminator
                        self.buf.clear();
                        None
                    }
                }
                0xF1..=0xF6 => {
                    // system common cancels running status
                    self.buf.clear();
                    self.running_status = 0;
                    None
                }
                _ => {
                    self.buf.clear();
                    self.running_status = byte;
                    let _ = self.buf.try_push(byte);
                    None
                }
            }
        } else {
            if self.discarding {
                return None;
            }
            if self.buf.is_empty() {
                if self.running_status == 0 {
                    return None; // stray data byte
                }
                let _ = self.buf.try_push(self.running_status);
            }
            if self.buf.try_push(byte).is_err() {
                // oversized message: drop it whole, resync on next status
                log::debug!("MIDI frame over {MSG_MAX_LENGTH} bytes discarded");
                self.buf.clear();
                self.discarding = true;
                return None;
            }
            let status = self.buf[0];
            if status != 0xF0 && self.buf.len() == expected_len(status) {
                let frame = self.buf.clone();
                self.buf.clear();
                return Some(frame);
            }
            None
        }
    }
}

/// Decode a complete frame, `None` (with a debug log) if undecodable.
pub fn decode(frame: &[u8]) -> Option<MidiMessage<'_>> {
    match MidiMessage::try_from(frame) {
        Ok(msg) => Some(msg),
        Err(e) => {
            log::debug!("undecodable MIDI frame: {e:?}");
            None
        }
    }
}

/// One patch-edit controller assignment.
pub struct CcEntry {
    /// Controller number.
    pub cc: u8,
    apply: fn(&mut Patch, &mut Config, u8) -> bool,
}

fn set_mixer_step(p: &mut Patch, osc: usize, v: u8) -> bool {
    if v <= 16 {
        p.mixer_step[osc] = v;
        true
    } else {
        false
    }
}

fn set_am_source(p: &mut Patch, osc: usize, v: u8) -> bool {
    match AmSource::from_u8(v) {
        Some(src) => {
            p.osc_am_source[osc] = src;
            true
        }
        None => false,
    }
}

// Envelope times arrive as 7-bit values in 40 ms units.
fn time_40ms(v: u8) -> u16 {
    ((v as u16) * 40).max(1)
}

/// The patch-edit controller map: CC 70-75 mixer steps, 76-81 AM
/// sources, 82-86 the envelope A/H/D/S/R, 87-89 LFO rate, vibrato depth
/// and mixer gain, 112 the reverb mix.
pub static CC_TABLE: &[CcEntry] = &[
    CcEntry { cc: 70, apply: |p, _, v| set_mixer_step(p, 0, v) },
    CcEntry { cc: 71, apply: |p, _, v| set_mixer_step(p, 1, v) },
    CcEntry { cc: 72, apply: |p, _, v| set_mixer_step(p, 2, v) },
    CcEntry { cc: 73, apply: |p, _, v| set_mixer_step(p, 3, v) },
    CcEntry { cc: 74, apply: |p, _, v| set_mixer_step(p, 4, v) },
    CcEntry { cc: 75, apply: |p, _, v| set_mixer_step(p, 5, v) },
    CcEntry { cc: 76, apply: |p, _, v| set_am_source(p, 0, v) },
    CcEntry { cc: 77, apply: |p, _, v| set_am_source(p, 1, v) },
    CcEntry { cc: 78, apply: |p, _, v| set_am_source(p, 2, v) },
    CcEntry { cc: 79, apply: |p, _, v| set_am_source(p, 3, v) },
    CcEntry { cc: 80, apply: |p, _, v| set_am_source(p, 4, v) },
    CcEntry { cc: 81, apply: |p, _, v| set_am_source(p, 5, v) },
    CcEntry {
        cc: 82,
        apply: |p, _, v| {
            p.env_attack_ms = time_40ms(v);
            true
        },
    },
    CcEntry {
        cc: 83,
        apply: |p, _, v| {
            // zero is meaningful here: it skips peak-hold and decay
            p.env_hold_ms = (v as u16) * 40;
            true
        },
    },
    CcEntry {
        cc: 84,
        apply: |p, _, v| {
            p.env_decay_ms = time_40ms(v);
            true
        },
    },
    CcEntry {
        cc: 85,
        apply: |p, _, v| {
            if v <= 100 {
                p.env_sustain_pc = v as u16;
                true
            } else {
                false
            }
        },
    },
    CcEntry {
        cc: 86,
        apply: |p, _, v| {
            p.env_release_ms = time_40ms(v);
            true
        },
    },
    CcEntry {
        cc: 87,
        apply: |p, _, v| {
            if v >= 5 {
                p.lfo_freq_x10 = v as u16;
                true
            } else {
                false
            }
        },
    },
    CcEntry {
        cc: 88,
        apply: |p, _, v| {
            // 5-cent units, capped at the half-octave detune limit
            let cents = (v as u16) * 5;
            if cents <= 600 {
                p.lfo_fm_depth_cents = cents;
                true
            } else {
                false
            }
        },
    },
    CcEntry {
        cc: 89,
        apply: |p, _, v| {
            if v <= 100 {
                p.mixer_gain_x10 = v as u16;
                true
            } else {
                false
            }
        },
    },
    CcEntry {
        cc: 112,
        apply: |_, c, v| {
            if v <= 100 {
                c.reverb_mix_pc = v;
                true
            } else {
                false
            }
        },
    },
];

/// Apply a patch-edit controller.  Returns false when the controller is
/// not in the map or the value is out of range (the parameter is left
/// untouched either way).
pub fn apply_cc(patch: &mut Patch, config: &mut Config, cc: u8, value: u8) -> bool {
    for entry in CC_TABLE {
        if entry.cc == cc {
            let accepted = (entry.apply)(patch, config, value);
            if !accepted {
                log::debug!("CC {cc} value {value} out of range, ignored");
            }
            return accepted;
        }
    }
    false
}
