//! The per-voice DSP devices: oscillator bank, envelope generators,
//! contour, LFO and vibrato ramp, mixer/limiter and reverb.
//!
//! Each device is a small state machine owning only its own state; the
//! voice (see [crate::voice]) composes them and routes signals between
//! them.  Devices in the sample path ([osc::OscBank], the mixer
//! functions, [reverb::Reverb]) do constant work per sample with no
//! branching on triggers; everything else runs on the millisecond tick.

pub mod contour;
pub mod env;
pub mod lfo;
pub mod mixer;
pub mod osc;
pub mod reverb;

pub use contour::ContourGen;
pub use env::{EnvGen, EnvParams, EnvSegment, TransientGen};
pub use lfo::{Lfo, VibratoRamp};
pub use osc::OscBank;
pub use reverb::Reverb;
