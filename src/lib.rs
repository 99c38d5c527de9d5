//! A single-voice, six-oscillator additive synthesizer engine for
//! resource-constrained targets, driven by a serial (MIDI) control stream.
//!
//! All audio and control signals use deterministic fixed-point arithmetic
//! (see [fixedmath]) and the crate is `no_std` with no heap allocation, so
//! the engine can run on a bare-metal microcontroller with the sample
//! generator in a timer interrupt and the control tick in the main loop.
//!
//! The crate is organized the way the hardware runs it:
//!
//! * [fixedmath] - the numeric substrate: Q-format aliases, the widening
//!   multiply, and the compile-time generated lookup tables (sine, base-2
//!   exponential, note frequencies, mixer steps).
//! * [engine] - the per-voice DSP devices: oscillator bank, envelopes,
//!   contour, LFO and vibrato ramp, mixer/limiter, reverb.
//! * [voice] - one voice unit composing the devices, with the
//!   control-tick/sample-path state split made explicit in the types.
//! * [midi] - the byte-stream framer (running status, sysex) and the
//!   data-driven controller map.
//! * [synth] - the two-rate scheduler tying everything together: the
//!   sample-rate path, the 1 ms control task, and MIDI dispatch.
//!
//! Cross-context sharing is single-writer by construction: the control
//! tick writes the [voice::SharedScalars], the sample path reads them and
//! exclusively owns its phase accumulators and the reverb delay line.  No
//! locking is used; the sample path tolerates values up to one control
//! tick stale.

#![no_std]
#![warn(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod engine;
pub mod fixedmath;
pub mod midi;
pub mod patch;
pub mod synth;
pub mod voice;

pub use fixedmath::Freq;
pub use fixedmath::Level;
pub use fixedmath::LfoPhase;
pub use fixedmath::Phase;

/// Audio sample rate, in Hz.
pub const SAMPLE_RATE_HZ: u32 = 32_000;

/// Samples per 1 ms control tick (the two rates divide exactly).
pub const SAMPLES_PER_MS: u32 = SAMPLE_RATE_HZ / 1000;

/// Number of entries in the shared sine wavetable (one full cycle).
pub const WAVE_TABLE_SIZE: usize = 2048;

/// Highest permitted oscillator frequency, in Hz.  Oscillators tuned above
/// this are muted rather than allowed to alias (the ceiling leaves
/// sampling-theorem headroom below the 16 kHz Nyquist limit).
pub const MAX_OSC_FREQ_HZ: u32 = 12_000;

/// Number of oscillators in the bank.
pub const NUM_OSCILLATORS: usize = 6;
