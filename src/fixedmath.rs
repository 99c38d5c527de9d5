//! Fixed-point numeric substrate for the synthesizer.
//!
//! Three Q-formats are used, chosen by accumulation rate rather than by
//! taste: [Level] (Q12.20) is the default for normalized audio and control
//! signals; [Phase] (Q16.16) carries oscillator phase, whose step is added
//! every sample and would overflow the wider fraction across a table
//! cycle; [LfoPhase] (Q24.8) does the same job at the much slower LFO
//! rate.  All lookup tables are generated at compile time from `const fn`
//! series expansions - these prioritize speed of the runtime lookup over
//! scientific accuracy.

use crate::{MAX_OSC_FREQ_HZ, SAMPLE_RATE_HZ, WAVE_TABLE_SIZE};
use fixed::types::{I12F20, U14F18, U16F16, U24F8};

/// The default signal representation: signed, 12 integer bits, 20
/// fraction bits.  Full scale (0 dB) is 1.0; the integer headroom absorbs
/// intermediate mix sums without clipping.
pub type Level = I12F20;

/// Oscillator phase accumulator and phase step, in sine-table index units
/// (one cycle = [WAVE_TABLE_SIZE]).  16 fraction bits keep per-sample
/// accumulation rounding below audibility without overflowing the format.
pub type Phase = U16F16;

/// LFO phase accumulator, same index units as [Phase] but 24:8 - the LFO
/// step is tiny and the wider integer part is free at its rate.
pub type LfoPhase = U24F8;

/// A frequency in Hz: unsigned, 14 integer bits, 18 fraction bits.
/// 14 bits hold the highest note frequency in the catalog.
pub type Freq = U14F18;

/// Multiply two [Level] values, widening to 64 bits internally so the
/// intermediate product cannot overflow.
#[inline]
pub fn mul(a: Level, b: Level) -> Level {
    Level::from_bits(((a.to_bits() as i64 * b.to_bits() as i64) >> 20) as i32)
}

// e^x by direct series, for compile-time table generation only.  Negative
// arguments go through the reciprocal so the series never cancels and the
// relative error stays near f32 rounding.
pub(crate) const fn exp_f32(x: f32) -> f32 {
    let t = if x < 0.0 { -x } else { x };
    let mut term = 1.0f32;
    let mut acc = 1.0f32;
    let mut k = 1;
    while k < 32 {
        term = term * t / (k as f32);
        acc += term;
        k += 1;
    }
    if x < 0.0 {
        1.0 / acc
    } else {
        acc
    }
}

const EXP2_TABLE_LEN: usize = 1025;

const fn generate_exp2() -> [Level; EXP2_TABLE_LEN] {
    let mut table = [Level::ZERO; EXP2_TABLE_LEN];
    let mut i = 0usize;
    while i < EXP2_TABLE_LEN {
        // The domain boundaries and the center are contractual exact
        // values; pin them rather than trusting series rounding.
        table[i] = if i == 0 {
            Level::lit("0.5")
        } else if i == 512 {
            Level::ONE
        } else if i == 1024 {
            Level::lit("2")
        } else {
            let x = (i as f32) / 512.0 - 1.0;
            let v = exp_f32(x * core::f32::consts::LN_2);
            Level::from_bits((v * (1u32 << 20) as f32) as i32)
        };
        i += 1;
    }
    table
}

static EXP2_TABLE: [Level; EXP2_TABLE_LEN] = generate_exp2();

/// Base-2 exponential over one octave: maps `x` in [-1, +1] to
/// 2^`x` in [0.5, 2.0] by interpolated table lookup.
///
/// Inputs outside the domain return exactly 1.0 (a unity multiplier).
/// This is a deliberate fail-safe - a modulation router handed a bogus
/// deviation leaves pitch untouched instead of wrapping.
///
/// `exp2(0) == 1.0`, `exp2(1) == 2.0` and `exp2(-1) == 0.5` are exact.
pub fn exp2(x: Level) -> Level {
    if x < Level::NEG_ONE || x > Level::ONE {
        return Level::ONE;
    }
    // Bias to [0, 2^21]; 10 bits of index, 11 bits of interpolation.
    let bits = (x.to_bits() + (1 << 20)) as u32;
    let idx = (bits >> 11) as usize;
    if idx >= EXP2_TABLE_LEN - 1 {
        return EXP2_TABLE[EXP2_TABLE_LEN - 1];
    }
    let frac = (bits & 0x7FF) as i64;
    let a = EXP2_TABLE[idx].to_bits() as i64;
    let b = EXP2_TABLE[idx + 1].to_bits() as i64;
    Level::from_bits((a + (((b - a) * frac) >> 11)) as i32)
}

/// Convert a detune offset in cents to a frequency ratio.
///
/// The supported patch range is +/-600 cents (half an octave); anything
/// a caller lets through beyond +/-1200 falls into the [exp2] domain
/// fail-safe and detunes by nothing.
pub fn cents_to_ratio(cents: i16) -> Level {
    exp2(Level::from_bits((((cents as i64) << 20) / 1200) as i32))
}

const fn generate_sine() -> [i16; WAVE_TABLE_SIZE] {
    let mut table = [0i16; WAVE_TABLE_SIZE];
    let mut i = 0usize;
    while i < WAVE_TABLE_SIZE {
        let mut theta = (i as f32) * core::f32::consts::TAU / (WAVE_TABLE_SIZE as f32);
        if i >= WAVE_TABLE_SIZE / 2 {
            theta -= core::f32::consts::TAU;
        }
        // sin by alternating series; |theta| <= pi so it converges fast
        let t2 = theta * theta;
        let mut term = theta;
        let mut acc = theta;
        let mut k = 1usize;
        while k < 12 {
            term = -term * t2 / (((2 * k) * (2 * k + 1)) as f32);
            acc += term;
            k += 1;
        }
        table[i] = (acc * 32767.0) as i16;
        i += 1;
    }
    table
}

/// One full cycle of a sine wave, signed 16-bit, odd symmetry.  Shared by
/// all six oscillators and the LFO.
pub static SINE_TABLE: [i16; WAVE_TABLE_SIZE] = generate_sine();

/// Read the sine table at an oscillator phase (truncating - the sample
/// path does no interpolation).
#[inline]
pub fn sine_at(phase: Phase) -> Level {
    let idx = (phase.to_bits() >> 16) as usize & (WAVE_TABLE_SIZE - 1);
    Level::from_bits((SINE_TABLE[idx] as i32) << 5)
}

/// Read the sine table at an LFO phase.
#[inline]
pub fn sine_at_lfo(phase: LfoPhase) -> Level {
    let idx = (phase.to_bits() >> 8) as usize & (WAVE_TABLE_SIZE - 1);
    Level::from_bits((SINE_TABLE[idx] as i32) << 5)
}

const fn generate_note_freq() -> [Freq; 128] {
    let mut table = [Freq::ZERO; 128];
    let mut n = 0usize;
    while n < 128 {
        // 12-TET from A4 = 440 Hz
        let t = (n as f32 - 69.0) * core::f32::consts::LN_2 / 12.0;
        let hz = 440.0 * exp_f32(t);
        table[n] = Freq::from_bits((hz * (1u32 << 18) as f32) as u32);
        n += 1;
    }
    table
}

static NOTE_FREQUENCY: [Freq; 128] = generate_note_freq();

/// Equal-tempered frequency of a MIDI note number.
#[inline]
pub fn note_frequency(note: u8) -> Freq {
    NOTE_FREQUENCY[(note & 0x7F) as usize]
}

/// The twelve selectable oscillator frequency-multiple ratios, indexed by
/// the patch `osc_freq_mult` selector.
pub static FREQ_MULT: [Freq; 12] = {
    const fn ratio(num: u32, den: u32) -> Freq {
        Freq::from_bits((num << 18) / den)
    }
    [
        ratio(1, 2),
        ratio(1, 1),
        ratio(4, 3),
        ratio(3, 2),
        ratio(2, 1),
        ratio(3, 1),
        ratio(4, 1),
        ratio(5, 1),
        ratio(6, 1),
        ratio(7, 1),
        ratio(8, 1),
        ratio(9, 1),
    ]
};

// Mixer input steps in per-mille of full scale, 3 dB apart, step 0 hard
// zero so a zeroed mixer is exactly silent.
const MIXER_LEVEL_PM: [u32; 17] = [
    0, 6, 8, 11, 16, 22, 31, 44, 63, 88, 125, 177, 250, 354, 500, 707, 1000,
];

const fn generate_mixer_level() -> [Level; 17] {
    let mut table = [Level::ZERO; 17];
    let mut i = 0usize;
    while i < 17 {
        table[i] = Level::from_bits(((MIXER_LEVEL_PM[i] << 20) / 1000) as i32);
        i += 1;
    }
    table
}

/// Mixer input level for each of the seventeen quantized steps.
pub static MIXER_LEVEL: [Level; 17] = generate_mixer_level();

/// Convert a frequency to a per-sample phase step in table-index units.
///
/// Callers must have already rejected frequencies above
/// [MAX_OSC_FREQ_HZ], which also guarantees the step is smaller than the
/// table length so the accumulator wrap is a single conditional subtract.
#[inline]
pub fn phase_step_for(freq: Freq) -> Phase {
    debug_assert!((freq.to_bits() as u64) <= (MAX_OSC_FREQ_HZ as u64) << 18);
    let num = freq.to_bits() as u64 * (WAVE_TABLE_SIZE as u64) * 65536;
    Phase::from_bits(((num / SAMPLE_RATE_HZ as u64) >> 18) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculate_cents(base: f32, freq: f32) -> f32 {
        1200.0 * f32::log2(freq / base)
    }

    #[test]
    fn exp2_boundaries_exact() {
        assert_eq!(exp2(Level::ZERO), Level::ONE);
        assert_eq!(exp2(Level::ONE), Level::from_num(2));
        assert_eq!(exp2(Level::NEG_ONE), Level::from_num(0.5));
    }

    #[test]
    fn exp2_domain_failsafe() {
        assert_eq!(exp2(Level::from_num(1.001)), Level::ONE);
        assert_eq!(exp2(Level::from_num(-1.001)), Level::ONE);
        assert_eq!(exp2(Level::from_num(100)), Level::ONE);
    }

    #[test]
    fn exp2_monotonic_and_accurate() {
        let mut prev = Level::ZERO;
        for i in -1000..=1000 {
            let x = Level::from_num(i as f32 / 1000.0);
            let y = exp2(x);
            assert!(y >= prev, "non-monotonic at {i}");
            let exact = f32::powf(2.0, x.to_num::<f32>());
            let rel = (y.to_num::<f32>() - exact).abs() / exact;
            assert!(rel < 1e-4, "error {rel} at {i}");
            prev = y;
        }
    }

    #[test]
    fn midi_pitch_calculations() {
        for i in 0..=127u8 {
            let pitch = 440.0 * f32::powf(2.0, ((i as i32 - 69) as f32) / 12.0);
            let pitch_fixed = note_frequency(i).to_num::<f32>();
            let error = calculate_cents(pitch, pitch_fixed).abs();
            assert!(error < 1.0); // less than one cent per note
        }
    }

    #[test]
    fn sine_table_odd_symmetry() {
        assert_eq!(SINE_TABLE[0], 0);
        for i in 1..WAVE_TABLE_SIZE / 2 {
            let a = SINE_TABLE[i] as i32;
            let b = SINE_TABLE[WAVE_TABLE_SIZE - i] as i32;
            assert!((a + b).abs() <= 1, "asymmetry at {i}");
        }
        // quarter-cycle peak
        assert!(SINE_TABLE[WAVE_TABLE_SIZE / 4] >= 32700);
    }

    #[test]
    fn mixer_table_shape() {
        assert_eq!(MIXER_LEVEL[0], Level::ZERO);
        assert_eq!(MIXER_LEVEL[16], Level::from_num(1));
        for i in 0..16 {
            assert!(MIXER_LEVEL[i] < MIXER_LEVEL[i + 1]);
        }
        // 3 dB per step: each level ~sqrt(2) above the last
        for i in 2..16 {
            let r = MIXER_LEVEL[i + 1].to_num::<f32>() / MIXER_LEVEL[i].to_num::<f32>();
            assert!((r - core::f32::consts::SQRT_2).abs() < 0.05);
        }
    }

    #[test]
    fn widening_multiply() {
        let big = Level::from_num(1000);
        // 1/1024 is exactly representable; 1000/1024, scaled back up,
        // must come out exact
        let small = Level::from_bits(1 << 10);
        assert_eq!(mul(big, small), Level::from_bits(1000 << 10));
        assert_eq!(mul(big, Level::ONE), big);
        // a naive 32-bit multiply would have overflowed here
        assert_eq!(mul(big, Level::from_num(2)), Level::from_num(2000));
    }

    #[test]
    fn phase_step_conversion() {
        // 1 kHz at 32 kHz with a 2048 table: 64 indices per sample
        let step = phase_step_for(Freq::from_num(1000));
        assert_eq!(step, Phase::from_num(64));
        // ceiling frequency still below the table length
        let max = phase_step_for(Freq::from_num(12_000));
        assert!(max < Phase::from_num(WAVE_TABLE_SIZE as u32));
    }

    #[test]
    fn freq_mult_ratios() {
        assert_eq!(FREQ_MULT[1], Freq::from_num(1));
        assert_eq!(FREQ_MULT[4], Freq::from_num(2));
        let third = FREQ_MULT[2].to_num::<f32>();
        assert!((third - 4.0 / 3.0).abs() < 1e-4);
    }
}
