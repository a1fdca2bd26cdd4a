//! Waveform generators.
//!
//! Every oscillator runs off a phase accumulator that advances by the voice
//! frequency each sample and wraps modulo the sample rate. A wrap is one
//! cycle. Output is added into a shared mix buffer, so voices sum.

use tt_ir::WaveKind;

use crate::fixed::scale_by_nibble;

/// Duty value giving a symmetric waveform.
pub const DUTY_MIDPOINT: u8 = 0x80;

/// Duties below the midpoint are reflected around this value.
const DUTY_MIRROR: i16 = 0x79;

/// Noise LFSR seed.
const LFSR_SEED: u16 = 0xACA1;

/// Noise LFSR feedback taps (maximal length, period 65535).
const LFSR_TAPS: u16 = 0xB400;

/// The voice parameters an oscillator reads when it renders or retunes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    /// Frequency in Hz.
    pub hz: u16,
    /// Post-envelope amplitude, 0..=127.
    pub level: i16,
    pub sample_rate: u32,
    /// ANDed into triangle output; `!0` leaves it untouched.
    pub crunch_mask: i16,
}

/// Map a duty below the midpoint onto its mirror above it, so a 0-255 sweep
/// is symmetric around 0x80.
pub fn mirror_duty(duty: u8) -> u8 {
    if duty < DUTY_MIDPOINT {
        (DUTY_MIDPOINT as i16 + DUTY_MIRROR - duty as i16) as u8
    } else {
        duty
    }
}

/// Square wave: `+level` until the phase crosses the duty threshold, then
/// `-level` for the rest of the cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse {
    duty: u8,
    /// Phase at which the output flips sign.
    duty_period: u32,
}

impl Pulse {
    fn update(&mut self, tone: &Tone) {
        self.duty_period = (self.duty as u32 * tone.sample_rate) >> 8;
    }

    fn render(&self, tone: &Tone, phase: &mut u32, out: &mut [i16]) {
        let sr = tone.sample_rate;
        for sample in out {
            *phase += tone.hz as u32;
            if *phase >= sr {
                *phase -= sr;
            }
            *sample += if *phase >= self.duty_period { -tone.level } else { tone.level };
        }
    }
}

/// Linear ramp. Rises from `peak` to `-peak` during the first `duty/256`
/// of a cycle and falls back during the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleSaw {
    duty: u8,
    /// Phase below which the ramp rises.
    rise_period: u32,
    /// Ramp value at the start of a cycle, 9.7 fixed point (negative).
    peak: i16,
    ramp: i16,
    rise_slope: i16,
    fall_slope: i16,
}

impl TriangleSaw {
    fn update(&mut self, tone: &Tone) {
        self.peak = -(tone.level << 7);
        let period = (tone.sample_rate / tone.hz.max(1) as u32).max(2);
        let rise_len = ((self.duty as u32 * period) >> 8).clamp(1, period - 1);
        self.rise_period = (self.duty as u32 * tone.sample_rate) >> 8;

        let span = -(self.peak as i32) << 1;
        self.rise_slope = (span / rise_len as i32) as i16;
        self.fall_slope = (-span / (period - rise_len) as i32) as i16;
    }

    fn render(&mut self, tone: &Tone, phase: &mut u32, out: &mut [i16]) {
        let sr = tone.sample_rate;
        for sample in out {
            if *phase >= sr {
                *phase -= sr;
                self.ramp = self.peak;
            }
            let slope = if *phase < self.rise_period { self.rise_slope } else { self.fall_slope };
            self.ramp = self.ramp.saturating_add(slope);
            *phase += tone.hz as u32;
            *sample += (self.ramp >> 7) & tone.crunch_mask;
        }
    }
}

/// 16-bit Galois LFSR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lfsr(u16);

impl Default for Lfsr {
    fn default() -> Self {
        Self(LFSR_SEED)
    }
}

impl Lfsr {
    pub fn next_byte(&mut self) -> u8 {
        let lsb = self.0 & 1;
        self.0 >>= 1;
        if lsb != 0 {
            self.0 ^= LFSR_TAPS;
        }
        (self.0 & 0xff) as u8
    }

    pub fn state(&self) -> u16 {
        self.0
    }
}

/// Random values resampled at sixteen times the voice frequency and held
/// in between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Noise {
    lfsr: Lfsr,
    held: i16,
}

impl Noise {
    fn render(&mut self, tone: &Tone, phase: &mut u32, out: &mut [i16]) {
        let sr = tone.sample_rate;
        let step = (tone.hz as u32) << 4;
        let scale = (tone.level >> 3).clamp(0, 16) as u8;
        for sample in out {
            *phase += step;
            if *phase >= sr {
                *phase %= sr;
                self.held = scale_by_nibble(self.lfsr.next_byte() as i8 as i16, scale);
            }
            *sample += self.held;
        }
    }
}

/// One of the three waveform generators, with its working state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Oscillator {
    Pulse(Pulse),
    TriangleSaw(TriangleSaw),
    Noise(Noise),
}

impl Oscillator {
    /// Fresh oscillator at the midpoint duty. Call [`update`](Self::update)
    /// before rendering.
    pub fn new(kind: WaveKind) -> Self {
        match kind {
            WaveKind::Pulse => Oscillator::Pulse(Pulse {
                duty: DUTY_MIDPOINT,
                duty_period: 0,
            }),
            WaveKind::TriangleSaw => Oscillator::TriangleSaw(TriangleSaw {
                duty: DUTY_MIDPOINT,
                rise_period: 0,
                peak: 0,
                ramp: 0,
                rise_slope: 0,
                fall_slope: 0,
            }),
            WaveKind::Noise => Oscillator::Noise(Noise::default()),
        }
    }

    pub fn kind(&self) -> WaveKind {
        match self {
            Oscillator::Pulse(_) => WaveKind::Pulse,
            Oscillator::TriangleSaw(_) => WaveKind::TriangleSaw,
            Oscillator::Noise(_) => WaveKind::Noise,
        }
    }

    /// Stored (post-mirror) duty. Noise has none and reports the midpoint.
    pub fn duty(&self) -> u8 {
        match self {
            Oscillator::Pulse(p) => p.duty,
            Oscillator::TriangleSaw(t) => t.duty,
            Oscillator::Noise(_) => DUTY_MIDPOINT,
        }
    }

    /// Set the duty (mirrored below the midpoint) and recompute the
    /// waveform parameters. Ignored by noise.
    pub fn set_duty(&mut self, duty: u8, tone: &Tone) {
        let duty = mirror_duty(duty);
        match self {
            Oscillator::Pulse(p) => p.duty = duty,
            Oscillator::TriangleSaw(t) => t.duty = duty,
            Oscillator::Noise(_) => return,
        }
        self.update(tone);
    }

    /// Recompute derived parameters after the pitch or level changed.
    pub fn update(&mut self, tone: &Tone) {
        match self {
            Oscillator::Pulse(p) => p.update(tone),
            Oscillator::TriangleSaw(t) => t.update(tone),
            Oscillator::Noise(_) => {}
        }
    }

    /// Add `out.len()` samples into `out`.
    pub fn render(&mut self, tone: &Tone, phase: &mut u32, out: &mut [i16]) {
        match self {
            Oscillator::Pulse(p) => p.render(tone, phase, out),
            Oscillator::TriangleSaw(t) => t.render(tone, phase, out),
            Oscillator::Noise(n) => n.render(tone, phase, out),
        }
    }
}
