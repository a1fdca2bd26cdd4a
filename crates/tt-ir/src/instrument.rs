//! Instrument descriptors.

use crate::envelope::Envelope;

/// Oscillator waveform of a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaveKind {
    /// Square/pulse wave; duty sets the pulse width.
    #[default]
    Pulse,
    /// Linear ramp; duty morphs between triangle (0x80) and saw (extremes).
    TriangleSaw,
    /// LFSR noise resampled at the voice pitch.
    Noise,
}

impl WaveKind {
    pub fn name(self) -> &'static str {
        match self {
            WaveKind::Pulse => "Pulse",
            WaveKind::TriangleSaw => "Triangle/Saw",
            WaveKind::Noise => "Noise",
        }
    }
}

/// Bundles everything needed to reconfigure a voice in one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub kind: WaveKind,
    /// Default duty (0-255, 0x80 = midpoint).
    pub duty: u8,
    /// Bit-crunch amount (0 = off, n = drop the low n output bits).
    pub bit_crunch: u8,
    /// Volume envelope, if any.
    pub envelope: Option<&'static Envelope>,
}

impl Instrument {
    pub const fn new(kind: WaveKind) -> Self {
        Self {
            kind,
            duty: 0x80,
            bit_crunch: 0,
            envelope: None,
        }
    }

    pub const fn with_duty(mut self, duty: u8) -> Self {
        self.duty = duty;
        self
    }

    pub const fn with_bit_crunch(mut self, bit_crunch: u8) -> Self {
        self.bit_crunch = bit_crunch;
        self
    }

    pub const fn with_envelope(mut self, envelope: &'static Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }
}
