//! Piecewise-linear volume envelopes.

/// Highest envelope level: 255 in 9.7 fixed point.
pub const ENVELOPE_LEVEL_MAX: i16 = 0xff << 7;

/// One envelope segment: `slope` is added to the level once per tick, for
/// `ticks` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopeSegment {
    /// Per-tick level change, 9.7 fixed point.
    pub slope: i16,
    /// Number of ticks this segment runs.
    pub ticks: u8,
}

impl EnvelopeSegment {
    pub const fn new(slope: i16, ticks: u8) -> Self {
        Self { slope, ticks }
    }
}

/// An immutable volume envelope shared by any number of voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Level at note-on (integer part; shifted into 9.7 when applied).
    pub starting_level: u8,
    /// Segments, applied in order.
    pub segments: &'static [EnvelopeSegment],
    /// Tick at which progression halts until note-off.
    pub sustain_tick: u8,
}

impl Envelope {
    pub const fn new(
        starting_level: u8,
        segments: &'static [EnvelopeSegment],
        sustain_tick: u8,
    ) -> Self {
        Self {
            starting_level,
            segments,
            sustain_tick,
        }
    }

    /// Starting level in 9.7 fixed point.
    pub const fn start_level(&self) -> i16 {
        (self.starting_level as i16) << 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DECAY: [EnvelopeSegment; 2] =
        [EnvelopeSegment::new(-100, 10), EnvelopeSegment::new(-5, 200)];

    #[test]
    fn start_level_is_nine_seven_fixed_point() {
        let env = Envelope::new(255, &DECAY, 0);
        assert_eq!(env.start_level(), ENVELOPE_LEVEL_MAX);
        assert_eq!(Envelope::new(1, &DECAY, 0).start_level(), 128);
    }
}
