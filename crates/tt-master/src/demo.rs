//! Built-in demo song.

use tt_ir::{Envelope, EnvelopeSegment, Instrument, SongDefinition, WaveKind};

static LEAD_SEGMENTS: [EnvelopeSegment; 3] = [
    EnvelopeSegment::new(-174, 188),
    EnvelopeSegment::new(3264, 4),
    EnvelopeSegment::new(-68, 192),
];
static LEAD_ENV: Envelope = Envelope::new(255, &LEAD_SEGMENTS, 16);

static PLUCK_SEGMENTS: [EnvelopeSegment; 4] = [
    EnvelopeSegment::new(0, 4),
    EnvelopeSegment::new(-430, 76),
    EnvelopeSegment::new(116, 112),
    EnvelopeSegment::new(-68, 192),
];
static PLUCK_ENV: Envelope = Envelope::new(255, &PLUCK_SEGMENTS, 0);

static HIT_SEGMENTS: [EnvelopeSegment; 5] = [
    EnvelopeSegment::new(0, 8),
    EnvelopeSegment::new(-816, 40),
    EnvelopeSegment::new(3440, 8),
    EnvelopeSegment::new(-594, 44),
    EnvelopeSegment::new(-5, 255),
];
static HIT_ENV: Envelope = Envelope::new(255, &HIT_SEGMENTS, 255);

static INSTRUMENTS: [Instrument; 3] = [
    Instrument::new(WaveKind::TriangleSaw).with_envelope(&PLUCK_ENV),
    Instrument::new(WaveKind::Pulse).with_duty(0x80).with_envelope(&LEAD_ENV),
    Instrument::new(WaveKind::Noise).with_envelope(&HIT_ENV),
];

static PATTERN_0: [u8; 85] = [
    5, 1, 0, 173, 224, 21, 0, 24, 73, 19, 37, 0, 40, 73, 19, 16, 76, 19, 32, 76, //
    19, 16, 78, 19, 32, 78, 19, 16, 83, 19, 32, 83, 83, 16, 76, 19, 32, 76, 19, 16, //
    78, 19, 32, 78, 67, 17, 3, 0, 44, 19, 33, 19, 16, 71, 19, 32, 71, 19, 16, 75, //
    19, 32, 75, 19, 16, 76, 19, 32, 76, 83, 16, 78, 19, 32, 78, 19, 16, 75, 19, 32, //
    75, 19, 16, 71, 51,
];

static PATTERN_1: [u8; 57] = [
    5, 1, 8, 37, 21, 0, 24, 75, 19, 37, 0, 40, 75, 147, 16, 73, 19, 32, 73, 147, //
    16, 68, 19, 32, 68, 83, 0, 35, 67, 17, 35, 33, 115, 16, 73, 19, 32, 73, 19, 16, //
    78, 19, 32, 78, 19, 16, 80, 19, 32, 80, 19, 16, 85, 19, 32, 85, 19,
];

static PATTERN_2: [u8; 92] = [
    5, 2, 8, 45, 22, 197, 8, 23, 21, 0, 24, 87, 37, 0, 40, 61, 51, 32, 63, 51, //
    0, 45, 17, 32, 64, 51, 16, 85, 32, 66, 51, 0, 45, 32, 68, 35, 17, 3, 32, 71, //
    51, 0, 45, 16, 92, 32, 73, 51, 32, 76, 51, 0, 44, 16, 90, 32, 83, 51, 32, 80, //
    51, 0, 44, 23, 16, 95, 32, 76, 51, 16, 87, 32, 73, 51, 0, 44, 32, 78, 51, 32, //
    75, 51, 0, 44, 16, 83, 32, 71, 51, 32, 68, 51,
];

static PATTERN_3: [u8; 66] = [
    5, 1, 0, 165, 224, 21, 0, 24, 75, 33, 36, 255, 115, 8, 42, 16, 76, 115, 0, 44, //
    16, 75, 83, 0, 47, 16, 71, 99, 0, 44, 16, 75, 99, 0, 49, 16, 73, 51, 1, 17, //
    115, 0, 189, 224, 19, 8, 56, 19, 0, 54, 19, 0, 49, 19, 0, 54, 19, 0, 49, 19, //
    0, 44, 19, 0, 37, 19,
];

static PATTERNS: [&[u8]; 4] = [&PATTERN_0, &PATTERN_1, &PATTERN_2, &PATTERN_3];

static LUNA: SongDefinition = SongDefinition {
    title: "Luna",
    patterns: &PATTERNS,
    order: &[0, 1, 2, 3],
    bpm: 160,
    rows_per_beat: 8,
    ticks_per_row: 12,
    instruments: &INSTRUMENTS,
};

/// A short three-voice loop: triangle bass, pulse lead and a noise hit.
pub fn demo_song() -> &'static SongDefinition {
    &LUNA
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ir::{analyze, decode_row};

    #[test]
    fn demo_song_is_valid() {
        assert_eq!(demo_song().validate(), Ok(()));
        assert_eq!(demo_song().patterns.len(), 4);
    }

    #[test]
    fn every_row_decodes_cleanly() {
        for pattern in demo_song().patterns {
            let mut offset = 0;
            while offset < pattern.len() {
                let (row, next) = decode_row(pattern, offset).unwrap();
                assert!(!row.is_empty());
                offset = next;
            }
            assert_eq!(offset, pattern.len());
        }
    }

    #[test]
    fn analysis_sees_all_instruments_and_glide() {
        let features = analyze(demo_song());
        assert_eq!(features.decode_errors, 0);
        assert!(features.has_glide);
        assert_eq!(features.instruments_used, 0b111);
    }
}
