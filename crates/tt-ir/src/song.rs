//! Song definitions.

use core::fmt;

use crate::instrument::Instrument;

/// A complete song: patterns, playback order, tempo and instruments.
///
/// Everything is borrowed from static data; nothing is mutated during
/// playback. The playback cursor lives in the engine.
#[derive(Clone, Copy, Debug)]
pub struct SongDefinition {
    pub title: &'static str,
    /// Pattern byte streams. A pattern's length is its slice length.
    pub patterns: &'static [&'static [u8]],
    /// Playback order as indices into `patterns`. Loops forever.
    pub order: &'static [u8],
    /// Beats per minute.
    pub bpm: u16,
    pub rows_per_beat: u8,
    pub ticks_per_row: u8,
    /// Instrument table, addressed by the id in SET_INST.
    pub instruments: &'static [Instrument],
}

/// Reasons a song definition cannot be played.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SongError {
    /// The order list is empty.
    EmptyOrder,
    /// An order entry names a pattern that does not exist.
    MissingPattern { order_index: usize, pattern: u8 },
    /// A pattern has no bytes.
    EmptyPattern { pattern: usize },
    /// bpm, rows_per_beat or ticks_per_row is zero.
    ZeroTempo,
    /// Tempo is too slow to produce a whole tick per second in 12.4 fixed point.
    TempoTooSlow { bpm: u16 },
    /// Tempo is too fast for the sample rate: less than one sample per tick.
    TempoTooFast { sample_rate: u32 },
}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongError::EmptyOrder => write!(f, "song order list is empty"),
            SongError::MissingPattern {
                order_index,
                pattern,
            } => write!(f, "order entry {} references missing pattern {}", order_index, pattern),
            SongError::EmptyPattern { pattern } => write!(f, "pattern {} is empty", pattern),
            SongError::ZeroTempo => {
                write!(f, "bpm, rows per beat and ticks per row must be non-zero")
            }
            SongError::TempoTooSlow { bpm } => write!(f, "tempo of {} bpm is too slow", bpm),
            SongError::TempoTooFast { sample_rate } => {
                write!(f, "tempo is too fast for a {} Hz sample rate", sample_rate)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SongError {}

impl SongDefinition {
    /// Check the song is playable: non-empty order, every order entry and
    /// pattern valid, usable tempo.
    pub fn validate(&self) -> Result<(), SongError> {
        if self.order.is_empty() {
            return Err(SongError::EmptyOrder);
        }
        for (order_index, &pattern) in self.order.iter().enumerate() {
            if pattern as usize >= self.patterns.len() {
                return Err(SongError::MissingPattern {
                    order_index,
                    pattern,
                });
            }
        }
        if let Some(pattern) = self.patterns.iter().position(|p| p.is_empty()) {
            return Err(SongError::EmptyPattern { pattern });
        }
        self.ticks_per_second().map(|_| ())
    }

    /// Sequencer ticks per second in 12.4 fixed point:
    /// `((bpm << 4) / 60) * rows_per_beat * ticks_per_row`.
    pub fn ticks_per_second(&self) -> Result<u32, SongError> {
        if self.bpm == 0 || self.rows_per_beat == 0 || self.ticks_per_row == 0 {
            return Err(SongError::ZeroTempo);
        }
        let beats = ((self.bpm as u32) << 4) / 60;
        if beats == 0 {
            return Err(SongError::TempoTooSlow { bpm: self.bpm });
        }
        Ok(beats * self.rows_per_beat as u32 * self.ticks_per_row as u32)
    }

    /// Samples between sequencer ticks at the given sample rate.
    pub fn samples_per_tick(&self, sample_rate: u32) -> Result<u32, SongError> {
        let ticks = self.ticks_per_second()?;
        let samples = (sample_rate << 4) / ticks;
        if samples == 0 {
            return Err(SongError::TempoTooFast { sample_rate });
        }
        Ok(samples)
    }

    /// Pattern bytes played at `order_index`.
    pub fn pattern_at(&self, order_index: usize) -> Option<&'static [u8]> {
        let pattern = *self.order.get(order_index)?;
        self.patterns.get(pattern as usize).copied()
    }

    pub fn instrument(&self, id: u8) -> Option<&'static Instrument> {
        self.instruments.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::WaveKind;

    const PAT0: &[u8] = &[0x00, 0x03];
    const PAT1: &[u8] = &[0x03];
    static INSTRUMENTS: [Instrument; 1] = [Instrument::new(WaveKind::Pulse)];

    fn song(order: &'static [u8]) -> SongDefinition {
        SongDefinition {
            title: "test",
            patterns: &[PAT0, PAT1],
            order,
            bpm: 160,
            rows_per_beat: 8,
            ticks_per_row: 12,
            instruments: &INSTRUMENTS,
        }
    }

    #[test]
    fn samples_per_tick_uses_fixed_point_tempo() {
        let s = song(&[0, 1]);
        // (160 << 4) / 60 = 42; 42 * 8 * 12 = 4032
        assert_eq!(s.ticks_per_second(), Ok(4032));
        assert_eq!(s.samples_per_tick(33000), Ok((33000 << 4) / 4032));
    }

    #[test]
    fn validate_accepts_well_formed_song() {
        assert_eq!(song(&[0, 1, 0]).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_empty_order() {
        assert_eq!(song(&[]).validate(), Err(SongError::EmptyOrder));
    }

    #[test]
    fn validate_rejects_missing_pattern() {
        assert_eq!(
            song(&[0, 5]).validate(),
            Err(SongError::MissingPattern { order_index: 1, pattern: 5 })
        );
    }

    #[test]
    fn validate_rejects_zero_tempo() {
        let mut s = song(&[0]);
        s.ticks_per_row = 0;
        assert_eq!(s.validate(), Err(SongError::ZeroTempo));
    }

    #[test]
    fn validate_rejects_sub_fixed_point_bpm() {
        let mut s = song(&[0]);
        s.bpm = 3;
        assert_eq!(s.validate(), Err(SongError::TempoTooSlow { bpm: 3 }));
    }

    #[test]
    fn samples_per_tick_rejects_tempo_faster_than_sample_rate() {
        let mut s = song(&[0]);
        s.bpm = 6000;
        s.rows_per_beat = 255;
        s.ticks_per_row = 255;
        assert!(matches!(s.samples_per_tick(8000), Err(SongError::TempoTooFast { .. })));
    }

    #[test]
    fn pattern_at_follows_order() {
        let s = song(&[1, 0]);
        assert_eq!(s.pattern_at(0), Some(PAT1));
        assert_eq!(s.pattern_at(1), Some(PAT0));
        assert_eq!(s.pattern_at(2), None);
    }
}
