//! Song feature analysis: scans a song's patterns to report what it uses.

use core::fmt;

use crate::bytecode::{Command, Commands, DecodeError};
use crate::song::SongDefinition;

/// Summary of what a song's patterns contain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SongFeatures {
    /// Total rows across all patterns (not the order list).
    pub rows: usize,
    /// Sequencer ticks taken by one pass through the order list.
    pub ticks_per_loop: u32,
    pub total_notes: usize,
    pub note_range: Option<(u8, u8)>,
    /// Bit `n` set when voice `n` is addressed.
    pub voices_used: u16,
    /// Bit `n` set when instrument `n` is selected (ids above 63 are not tracked).
    pub instruments_used: u64,
    pub has_note_off: bool,
    pub has_glide: bool,
    /// First decode error found, with the index of its pattern.
    pub first_error: Option<(usize, DecodeError)>,
    pub decode_errors: usize,
}

/// Analyze a song and return a summary of which features it uses.
pub fn analyze(song: &SongDefinition) -> SongFeatures {
    let mut features = SongFeatures::default();

    for (index, pattern) in song.patterns.iter().enumerate() {
        for item in Commands::new(pattern) {
            match item {
                Ok((_, command)) => analyze_command(&command, &mut features),
                Err(e) => {
                    features.decode_errors += 1;
                    features.first_error.get_or_insert((index, e));
                }
            }
        }
    }

    features.ticks_per_loop = song
        .order
        .iter()
        .filter_map(|&p| song.patterns.get(p as usize))
        .map(|pattern| pattern_ticks(pattern, song.ticks_per_row))
        .sum();

    features
}

fn pattern_ticks(pattern: &[u8], ticks_per_row: u8) -> u32 {
    Commands::new(pattern)
        .filter_map(Result::ok)
        .filter_map(|(_, command)| match command {
            Command::RowAdvance { rows } => Some(rows as u32 * ticks_per_row as u32),
            _ => None,
        })
        .sum()
}

fn analyze_command(command: &Command, features: &mut SongFeatures) {
    if let Some(voice) = command.voice() {
        features.voices_used |= 1 << (voice & 0x0f);
    }

    match *command {
        Command::NoteOn { note, .. } | Command::NoteOnFullVolume { note, .. } => {
            features.total_notes += 1;
            features.note_range = Some(match features.note_range {
                Some((lo, hi)) => (lo.min(note), hi.max(note)),
                None => (note, note),
            });
        }
        Command::NoteOff { .. } => features.has_note_off = true,
        Command::RowAdvance { rows } => features.rows += rows as usize,
        Command::SetInstrument { instrument, .. } => {
            if instrument < 64 {
                features.instruments_used |= 1 << instrument;
            }
        }
        Command::SetGlideSpeed { .. } | Command::Portamento { .. } => features.has_glide = true,
        Command::SetVolume { .. } => {}
    }
}

impl fmt::Display for SongFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows:     {} ({} ticks per loop)", self.rows, self.ticks_per_loop)?;
        writeln!(f, "Notes:    {} total", self.total_notes)?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {}", lo, hi)?;
        }
        writeln!(
            f,
            "Voices:   {} used, Instruments: {} used",
            self.voices_used.count_ones(),
            self.instruments_used.count_ones(),
        )?;
        writeln!(
            f,
            "Commands: Note{}{}",
            if self.has_note_off { ", Off" } else { "" },
            if self.has_glide { ", Glide" } else { "" },
        )?;
        if let Some((pattern, e)) = self.first_error {
            writeln!(f, "Errors:   {} (pattern {}: {})", self.decode_errors, pattern, e)?;
        }
        Ok(())
    }
}
