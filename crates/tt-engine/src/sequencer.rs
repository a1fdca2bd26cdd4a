//! Sequencer: walks pattern bytecode and drives the voices.
//!
//! The first tick of every row clears glide on all voices, then executes
//! commands until ROW_ADV. Every tick then advances each voice's glide and
//! envelope. Malformed bytecode is reported as a [`SequencerFault`] and
//! skipped; playback never stops on bad data.

use core::fmt;

use log::{debug, warn};
use tt_ir::{decode_command, Command, DecodeError, SongDefinition};

use crate::frequency::decode_pitch;
use crate::voice::Voice;

/// Where playback is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    /// Index into the song's order list.
    pub order_index: usize,
    /// Pattern playing at that order index.
    pub pattern: u8,
    /// Byte offset of the next row within the pattern.
    pub offset: usize,
    /// Tick within the current row.
    pub tick: u16,
}

/// A problem found while executing pattern bytecode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerFault {
    /// Unknown opcode or truncated operand.
    Decode { pattern: u8, error: DecodeError },
    VoiceOutOfRange { pattern: u8, offset: usize, voice: u8 },
    InstrumentOutOfRange { pattern: u8, offset: usize, instrument: u8 },
    /// The pattern ended inside a row.
    MissingRowAdvance { pattern: u8, offset: usize },
    /// An order entry names a pattern the song does not have.
    PatternOutOfRange { order_index: usize, pattern: u8 },
}

impl fmt::Display for SequencerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerFault::Decode { pattern, error } => {
                write!(f, "pattern {}: {}", pattern, error)
            }
            SequencerFault::VoiceOutOfRange { pattern, offset, voice } => {
                write!(f, "pattern {} offset {}: voice {} does not exist", pattern, offset, voice)
            }
            SequencerFault::InstrumentOutOfRange { pattern, offset, instrument } => {
                write!(
                    f,
                    "pattern {} offset {}: instrument {} does not exist",
                    pattern, offset, instrument
                )
            }
            SequencerFault::MissingRowAdvance { pattern, offset } => {
                write!(f, "pattern {}: row at offset {} has no ROW_ADV", pattern, offset)
            }
            SequencerFault::PatternOutOfRange { order_index, pattern } => {
                write!(f, "order entry {}: pattern {} does not exist", order_index, pattern)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequencerFault {}

/// The playback cursor and the bytecode interpreter that moves it.
#[derive(Clone, Debug, Default)]
pub struct Sequencer {
    song: Option<&'static SongDefinition>,
    order_index: usize,
    pattern_id: u8,
    pattern: &'static [u8],
    /// Byte offset of the next instruction.
    pos: usize,
    tick: u16,
    /// Ticks in the current row.
    next_tick: u16,
    fault_count: u32,
    last_fault: Option<SequencerFault>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to the start of the order list of `song`.
    pub fn start(&mut self, song: &'static SongDefinition) {
        *self = Self {
            song: Some(song),
            ..Self::default()
        };
        self.load_order(0);
        debug!("sequencer: start \"{}\", {} order entries", song.title, song.order.len());
    }

    pub fn song(&self) -> Option<&'static SongDefinition> {
        self.song
    }

    pub fn position(&self) -> PlaybackPosition {
        PlaybackPosition {
            order_index: self.order_index,
            pattern: self.pattern_id,
            offset: self.pos,
            tick: self.tick,
        }
    }

    /// Faults seen since the song started.
    pub fn fault_count(&self) -> u32 {
        self.fault_count
    }

    pub fn last_fault(&self) -> Option<SequencerFault> {
        self.last_fault
    }

    /// Advance one tick. Does nothing without a song.
    pub fn tick(&mut self, voices: &mut [Voice]) {
        let Some(song) = self.song else {
            return;
        };

        if self.tick == 0 {
            for voice in voices.iter_mut() {
                voice.set_glide(false);
            }
            self.run_row(song, voices);
        }

        if self.pos >= self.pattern.len() {
            let next = self.order_index + 1;
            self.load_order(if next >= song.order.len() { 0 } else { next });
        }

        self.tick += 1;
        if self.tick >= self.next_tick {
            self.tick = 0;
        }

        for voice in voices.iter_mut() {
            voice.tick();
        }
    }

    fn load_order(&mut self, order_index: usize) {
        self.order_index = order_index;
        self.pos = 0;
        let Some(song) = self.song else {
            return;
        };
        self.pattern_id = song.order.get(order_index).copied().unwrap_or(0);
        match song.pattern_at(order_index) {
            Some(pattern) => self.pattern = pattern,
            None => {
                self.pattern = &[];
                self.fault(SequencerFault::PatternOutOfRange {
                    order_index,
                    pattern: self.pattern_id,
                });
            }
        }
    }

    /// Execute commands until the row's ROW_ADV.
    fn run_row(&mut self, song: &SongDefinition, voices: &mut [Voice]) {
        let ticks_per_row = song.ticks_per_row as u16;
        loop {
            let offset = self.pos;
            match decode_command(self.pattern, offset) {
                Ok((Command::RowAdvance { rows }, next)) => {
                    self.pos = next;
                    self.next_tick = rows as u16 * ticks_per_row;
                    return;
                }
                Ok((command, next)) => {
                    self.pos = next;
                    self.execute(song, voices, command, offset);
                }
                Err(error @ DecodeError::UnknownOpcode { .. }) => {
                    self.fault(SequencerFault::Decode { pattern: self.pattern_id, error });
                    self.pos = offset + 1;
                }
                Err(error @ DecodeError::Truncated { .. }) => {
                    self.fault(SequencerFault::Decode { pattern: self.pattern_id, error });
                    self.pos = self.pattern.len();
                    self.next_tick = ticks_per_row;
                    return;
                }
                Err(_) => {
                    self.fault(SequencerFault::MissingRowAdvance {
                        pattern: self.pattern_id,
                        offset,
                    });
                    self.pos = self.pattern.len();
                    self.next_tick = ticks_per_row;
                    return;
                }
            }
        }
    }

    fn execute(
        &mut self,
        song: &SongDefinition,
        voices: &mut [Voice],
        command: Command,
        offset: usize,
    ) {
        let Some(voice_id) = command.voice() else {
            return;
        };
        let Some(voice) = voices.get_mut(voice_id as usize) else {
            self.fault(SequencerFault::VoiceOutOfRange {
                pattern: self.pattern_id,
                offset,
                voice: voice_id,
            });
            return;
        };

        match command {
            Command::NoteOnFullVolume { note, volume, .. } => {
                voice.set_volume(0xff);
                note_on(voice, note, volume);
            }
            Command::NoteOn { note, volume, .. } => note_on(voice, note, volume),
            Command::NoteOff { .. } => voice.set_enable(false),
            Command::SetVolume { volume, .. } => voice.set_volume(volume),
            Command::SetInstrument { instrument, .. } => match song.instrument(instrument) {
                Some(inst) => voice.set_instrument(inst),
                None => self.fault(SequencerFault::InstrumentOutOfRange {
                    pattern: self.pattern_id,
                    offset,
                    instrument,
                }),
            },
            Command::SetGlideSpeed { rate, .. } => voice.set_glide_rate(rate),
            Command::Portamento { .. } => voice.set_glide(true),
            Command::RowAdvance { .. } => {}
        }
    }

    fn fault(&mut self, fault: SequencerFault) {
        warn!("sequencer: {}", fault);
        self.fault_count = self.fault_count.saturating_add(1);
        self.last_fault = Some(fault);
    }
}

/// Pitch and enable; a trailing volume byte, if present, is applied last.
fn note_on(voice: &mut Voice, note: u8, volume: Option<u8>) {
    voice.set_pitch(decode_pitch(note));
    voice.set_enable(true);
    if let Some(volume) = volume {
        voice.set_volume(volume);
    }
}
