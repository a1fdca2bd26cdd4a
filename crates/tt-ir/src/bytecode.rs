//! Pattern bytecode.
//!
//! Each instruction starts with a lead byte: the low nibble is the opcode,
//! the high nibble is the target voice (or, for ROW_ADV, the number of
//! extra rows to wait). Operand bytes follow the lead byte.
//!
//! | Opcode | Operands | Effect |
//! |---|---|---|
//! | NOTE_ON (0) | note | pitch + enable; note bit 7 set ⇒ one more byte: volume |
//! | NOTE_OFF (1) | – | release |
//! | ROW_ADV (3) | – | end of row, wait `nibble + 1` rows |
//! | SET_VOL (4) | volume | |
//! | SET_INST (5) | instrument id | |
//! | SET_GLIDE_SPEED (6) | low, high | 16-bit glide rate, little-endian |
//! | PORTAMENTO (7) | – | glide for this row |
//! | NOTE_ON_FULL_VOL (8) | note | volume 0xFF, then as NOTE_ON |

use core::fmt;

use arrayvec::ArrayVec;

/// Set in a note byte when a volume byte follows.
pub const NOTE_VOLUME_FLAG: u8 = 0x80;

/// Most commands a single row may hold in a [`RowCommands`] buffer.
pub const MAX_ROW_COMMANDS: usize = 64;

/// Decoded commands of one row, ending with its `RowAdvance`.
pub type RowCommands = ArrayVec<Command, MAX_ROW_COMMANDS>;

/// Instruction opcode (low nibble of the lead byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    NoteOn = 0,
    NoteOff = 1,
    RowAdvance = 3,
    SetVolume = 4,
    SetInstrument = 5,
    SetGlideSpeed = 6,
    Portamento = 7,
    NoteOnFullVolume = 8,
}

impl Opcode {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0 => Some(Opcode::NoteOn),
            1 => Some(Opcode::NoteOff),
            3 => Some(Opcode::RowAdvance),
            4 => Some(Opcode::SetVolume),
            5 => Some(Opcode::SetInstrument),
            6 => Some(Opcode::SetGlideSpeed),
            7 => Some(Opcode::Portamento),
            8 => Some(Opcode::NoteOnFullVolume),
            _ => None,
        }
    }

    /// Operand bytes that always follow the lead byte. NOTE_ON's optional
    /// volume byte is not counted.
    pub fn operand_len(self) -> usize {
        match self {
            Opcode::NoteOff | Opcode::RowAdvance | Opcode::Portamento => 0,
            Opcode::NoteOn
            | Opcode::NoteOnFullVolume
            | Opcode::SetVolume
            | Opcode::SetInstrument => 1,
            Opcode::SetGlideSpeed => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::NoteOn => "NOTE_ON",
            Opcode::NoteOff => "NOTE_OFF",
            Opcode::RowAdvance => "ROW_ADV",
            Opcode::SetVolume => "SET_VOL",
            Opcode::SetInstrument => "SET_INST",
            Opcode::SetGlideSpeed => "SET_GLIDE_SPEED",
            Opcode::Portamento => "PORTAMENTO",
            Opcode::NoteOnFullVolume => "NOTE_ON_FULL_VOL",
        }
    }
}

/// A decoded pattern instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Set pitch from `note` and enable; `volume` is the trailing volume
    /// byte present when the note byte had bit 7 set.
    NoteOn { voice: u8, note: u8, volume: Option<u8> },
    NoteOff { voice: u8 },
    /// End of row; the next row starts `rows` rows later.
    RowAdvance { rows: u8 },
    SetVolume { voice: u8, volume: u8 },
    SetInstrument { voice: u8, instrument: u8 },
    SetGlideSpeed { voice: u8, rate: u16 },
    Portamento { voice: u8 },
    /// Volume 0xFF, then exactly as `NoteOn`.
    NoteOnFullVolume { voice: u8, note: u8, volume: Option<u8> },
}

impl Command {
    /// Target voice, or `None` for `RowAdvance`.
    pub fn voice(&self) -> Option<u8> {
        match *self {
            Command::NoteOn { voice, .. }
            | Command::NoteOff { voice }
            | Command::SetVolume { voice, .. }
            | Command::SetInstrument { voice, .. }
            | Command::SetGlideSpeed { voice, .. }
            | Command::Portamento { voice }
            | Command::NoteOnFullVolume { voice, .. } => Some(voice),
            Command::RowAdvance { .. } => None,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Command::NoteOn { .. } => Opcode::NoteOn,
            Command::NoteOff { .. } => Opcode::NoteOff,
            Command::RowAdvance { .. } => Opcode::RowAdvance,
            Command::SetVolume { .. } => Opcode::SetVolume,
            Command::SetInstrument { .. } => Opcode::SetInstrument,
            Command::SetGlideSpeed { .. } => Opcode::SetGlideSpeed,
            Command::Portamento { .. } => Opcode::Portamento,
            Command::NoteOnFullVolume { .. } => Opcode::NoteOnFullVolume,
        }
    }
}

/// Malformed bytecode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Lead byte at `offset` has an opcode nibble with no meaning.
    UnknownOpcode { offset: usize, byte: u8 },
    /// The instruction starting at `offset` runs past the end of the pattern.
    Truncated { offset: usize, opcode: Opcode },
    /// The pattern ended inside a row that started at `offset`.
    UnterminatedRow { offset: usize },
    /// The row starting at `offset` has more than [`MAX_ROW_COMMANDS`] commands.
    RowTooLong { offset: usize },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::UnknownOpcode { offset, .. }
            | DecodeError::Truncated { offset, .. }
            | DecodeError::UnterminatedRow { offset }
            | DecodeError::RowTooLong { offset } => offset,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownOpcode { offset, byte } => {
                write!(f, "unknown opcode in byte {:#04x} at offset {}", byte, offset)
            }
            DecodeError::Truncated { offset, opcode } => {
                write!(f, "{} at offset {} is missing operand bytes", opcode.name(), offset)
            }
            DecodeError::UnterminatedRow { offset } => {
                write!(f, "row at offset {} has no ROW_ADV", offset)
            }
            DecodeError::RowTooLong { offset } => {
                write!(f, "row at offset {} has more than {} commands", offset, MAX_ROW_COMMANDS)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Decode the instruction at `offset`, returning it and the offset of the
/// next instruction.
pub fn decode_command(data: &[u8], offset: usize) -> Result<(Command, usize), DecodeError> {
    let lead = *data.get(offset).ok_or(DecodeError::UnterminatedRow { offset })?;
    let nibble = lead >> 4;
    let opcode = Opcode::from_nibble(lead & 0x0f)
        .ok_or(DecodeError::UnknownOpcode { offset, byte: lead })?;
    let operand = |i: usize| {
        data.get(offset + 1 + i)
            .copied()
            .ok_or(DecodeError::Truncated { offset, opcode })
    };
    let mut next = offset + 1 + opcode.operand_len();

    let command = match opcode {
        Opcode::NoteOn | Opcode::NoteOnFullVolume => {
            let raw = operand(0)?;
            let volume = if raw & NOTE_VOLUME_FLAG != 0 {
                next += 1;
                Some(operand(1)?)
            } else {
                None
            };
            let note = raw & !NOTE_VOLUME_FLAG;
            if opcode == Opcode::NoteOn {
                Command::NoteOn { voice: nibble, note, volume }
            } else {
                Command::NoteOnFullVolume { voice: nibble, note, volume }
            }
        }
        Opcode::NoteOff => Command::NoteOff { voice: nibble },
        Opcode::RowAdvance => Command::RowAdvance { rows: nibble + 1 },
        Opcode::SetVolume => Command::SetVolume { voice: nibble, volume: operand(0)? },
        Opcode::SetInstrument => Command::SetInstrument { voice: nibble, instrument: operand(0)? },
        Opcode::SetGlideSpeed => {
            let rate = u16::from_le_bytes([operand(0)?, operand(1)?]);
            Command::SetGlideSpeed { voice: nibble, rate }
        }
        Opcode::Portamento => Command::Portamento { voice: nibble },
    };
    Ok((command, next))
}

/// Decode one row starting at `offset`. Returns the row's commands
/// (ending with its `RowAdvance`) and the offset of the next row.
pub fn decode_row(data: &[u8], offset: usize) -> Result<(RowCommands, usize), DecodeError> {
    let mut row = RowCommands::new();
    let mut pos = offset;
    loop {
        if pos >= data.len() {
            return Err(DecodeError::UnterminatedRow { offset });
        }
        let (command, next) = decode_command(data, pos)?;
        row.try_push(command)
            .map_err(|_| DecodeError::RowTooLong { offset })?;
        pos = next;
        if matches!(command, Command::RowAdvance { .. }) {
            return Ok((row, pos));
        }
    }
}

/// Iterator over every instruction of a pattern, yielding
/// `(offset, command)`. Stops after the first error.
pub struct Commands<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Commands<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, failed: false }
    }
}

impl Iterator for Commands<'_> {
    type Item = Result<(usize, Command), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let offset = self.pos;
        match decode_command(self.data, offset) {
            Ok((command, next)) => {
                self.pos = next;
                Some(Ok((offset, command)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST_ROW: [u8; 10] = [5, 1, 0, 173, 224, 21, 0, 24, 73, 19];

    #[test]
    fn decodes_reference_row() {
        let (row, next) = decode_row(&FIRST_ROW, 0).unwrap();
        assert_eq!(next, FIRST_ROW.len());
        assert_eq!(
            row.as_slice(),
            &[
                Command::SetInstrument { voice: 0, instrument: 1 },
                Command::NoteOn { voice: 0, note: 45, volume: Some(224) },
                Command::SetInstrument { voice: 1, instrument: 0 },
                Command::NoteOnFullVolume { voice: 1, note: 73, volume: None },
                Command::RowAdvance { rows: 2 },
            ]
        );
    }

    #[test]
    fn decode_command_reports_next_offset() {
        assert_eq!(
            decode_command(&FIRST_ROW, 2),
            Ok((Command::NoteOn { voice: 0, note: 45, volume: Some(224) }, 5))
        );
        assert_eq!(
            decode_command(&FIRST_ROW, 7),
            Ok((Command::NoteOnFullVolume { voice: 1, note: 73, volume: None }, 9))
        );
    }

    #[test]
    fn glide_speed_is_little_endian() {
        let data = [0x36, 0x34, 0x12];
        assert_eq!(
            decode_command(&data, 0),
            Ok((Command::SetGlideSpeed { voice: 3, rate: 0x1234 }, 3))
        );
    }

    #[test]
    fn row_advance_nibble_is_rows_minus_one() {
        assert_eq!(decode_command(&[0x03], 0), Ok((Command::RowAdvance { rows: 1 }, 1)));
        assert_eq!(decode_command(&[0xf3], 0), Ok((Command::RowAdvance { rows: 16 }, 1)));
    }

    #[test]
    fn zero_operand_commands() {
        assert_eq!(decode_command(&[0x21], 0), Ok((Command::NoteOff { voice: 2 }, 1)));
        assert_eq!(decode_command(&[0x47], 0), Ok((Command::Portamento { voice: 4 }, 1)));
    }

    #[test]
    fn unknown_opcode_is_reported() {
        assert_eq!(
            decode_command(&[0x03, 0x12], 1),
            Err(DecodeError::UnknownOpcode { offset: 1, byte: 0x12 })
        );
    }

    #[test]
    fn truncated_operand_is_reported() {
        assert_eq!(
            decode_command(&[0x06, 0x01], 0),
            Err(DecodeError::Truncated { offset: 0, opcode: Opcode::SetGlideSpeed })
        );
        // Volume flag set but no volume byte.
        assert_eq!(
            decode_command(&[0x00, 0x80 | 60], 0),
            Err(DecodeError::Truncated { offset: 0, opcode: Opcode::NoteOn })
        );
    }

    #[test]
    fn row_without_advance_is_unterminated() {
        assert_eq!(
            decode_row(&[0x01, 0x11], 0),
            Err(DecodeError::UnterminatedRow { offset: 0 })
        );
    }

    #[test]
    fn oversized_row_is_rejected() {
        let data = [0x01u8; MAX_ROW_COMMANDS + 1];
        assert_eq!(decode_row(&data, 0), Err(DecodeError::RowTooLong { offset: 0 }));
    }

    #[test]
    fn commands_iterator_walks_pattern_and_stops_on_error() {
        let data = [0x01, 0x03, 0x0f, 0x01];
        let items: ArrayVec<_, 8> = Commands::new(&data).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Ok((0, Command::NoteOff { voice: 0 })));
        assert_eq!(items[1], Ok((1, Command::RowAdvance { rows: 1 })));
        assert_eq!(items[2], Err(DecodeError::UnknownOpcode { offset: 2, byte: 0x0f }));
    }

    #[test]
    fn command_voice_and_opcode() {
        let cmd = Command::SetVolume { voice: 7, volume: 10 };
        assert_eq!(cmd.voice(), Some(7));
        assert_eq!(cmd.opcode(), Opcode::SetVolume);
        assert_eq!(Command::RowAdvance { rows: 1 }.voice(), None);
    }
}
