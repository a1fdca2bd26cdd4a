//! Note-code to frequency conversion.
//!
//! One octave of base pitches is stored; every other octave is reached by
//! shifting, so decoding needs no multiply or divide. Note 69 is A-440.

/// Octave of the base table: note codes 84-95.
const BASE_OCTAVE: i8 = 7;

/// Pitches in Hz for note codes 84-95 (C through B).
pub const PITCH_TABLE: [u16; 12] = [
    1046, 1108, 1174, 1244, 1318, 1396, 1479, 1567, 1661, 1760, 1864, 1975,
];

/// Convert a note code (0-127) to an integer frequency in Hz.
pub fn decode_pitch(note: u8) -> u16 {
    let octave = (note / 12) as i8 - BASE_OCTAVE;
    let base = PITCH_TABLE[(note % 12) as usize];
    if octave >= 0 {
        base << octave as u32
    } else {
        base >> (-octave) as u32
    }
}
