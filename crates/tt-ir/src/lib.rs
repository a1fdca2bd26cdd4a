//! Core data types for tinytune.
//!
//! Songs, instruments and envelopes are immutable descriptors, normally
//! placed in `static` items so the engine can hold `&'static` references to
//! them. Patterns are opaque byte streams; [`bytecode`] decodes them.
//!
//! This crate is `no_std` and never allocates.

#![cfg_attr(not(feature = "std"), no_std)]

mod analysis;
pub mod bytecode;
mod envelope;
mod instrument;
mod song;

pub use analysis::{analyze, SongFeatures};
pub use bytecode::{decode_command, decode_row, Command, Commands, DecodeError, Opcode, RowCommands};
pub use envelope::{Envelope, EnvelopeSegment, ENVELOPE_LEVEL_MAX};
pub use instrument::{Instrument, WaveKind};
pub use song::{SongDefinition, SongError};
