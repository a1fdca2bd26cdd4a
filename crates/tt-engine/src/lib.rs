//! Synthesis and sequencing engine for tinytune.
//!
//! Everything runs in fixed point with no heap. A [`Scheduler`] owns the
//! voice pool and sequencer and is driven one sample at a time from a
//! periodic tick source.

#![cfg_attr(not(feature = "std"), no_std)]

mod config;
mod envelope_state;
pub mod fixed;
mod frequency;
mod glide;
mod mixer;
pub mod oscillator;
pub mod scheduler;
mod sequencer;
mod voice;

pub use config::{ConfigError, SynthConfig, MAX_BUFFER, MAX_SAMPLE_RATE, MAX_VOICES};
pub use envelope_state::EnvelopeState;
pub use frequency::{decode_pitch, PITCH_TABLE};
pub use glide::Glide;
pub use mixer::{Engine, SILENCE};
pub use oscillator::{Oscillator, Tone};
pub use scheduler::{ControlError, Hardware, Scheduler};
pub use sequencer::{PlaybackPosition, Sequencer, SequencerFault};
pub use voice::{Voice, AUDIBLE_FLOOR, DEFAULT_PITCH, DEFAULT_VOLUME};
