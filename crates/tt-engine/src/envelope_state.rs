//! Runtime state for a playing `Envelope`.

use tt_ir::{Envelope, ENVELOPE_LEVEL_MAX};

/// Per-voice progress through an envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeState {
    /// Index of the current segment.
    segment: usize,
    /// Ticks remaining in the current segment.
    ticks_left: u8,
    /// Ticks advanced since note-on (compared against the sustain tick).
    ticks: u16,
    /// Holding at the sustain tick, waiting for note-off.
    sustaining: bool,
    /// Current level, 9.7 fixed point.
    level: i16,
}

impl EnvelopeState {
    /// State at note-on: first segment, starting level.
    pub fn start(envelope: &Envelope) -> Self {
        let mut state = Self::default();
        state.restart(envelope);
        state
    }

    pub fn restart(&mut self, envelope: &Envelope) {
        self.segment = 0;
        self.ticks_left = envelope.segments.first().map_or(0, |s| s.ticks);
        self.ticks = 0;
        self.sustaining = false;
        self.level = envelope.start_level();
    }

    /// Note-off: move the tick counter past the sustain point so the
    /// release segments run from the next tick.
    pub fn release(&mut self, envelope: &Envelope) {
        self.sustaining = false;
        self.ticks = self.ticks.saturating_add(1);
        let sustain = envelope.sustain_tick as u16;
        if self.ticks <= sustain {
            self.ticks = sustain + 1;
        }
    }

    /// Advance one sequencer tick. Returns `true` if the level was stepped.
    pub fn advance(&mut self, envelope: &Envelope) -> bool {
        let Some(segment) = envelope.segments.get(self.segment) else {
            return false;
        };
        if self.ticks == envelope.sustain_tick as u16 {
            self.sustaining = true;
        }
        if self.sustaining {
            return false;
        }

        self.ticks = self.ticks.saturating_add(1);
        self.level = (self.level as i32 + segment.slope as i32)
            .clamp(0, ENVELOPE_LEVEL_MAX as i32) as i16;

        // A zero-length segment runs for one tick.
        self.ticks_left = self.ticks_left.saturating_sub(1);
        if self.ticks_left == 0 {
            self.segment += 1;
            if let Some(next) = envelope.segments.get(self.segment) {
                self.ticks_left = next.ticks;
            }
        }
        true
    }

    /// Level in 9.7 fixed point.
    pub fn level(&self) -> i16 {
        self.level
    }

    pub fn is_sustaining(&self) -> bool {
        self.sustaining
    }

    /// Past the last segment.
    pub fn is_finished(&self, envelope: &Envelope) -> bool {
        self.segment >= envelope.segments.len()
    }
}
