//! Portamento: per-tick exponential approach of a pitch toward a target.

/// Glide state of one voice.
///
/// Frequency is carried as 12.4 fixed point between ticks so slow glides
/// keep their fractional progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Glide {
    enabled: bool,
    /// Per-tick multiplier offset: frequency scales by `1 ± rate/65536`.
    rate: u16,
    /// Pitch being approached, in Hz.
    target: u16,
    /// Fractional Hz, low 4 bits.
    frac: u8,
}

impl Glide {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn rate(&self) -> u16 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: u16) {
        self.rate = rate;
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    pub fn set_target(&mut self, target: u16) {
        self.target = target;
    }

    /// Voice re-initialization: glide off, fraction dropped. The rate and
    /// target survive.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.frac = 0;
    }

    /// One sequencer tick. Returns the new pitch, or `None` when not
    /// gliding or already at the target.
    pub fn step(&mut self, hz: u16) -> Option<u16> {
        if !self.enabled || hz == self.target {
            return None;
        }

        let fp = ((hz as u64) << 4) | self.frac as u64;
        let target = (self.target as u64) << 4;
        let rate = self.rate as u64;

        let next = if hz < self.target {
            let mut scaled = (fp * (0x1_0000 + rate)) >> 16;
            if rate > 0 {
                scaled = scaled.max(fp + 1);
            }
            scaled.min(target)
        } else {
            let mut scaled = (fp * (0x1_0000 - rate)) >> 16;
            if rate > 0 {
                scaled = scaled.min(fp.saturating_sub(1));
            }
            scaled.max(target)
        };

        self.frac = (next & 0x0f) as u8;
        Some((next >> 4) as u16)
    }
}
