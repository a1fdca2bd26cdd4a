//! Synthesizer configuration.
//!
//! These are the values a firmware build would fix per platform. The engine
//! never derives them; it only checks they are usable.

use core::fmt;

/// Largest voice pool. The bytecode voice nibble addresses 16 voices.
pub const MAX_VOICES: usize = 16;

/// Largest sample buffer, in samples.
pub const MAX_BUFFER: usize = 256;

/// Highest supported sample rate; the phase range of the oscillators is 16 bits.
pub const MAX_SAMPLE_RATE: u32 = u16::MAX as u32;

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthConfig {
    /// Rate at which the tick source calls the scheduler, in Hz.
    pub sample_rate: u32,
    /// Number of voices in the pool.
    pub voice_count: usize,
    /// Double-buffer size in samples (both halves).
    pub buffer_size: usize,
    /// Right shift applied to the voice mix before clamping to 8 bits.
    pub output_scale_shift: u8,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 33_000,
            voice_count: 5,
            buffer_size: 16,
            output_scale_shift: 3,
        }
    }
}

impl SynthConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_voice_count(mut self, voice_count: usize) -> Self {
        self.voice_count = voice_count;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_output_scale_shift(mut self, shift: u8) -> Self {
        self.output_scale_shift = shift;
        self
    }

    /// Samples in one half of the double buffer.
    pub fn half_buffer(&self) -> usize {
        self.buffer_size / 2
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.voice_count == 0 || self.voice_count > MAX_VOICES {
            return Err(ConfigError::VoiceCount(self.voice_count));
        }
        if self.buffer_size < 2 || self.buffer_size % 2 != 0 || self.buffer_size > MAX_BUFFER {
            return Err(ConfigError::BufferSize(self.buffer_size));
        }
        if self.output_scale_shift > 15 {
            return Err(ConfigError::OutputScaleShift(self.output_scale_shift));
        }
        Ok(())
    }
}

/// An unusable [`SynthConfig`] field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    SampleRate(u32),
    VoiceCount(usize),
    BufferSize(usize),
    OutputScaleShift(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SampleRate(rate) => {
                write!(f, "sample rate {} Hz is outside 1-{}", rate, MAX_SAMPLE_RATE)
            }
            ConfigError::VoiceCount(n) => {
                write!(f, "voice count {} is outside 1-{}", n, MAX_VOICES)
            }
            ConfigError::BufferSize(n) => {
                write!(f, "buffer size {} must be even and within 2-{}", n, MAX_BUFFER)
            }
            ConfigError::OutputScaleShift(s) => write!(f, "output scale shift {} exceeds 15", s),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(SynthConfig::default().validate(), Ok(()));
        assert_eq!(SynthConfig::default().half_buffer(), 8);
    }

    #[test]
    fn rejects_sample_rate_beyond_sixteen_bits() {
        let cfg = SynthConfig::default().with_sample_rate(70_000);
        assert_eq!(cfg.validate(), Err(ConfigError::SampleRate(70_000)));
        let cfg = SynthConfig::default().with_sample_rate(0);
        assert_eq!(cfg.validate(), Err(ConfigError::SampleRate(0)));
    }

    #[test]
    fn rejects_voice_count_outside_pool() {
        let cfg = SynthConfig::default().with_voice_count(0);
        assert_eq!(cfg.validate(), Err(ConfigError::VoiceCount(0)));
        let cfg = SynthConfig::default().with_voice_count(MAX_VOICES + 1);
        assert_eq!(cfg.validate(), Err(ConfigError::VoiceCount(MAX_VOICES + 1)));
    }

    #[test]
    fn rejects_odd_or_oversized_buffer() {
        for size in [0, 1, 15, MAX_BUFFER + 2] {
            let cfg = SynthConfig::default().with_buffer_size(size);
            assert_eq!(cfg.validate(), Err(ConfigError::BufferSize(size)));
        }
        let cfg = SynthConfig::default().with_buffer_size(MAX_BUFFER);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_large_output_shift() {
        let cfg = SynthConfig::default().with_output_scale_shift(16);
        assert_eq!(cfg.validate(), Err(ConfigError::OutputScaleShift(16)));
    }
}
