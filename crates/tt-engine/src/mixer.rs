//! Synthesis context: the voice pool, the sequencer and the output mix.

use heapless::Vec;
use tt_ir::{SongDefinition, WaveKind};

use crate::config::{SynthConfig, MAX_BUFFER, MAX_VOICES};
use crate::sequencer::Sequencer;
use crate::voice::Voice;

/// Unsigned output value for silence.
pub const SILENCE: u8 = 0x80;

/// Largest magnitude of a mixed sample before the midpoint offset.
const OUTPUT_PEAK: i16 = 0x7f;

/// Everything the real-time tasks mutate.
#[derive(Clone, Debug)]
pub struct Engine {
    voices: Vec<Voice, MAX_VOICES>,
    sequencer: Sequencer,
    /// Right shift applied to the voice sum.
    output_shift: u8,
}

impl Engine {
    /// Create an engine with `config.voice_count` pulse voices. The
    /// configuration is expected to be validated.
    pub fn new(config: &SynthConfig) -> Self {
        let count = config.voice_count.min(MAX_VOICES);
        Self {
            voices: (0..count).map(|_| Voice::new(WaveKind::Pulse, config.sample_rate)).collect(),
            sequencer: Sequencer::new(),
            output_shift: config.output_scale_shift,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn start_song(&mut self, song: &'static SongDefinition) {
        self.sequencer.start(song);
    }

    /// Run one sequencer tick against the voice pool.
    pub fn sequencer_tick(&mut self) {
        self.sequencer.tick(&mut self.voices);
    }

    /// Synthesize `out.len()` samples (at most half of [`MAX_BUFFER`]):
    /// sum every enabled voice, scale down, clamp, and offset to unsigned.
    pub fn render_half(&mut self, out: &mut [u8]) {
        let mut mix = [0i16; MAX_BUFFER / 2];
        let len = out.len().min(mix.len());
        let mix = &mut mix[..len];

        for voice in self.voices.iter_mut() {
            voice.render(mix);
        }

        for (sample, &sum) in out.iter_mut().zip(mix.iter()) {
            let scaled = (sum >> self.output_shift).clamp(-OUTPUT_PEAK, OUTPUT_PEAK);
            *sample = (scaled + SILENCE as i16) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ir::Instrument;

    fn engine(voices: usize, shift: u8) -> Engine {
        let config = SynthConfig::default()
            .with_voice_count(voices)
            .with_output_scale_shift(shift);
        Engine::new(&config)
    }

    #[test]
    fn silent_engine_renders_midpoint() {
        let mut engine = engine(5, 3);
        let mut out = [0u8; 8];
        engine.render_half(&mut out);
        assert_eq!(out, [SILENCE; 8]);
    }

    #[test]
    fn voice_count_follows_config() {
        assert_eq!(engine(3, 3).voices().len(), 3);
        assert_eq!(engine(MAX_VOICES, 3).voices().len(), MAX_VOICES);
    }

    #[test]
    fn single_pulse_is_scaled_and_offset() {
        let mut engine = engine(1, 3);
        engine.voice_mut(0).unwrap().set_enable(true);
        let mut out = [0u8; 8];
        engine.render_half(&mut out);
        // level 0x58 >> 3 = 11
        assert_eq!(out, [0x80 + 11; 8]);
    }

    #[test]
    fn sum_is_clamped() {
        let mut engine = engine(16, 0);
        for i in 0..16 {
            let v = engine.voice_mut(i).unwrap();
            v.set_volume(0xff);
            v.set_enable(true);
        }
        let mut out = [0u8; 8];
        engine.render_half(&mut out);
        assert_eq!(out, [0x80 + 0x7f; 8]);
    }

    #[test]
    fn voices_mix_by_summing() {
        static NOISE: Instrument = Instrument::new(tt_ir::WaveKind::Noise);
        let mut engine = engine(2, 0);
        engine.voice_mut(0).unwrap().set_volume(40);
        engine.voice_mut(0).unwrap().set_enable(true);
        engine.voice_mut(1).unwrap().set_instrument(&NOISE);
        engine.voice_mut(1).unwrap().set_volume(0);

        let mut out = [0u8; 8];
        engine.render_half(&mut out);
        assert_eq!(out, [0x80 + 20; 8]);

        engine.voice_mut(1).unwrap().set_enable(true);
        engine.render_half(&mut out);
        assert_eq!(out, [0x80 + 20; 8]);
    }
}
