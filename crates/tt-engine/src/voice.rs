//! Voice: one oscillator with its envelope, volume, glide and crunch state.

use core::ptr;

use tt_ir::{Envelope, Instrument, WaveKind};

use crate::envelope_state::EnvelopeState;
use crate::glide::Glide;
use crate::oscillator::{Oscillator, Tone, DUTY_MIDPOINT};

pub const DEFAULT_VOLUME: u8 = 0xb0;
pub const DEFAULT_PITCH: u16 = 440;

/// A voice whose envelope has ended is switched off below this level.
pub const AUDIBLE_FLOOR: i16 = 5;

/// Largest bit-crunch amount; keeps the sign bit of the 8-bit output.
const MAX_CRUNCH: u8 = 7;

/// A single sound-generating channel.
#[derive(Clone, Debug)]
pub struct Voice {
    osc: Oscillator,
    /// Current pitch in Hz.
    hz: u16,
    /// Volume ceiling set by the user or pattern (0-255).
    volume: u8,
    /// Post-envelope amplitude handed to the oscillator (0-127).
    level: i16,
    enabled: bool,
    glide: Glide,
    crunch_mask: i16,
    /// Oscillator phase accumulator.
    phase: u32,
    sample_rate: u32,
    envelope: Option<&'static Envelope>,
    env: EnvelopeState,
}

impl Voice {
    pub fn new(kind: WaveKind, sample_rate: u32) -> Self {
        let mut voice = Self {
            osc: Oscillator::new(kind),
            hz: DEFAULT_PITCH,
            volume: DEFAULT_VOLUME,
            level: 0,
            enabled: false,
            glide: Glide::default(),
            crunch_mask: !0,
            phase: 0,
            sample_rate,
            envelope: None,
            env: EnvelopeState::default(),
        };
        voice.reinit(kind);
        voice
    }

    /// Switch waveform and return to the defaults: disabled, phase 0,
    /// midpoint duty, volume 0xB0, 440 Hz, no envelope, glide off, no crunch.
    /// The glide rate is kept; the glide target follows the reset pitch.
    pub fn reinit(&mut self, kind: WaveKind) {
        self.osc = Oscillator::new(kind);
        self.enabled = false;
        self.phase = 0;
        self.envelope = None;
        self.env = EnvelopeState::default();
        self.glide.reset();
        self.glide.set_target(DEFAULT_PITCH);
        self.crunch_mask = !0;
        self.hz = DEFAULT_PITCH;
        self.set_volume(DEFAULT_VOLUME);
        self.set_duty(DUTY_MIDPOINT);
        self.apply_pitch(DEFAULT_PITCH);
    }

    pub fn kind(&self) -> WaveKind {
        self.osc.kind()
    }

    pub fn hz(&self) -> u16 {
        self.hz
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Amplitude after the envelope is applied.
    pub fn level(&self) -> i16 {
        self.level
    }

    pub fn duty(&self) -> u8 {
        self.osc.duty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_gliding(&self) -> bool {
        self.glide.is_enabled()
    }

    pub fn glide(&self) -> &Glide {
        &self.glide
    }

    pub fn envelope(&self) -> Option<&'static Envelope> {
        self.envelope
    }

    pub fn envelope_state(&self) -> &EnvelopeState {
        &self.env
    }

    pub fn crunch_mask(&self) -> i16 {
        self.crunch_mask
    }

    fn tone(&self) -> Tone {
        Tone {
            hz: self.hz,
            level: self.level,
            sample_rate: self.sample_rate,
            crunch_mask: self.crunch_mask,
        }
    }

    pub fn set_duty(&mut self, duty: u8) {
        let tone = self.tone();
        self.osc.set_duty(duty, &tone);
    }

    /// Set the pitch in Hz, or only the glide target while gliding. A pitch
    /// set without glide is also the new target, so a later glide has
    /// nowhere stale to head for.
    pub fn set_pitch(&mut self, hz: u16) {
        let hz = self.clamp_pitch(hz);
        self.glide.set_target(hz);
        if !self.glide.is_enabled() {
            self.apply_pitch(hz);
        }
    }

    fn clamp_pitch(&self, hz: u16) -> u16 {
        let nyquist = (self.sample_rate / 2).clamp(1, u16::MAX as u32) as u16;
        hz.clamp(1, nyquist)
    }

    fn apply_pitch(&mut self, hz: u16) {
        self.hz = self.clamp_pitch(hz);
        let tone = self.tone();
        self.osc.update(&tone);
    }

    /// Set the volume ceiling. With an envelope attached the audible level
    /// is the envelope level scaled by this volume.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        let half = (volume >> 1) as i32;
        self.level = match self.envelope {
            Some(_) => (((self.env.level() >> 7) as i32 * half) >> 8) as i16,
            None => half as i16,
        };
        let tone = self.tone();
        self.osc.update(&tone);
    }

    /// Note on/off. With an envelope and no glide in progress, enabling
    /// restarts the envelope and disabling releases it; the voice then stays
    /// audible until the envelope fades.
    pub fn set_enable(&mut self, enable: bool) {
        match self.envelope {
            Some(env) if !self.glide.is_enabled() => {
                if enable {
                    self.enabled = true;
                    self.env.restart(env);
                    self.set_volume(self.volume);
                } else if self.env.is_finished(env) {
                    self.enabled = false;
                } else {
                    self.env.release(env);
                }
            }
            _ => self.enabled = enable,
        }
    }

    /// Drop the low `crunch` bits of triangle output (0 disables).
    pub fn set_bit_crunch(&mut self, crunch: u8) {
        self.crunch_mask = match crunch {
            0 => !0,
            n => -1i16 << n.min(MAX_CRUNCH),
        };
    }

    pub fn set_glide_rate(&mut self, rate: u16) {
        self.glide.set_rate(rate);
    }

    /// Turn glide on or off. The target is kept, so re-enabling on a later
    /// row carries on toward the last pitch set.
    pub fn set_glide(&mut self, enable: bool) {
        self.glide.set_enabled(enable);
    }

    /// Attach an envelope. Attaching a different envelope restarts it;
    /// re-attaching the same one does nothing. `None` detaches.
    pub fn set_envelope(&mut self, envelope: Option<&'static Envelope>) {
        match envelope {
            Some(env) => {
                if self.envelope.is_some_and(|cur| ptr::eq(cur, env)) {
                    return;
                }
                self.envelope = Some(env);
                self.env.restart(env);
            }
            None => self.envelope = None,
        }
        self.set_volume(self.volume);
    }

    /// Reconfigure from an instrument: waveform, envelope, duty, crunch.
    pub fn set_instrument(&mut self, instrument: &Instrument) {
        self.reinit(instrument.kind);
        if instrument.envelope.is_some() {
            self.set_envelope(instrument.envelope);
        }
        self.set_duty(instrument.duty);
        self.set_bit_crunch(instrument.bit_crunch);
    }

    /// One sequencer tick: glide, then envelope.
    pub fn tick(&mut self) {
        if let Some(hz) = self.glide.step(self.hz) {
            self.apply_pitch(hz);
        }

        let Some(env) = self.envelope else {
            return;
        };
        if !self.enabled {
            return;
        }
        if !self.env.is_finished(env) {
            if self.env.advance(env) {
                self.set_volume(self.volume);
            }
        } else if self.level < AUDIBLE_FLOOR {
            self.enabled = false;
        }
    }

    /// Add this voice's next `out.len()` samples into `out`. Disabled
    /// voices add nothing.
    pub fn render(&mut self, out: &mut [i16]) {
        if !self.enabled {
            return;
        }
        let tone = self.tone();
        self.osc.render(&tone, &mut self.phase, out);
    }
}
