//! The per-sample callback and the control surface.
//!
//! [`Scheduler::on_sample`] is meant to be called from a periodic interrupt
//! at the configured sample rate. Each call writes one buffered sample to
//! the hardware. When the read index crosses into one half of the double
//! buffer, the call synthesizes the other half; otherwise, when enough
//! samples have passed, it runs one sequencer tick.
//!
//! The two tasks (and control calls from the main loop) are guarded by busy
//! bits, never by locks. A call that finds a bit already held skips that
//! work for this sample; the stale half of the buffer simply plays again.
//! After claiming a bit the task calls [`Hardware::reenable_interrupts`] so
//! the tick source keeps emitting samples while it computes.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use log::info;
use tt_ir::{Envelope, Instrument, SongDefinition, SongError, WaveKind};

use crate::config::{ConfigError, SynthConfig, MAX_BUFFER};
use crate::mixer::{Engine, SILENCE};
use crate::sequencer::{PlaybackPosition, SequencerFault};
use crate::voice::Voice;

const SYNTH_TASK: u8 = 1;
const SONG_TASK: u8 = 2;
const CONTROL_TASK: u8 = 4;

/// Output side of the platform.
pub trait Hardware {
    /// Write one unsigned sample to the output compare register(s).
    fn write_sample(&mut self, sample: u8);

    /// Called once a task has claimed its busy bit, before it starts work.
    /// Interrupt-driven targets re-enable the sample interrupt here.
    fn reenable_interrupts(&mut self) {}
}

/// Why a control call did not take effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlError {
    /// Synthesis, sequencing or another control call holds the engine.
    /// Nothing was changed; try again.
    Busy,
    VoiceOutOfRange { voice: usize, voice_count: usize },
    Song(SongError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Busy => write!(f, "engine is busy"),
            ControlError::VoiceOutOfRange { voice, voice_count } => {
                write!(f, "voice {} out of range (have {})", voice, voice_count)
            }
            ControlError::Song(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ControlError {}

impl From<SongError> for ControlError {
    fn from(e: SongError) -> Self {
        ControlError::Song(e)
    }
}

/// Releases a busy bit on drop.
struct TaskGuard<'a> {
    tasks: &'a AtomicU8,
    bit: u8,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.tasks.fetch_and(!self.bit, Ordering::Release);
    }
}

/// Shared synthesis context, double buffer and busy flags.
pub struct Scheduler {
    engine: UnsafeCell<Engine>,
    buffer: [AtomicU8; MAX_BUFFER],
    config: SynthConfig,
    /// Index of the next sample to emit.
    read_index: AtomicUsize,
    sample_count: AtomicU32,
    /// Samples since the last sequencer tick.
    tick_samples: AtomicU32,
    samples_per_tick: AtomicU32,
    playing: AtomicBool,
    /// Busy bits: SYNTH_TASK, SONG_TASK, CONTROL_TASK.
    tasks: AtomicU8,
}

// SAFETY: `engine` is only dereferenced while a TaskGuard is alive, and
// `claim` only hands one out when no bit is set, so there is never more
// than one `&mut Engine`. All other fields are atomics or immutable.
unsafe impl Sync for Scheduler {}

impl Scheduler {
    pub fn new(config: SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine: UnsafeCell::new(Engine::new(&config)),
            buffer: core::array::from_fn(|_| AtomicU8::new(SILENCE)),
            config,
            read_index: AtomicUsize::new(config.buffer_size - 1),
            sample_count: AtomicU32::new(0),
            tick_samples: AtomicU32::new(0),
            samples_per_tick: AtomicU32::new(u32::MAX),
            playing: AtomicBool::new(false),
            tasks: AtomicU8::new(0),
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn claim(&self, bit: u8) -> Option<TaskGuard<'_>> {
        self.tasks
            .compare_exchange(0, bit, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TaskGuard { tasks: &self.tasks, bit })
    }

    /// The per-sample callback. Never blocks.
    ///
    /// Synthesis needs the engine to itself: a sequencer tick or control
    /// call still running when a half-buffer boundary is crossed makes that
    /// fill skip, and the stale half plays again.
    pub fn on_sample<H: Hardware + ?Sized>(&self, hw: &mut H) {
        let size = self.config.buffer_size;
        let half = self.config.half_buffer();

        let index = self.read_index.load(Ordering::Relaxed);
        hw.write_sample(self.buffer[index].load(Ordering::Acquire));
        let next = if index + 1 >= size { 0 } else { index + 1 };
        self.read_index.store(next, Ordering::Relaxed);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        self.tick_samples.fetch_add(1, Ordering::Relaxed);

        let stale = if next == 0 {
            Some(half)
        } else if next == half {
            Some(0)
        } else {
            None
        };

        if let Some(start) = stale {
            if let Some(_synth) = self.claim(SYNTH_TASK) {
                hw.reenable_interrupts();
                // SAFETY: SYNTH_TASK is held.
                let engine = unsafe { &mut *self.engine.get() };
                let mut block = [SILENCE; MAX_BUFFER / 2];
                engine.render_half(&mut block[..half]);
                for (slot, &sample) in self.buffer[start..start + half].iter().zip(block.iter()) {
                    slot.store(sample, Ordering::Release);
                }
                return;
            }
        }

        if self.playing.load(Ordering::Acquire)
            && self.tick_samples.load(Ordering::Relaxed)
                > self.samples_per_tick.load(Ordering::Relaxed)
        {
            if let Some(_song) = self.claim(SONG_TASK) {
                hw.reenable_interrupts();
                self.tick_samples.store(0, Ordering::Relaxed);
                // SAFETY: SONG_TASK is held.
                let engine = unsafe { &mut *self.engine.get() };
                engine.sequencer_tick();
            }
        }
    }

    /// Run `f` with exclusive access to the engine, or fail with
    /// [`ControlError::Busy`] if a task holds it.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> Result<R, ControlError> {
        let _control = self.claim(CONTROL_TASK).ok_or(ControlError::Busy)?;
        // SAFETY: CONTROL_TASK is held.
        let engine = unsafe { &mut *self.engine.get() };
        Ok(f(engine))
    }

    pub fn with_voice<R>(
        &self,
        voice: usize,
        f: impl FnOnce(&mut Voice) -> R,
    ) -> Result<R, ControlError> {
        self.with_engine(|engine| {
            let voice_count = engine.voices().len();
            engine
                .voice_mut(voice)
                .map(f)
                .ok_or(ControlError::VoiceOutOfRange { voice, voice_count })
        })?
    }

    /// Re-initialize a voice with a new waveform.
    pub fn set_wave_kind(&self, voice: usize, kind: WaveKind) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.reinit(kind))
    }

    pub fn set_volume(&self, voice: usize, volume: u8) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_volume(volume))
    }

    pub fn set_duty(&self, voice: usize, duty: u8) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_duty(duty))
    }

    pub fn set_pitch(&self, voice: usize, hz: u16) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_pitch(hz))
    }

    pub fn set_enable(&self, voice: usize, enable: bool) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_enable(enable))
    }

    pub fn set_bit_crunch(&self, voice: usize, crunch: u8) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_bit_crunch(crunch))
    }

    pub fn set_envelope(
        &self,
        voice: usize,
        envelope: Option<&'static Envelope>,
    ) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_envelope(envelope))
    }

    pub fn set_instrument(
        &self,
        voice: usize,
        instrument: &Instrument,
    ) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_instrument(instrument))
    }

    pub fn set_glide_rate(&self, voice: usize, rate: u16) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_glide_rate(rate))
    }

    pub fn set_glide_enable(&self, voice: usize, enable: bool) -> Result<(), ControlError> {
        self.with_voice(voice, |v| v.set_glide(enable))
    }

    /// Validate `song`, rewind the sequencer to its start and begin playing.
    pub fn play_song(&self, song: &'static SongDefinition) -> Result<(), ControlError> {
        song.validate()?;
        let samples_per_tick = song.samples_per_tick(self.config.sample_rate)?;
        self.with_engine(|engine| engine.start_song(song))?;
        self.samples_per_tick.store(samples_per_tick, Ordering::Relaxed);
        self.tick_samples.store(0, Ordering::Relaxed);
        self.playing.store(true, Ordering::Release);
        info!(
            "playing \"{}\": {} samples per tick at {} Hz",
            song.title, samples_per_tick, self.config.sample_rate
        );
        Ok(())
    }

    /// Stop sequencing. Voices keep their current state.
    pub fn stop(&self) {
        if self.playing.swap(false, Ordering::AcqRel) {
            info!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Samples emitted since start (wraps).
    pub fn sample_count(&self) -> u32 {
        self.sample_count.load(Ordering::Relaxed)
    }

    /// Spin until `ms` milliseconds of samples have been emitted. Only
    /// returns if something else keeps calling [`on_sample`](Self::on_sample).
    pub fn wait_ms(&self, ms: u32) {
        let samples = (self.config.sample_rate / 1000).saturating_mul(ms);
        let start = self.sample_count();
        while self.sample_count().wrapping_sub(start) < samples {
            core::hint::spin_loop();
        }
    }

    pub fn position(&self) -> Result<PlaybackPosition, ControlError> {
        self.with_engine(|engine| engine.sequencer().position())
    }

    pub fn fault_count(&self) -> Result<u32, ControlError> {
        self.with_engine(|engine| engine.sequencer().fault_count())
    }

    pub fn last_fault(&self) -> Result<Option<SequencerFault>, ControlError> {
        self.with_engine(|engine| engine.sequencer().last_fault())
    }
}
