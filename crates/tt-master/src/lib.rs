//! Headless controller for tinytune.
//!
//! Provides one API for choosing a song, real-time playback and offline
//! rendering that the CLI and tests share.

mod demo;
mod wav;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use tt_audio::{AudioOutput, CpalOutput};
use tt_engine::{Hardware, Scheduler, SILENCE};

// Re-export common types so callers don't need tt-ir/tt-engine directly.
pub use tt_engine::{ConfigError, ControlError, PlaybackPosition, SequencerFault, SynthConfig};
pub use tt_ir::{analyze, SongDefinition, SongError, SongFeatures};

pub use demo::demo_song;
pub use wav::{samples_to_wav, write_wav};

/// Why an offline render could not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    Config(ConfigError),
    Control(ControlError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Config(e) => write!(f, "invalid config: {}", e),
            RenderError::Control(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<ConfigError> for RenderError {
    fn from(e: ConfigError) -> Self {
        RenderError::Config(e)
    }
}

impl From<ControlError> for RenderError {
    fn from(e: ControlError) -> Self {
        RenderError::Control(e)
    }
}

/// How many times `position` retries while the engine is busy.
const POSITION_RETRIES: usize = 64;

/// Headless controller: owns a song choice and manages playback.
pub struct Controller {
    config: SynthConfig,
    song: &'static SongDefinition,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    scheduler: Arc<OnceLock<Scheduler>>,
    thread: Option<JoinHandle<()>>,
}

/// Collects every sample the scheduler writes.
struct Capture(Vec<u8>);

impl Hardware for Capture {
    fn write_sample(&mut self, sample: u8) {
        self.0.push(sample);
    }
}

impl Controller {
    /// Create a controller with the demo song selected. The sample rate in
    /// `config` is used for offline rendering; real-time playback runs at
    /// the device rate.
    pub fn new(config: SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            song: demo_song(),
            playback: None,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    // --- Song management ---

    pub fn song(&self) -> &'static SongDefinition {
        self.song
    }

    pub fn set_song(&mut self, song: &'static SongDefinition) -> Result<(), SongError> {
        song.validate()?;
        self.stop();
        self.song = song;
        Ok(())
    }

    // --- Real-time playback ---

    pub fn play(&mut self) -> Result<(), SongError> {
        self.song.validate()?;
        self.stop();

        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let scheduler = Arc::new(OnceLock::new());

        let stop = stop_signal.clone();
        let done = finished.clone();
        let shared = scheduler.clone();
        let config = self.config;
        let song = self.song;

        let thread = std::thread::spawn(move || {
            audio_thread(config, song, shared, stop);
            done.store(true, Ordering::Relaxed);
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            finished,
            scheduler,
            thread: Some(thread),
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
            log::debug!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    /// Where real-time playback is, or `None` when nothing is playing.
    pub fn position(&self) -> Option<PlaybackPosition> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        let scheduler = pb.scheduler.get()?;
        for _ in 0..POSITION_RETRIES {
            match scheduler.position() {
                Ok(pos) => return Some(pos),
                Err(ControlError::Busy) => std::thread::yield_now(),
                Err(_) => return None,
            }
        }
        None
    }

    // --- Offline rendering ---

    /// Run the scheduler for `count` sample periods and return what it
    /// wrote. Output starts half a buffer late, exactly as on hardware.
    pub fn render_samples(&self, count: usize) -> Result<Vec<u8>, RenderError> {
        let scheduler = Scheduler::new(self.config)?;
        scheduler.play_song(self.song)?;

        let mut capture = Capture(Vec::with_capacity(count));
        for _ in 0..count {
            scheduler.on_sample(&mut capture);
        }
        if let Ok(faults) = scheduler.fault_count() {
            if faults > 0 {
                log::warn!("{} sequencer faults while rendering {}", faults, self.song.title);
            }
        }
        Ok(capture.0)
    }

    pub fn render_to_wav(&self, seconds: u32) -> Result<Vec<u8>, RenderError> {
        let count = self.config.sample_rate as usize * seconds as usize;
        let samples = self.render_samples(count)?;
        Ok(wav::samples_to_wav(&samples, self.config.sample_rate))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(
    config: SynthConfig,
    song: &'static SongDefinition,
    shared: Arc<OnceLock<Scheduler>>,
    stop_signal: Arc<AtomicBool>,
) {
    let (mut output, consumer) = match CpalOutput::new() {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };

    let sample_rate = output.sample_rate();
    let scheduler = match Scheduler::new(config.with_sample_rate(sample_rate)) {
        Ok(s) => s,
        Err(e) => {
            log::error!("device rate unusable: {}", e);
            return;
        }
    };
    if let Err(e) = scheduler.play_song(song) {
        log::error!("{}", e);
        return;
    }
    let scheduler = shared.get_or_init(|| scheduler);

    if let Err(e) = output.build_stream(consumer).and_then(|()| output.start()) {
        log::error!("{}", e);
        return;
    }
    log::info!("playing {} at {} Hz", song.title, sample_rate);

    while !stop_signal.load(Ordering::Relaxed) {
        scheduler.on_sample(&mut output);
    }

    scheduler.stop();
    for _ in 0..sample_rate / 10 {
        output.write_sample(SILENCE);
    }
    let _ = output.stop();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(SynthConfig::default()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        assert!(Controller::new(SynthConfig::default().with_voice_count(0)).is_err());
    }

    #[test]
    fn render_samples_returns_requested_count() {
        let samples = controller().render_samples(1000).unwrap();
        assert_eq!(samples.len(), 1000);
        // First half buffer is the initial silence
        assert!(samples[..8].iter().all(|&s| s == SILENCE));
        assert!(samples.iter().any(|&s| s != SILENCE));
    }

    #[test]
    fn render_is_deterministic() {
        let c = controller();
        assert_eq!(c.render_samples(5000).unwrap(), c.render_samples(5000).unwrap());
    }

    #[test]
    fn render_to_wav_has_header_and_samples() {
        let wav = controller().render_to_wav(1).unwrap();
        assert_eq!(wav.len(), 44 + 33000);
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn idle_controller_has_no_position() {
        let c = controller();
        assert!(!c.is_playing());
        assert_eq!(c.position(), None);
    }

    #[test]
    fn set_song_rejects_invalid_song() {
        static BROKEN: SongDefinition = SongDefinition {
            title: "broken",
            patterns: &[],
            order: &[],
            bpm: 120,
            rows_per_beat: 4,
            ticks_per_row: 6,
            instruments: &[],
        };
        let mut c = controller();
        assert_eq!(c.set_song(&BROKEN), Err(SongError::EmptyOrder));
        assert_eq!(c.song().title, "Luna");
    }
}
