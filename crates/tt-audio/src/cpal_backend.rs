//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tt_engine::{Hardware, MAX_SAMPLE_RATE};

use crate::sink::{to_f32, RingSink};
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output. The mono sample stream is copied to every
/// device channel.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    sink: RingSink,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Create a new CPAL output with default device.
    pub fn new() -> Result<(Self, HeapCons<u8>), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config: StreamConfig = output_config(&device)?.into();

        // About 50ms of audio
        let capacity = (config.sample_rate.0 as usize / 20).max(64);
        let (sink, consumer) = RingSink::with_capacity(capacity);

        log::debug!(
            "audio device at {} Hz, {} channels, ring {}",
            config.sample_rate.0,
            config.channels,
            capacity
        );

        let output = Self {
            device,
            config,
            stream: None,
            sink,
            running: Arc::new(AtomicBool::new(false)),
        };

        Ok((output, consumer))
    }

    /// Build the audio stream. It plays silence until [`AudioOutput::start`].
    pub fn build_stream(&mut self, mut consumer: HeapCons<u8>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels.max(1) as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for chunk in data.chunks_mut(channels) {
                        let value = consumer.try_pop().map(to_f32).unwrap_or(0.0);
                        chunk.fill(value);
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

/// Preferred rate when the default config is too fast for the engine.
const FALLBACK_RATE: u32 = 48_000;

/// The device default when the engine can run at its rate, otherwise the
/// first f32 config that reaches down to [`MAX_SAMPLE_RATE`].
fn output_config(device: &Device) -> Result<SupportedStreamConfig, AudioError> {
    let default = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
    if default.sample_rate().0 <= MAX_SAMPLE_RATE {
        return Ok(default);
    }

    let ranges = device
        .supported_output_configs()
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
    for range in ranges.filter(|r| r.sample_format() == SampleFormat::F32) {
        if let Some(rate) = fit_rate(range.min_sample_rate().0, range.max_sample_rate().0) {
            log::debug!(
                "default rate {} Hz unsupported, using {} Hz",
                default.sample_rate().0,
                rate
            );
            return Ok(range.with_sample_rate(SampleRate(rate)));
        }
    }
    Err(AudioError::DeviceInit(format!(
        "device has no output config at or below {} Hz",
        MAX_SAMPLE_RATE
    )))
}

/// Pick a rate within `min..=max` the engine accepts, as close to
/// [`FALLBACK_RATE`] as the range allows.
fn fit_rate(min: u32, max: u32) -> Option<u32> {
    let max = max.min(MAX_SAMPLE_RATE);
    (min <= max).then(|| FALLBACK_RATE.clamp(min, max))
}

impl Hardware for CpalOutput {
    fn write_sample(&mut self, sample: u8) {
        self.sink.push_spin(sample);
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_rate_prefers_fallback_inside_range() {
        assert_eq!(fit_rate(8_000, 192_000), Some(48_000));
        assert_eq!(fit_rate(8_000, 22_050), Some(22_050));
        assert_eq!(fit_rate(50_000, 96_000), Some(50_000));
    }

    #[test]
    fn fit_rate_rejects_ranges_above_engine_limit() {
        assert_eq!(fit_rate(88_200, 192_000), None);
        assert_eq!(fit_rate(96_000, 96_000), None);
        assert_eq!(fit_rate(MAX_SAMPLE_RATE, 96_000), Some(MAX_SAMPLE_RATE));
    }
}
