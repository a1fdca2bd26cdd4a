//! Allocation-free real-time path tests.
//!
//! These tests verify that `Scheduler::on_sample()` never allocates, across
//! buffer refills, sequencer ticks and pattern changes.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use tt_engine::{Hardware, Scheduler, SynthConfig, MAX_BUFFER, MAX_VOICES};
use tt_master::demo_song;

/// Keeps the last sample so the writes are not optimized out.
struct Register(u8);

impl Hardware for Register {
    fn write_sample(&mut self, sample: u8) {
        self.0 = sample;
    }
}

/// Drive a scheduler for `samples` periods, aborting on any heap allocation.
fn assert_playback_alloc_free(config: SynthConfig, samples: usize) {
    let sched = Scheduler::new(config).unwrap();
    sched.play_song(demo_song()).unwrap();
    let mut reg = Register(0);

    assert_no_alloc(|| {
        for _ in 0..samples {
            sched.on_sample(&mut reg);
        }
    });
}

#[test]
fn default_config_alloc_free() {
    assert_playback_alloc_free(SynthConfig::default(), 33_000 * 13);
}

#[test]
fn largest_buffer_all_voices_alloc_free() {
    let config = SynthConfig::default()
        .with_buffer_size(MAX_BUFFER)
        .with_voice_count(MAX_VOICES);
    assert_playback_alloc_free(config, 33_000 * 3);
}

#[test]
fn control_calls_alloc_free() {
    let sched = Scheduler::new(SynthConfig::default()).unwrap();
    sched.play_song(demo_song()).unwrap();
    let mut reg = Register(0);

    assert_no_alloc(|| {
        for i in 0..10_000u32 {
            sched.on_sample(&mut reg);
            if i % 100 == 0 {
                let _ = sched.set_volume(3, (i >> 4) as u8);
                let _ = sched.set_pitch(3, 200 + (i % 400) as u16);
                let _ = sched.set_enable(3, true);
                let _ = sched.position();
            }
        }
    });
}
