//! Integration test: built-in song → scheduler → sample stream.

use tt_engine::{Hardware, Scheduler, SynthConfig, SILENCE};
use tt_master::{analyze, demo_song, Controller};

struct Capture(Vec<u8>);

impl Hardware for Capture {
    fn write_sample(&mut self, sample: u8) {
        self.0.push(sample);
    }
}

fn playing_scheduler(config: SynthConfig) -> Scheduler {
    let sched = Scheduler::new(config).unwrap();
    sched.play_song(demo_song()).unwrap();
    sched
}

#[test]
fn demo_renders_nonsilent() {
    let samples = Controller::new(SynthConfig::default())
        .unwrap()
        .render_samples(33_000)
        .unwrap();
    let loud = samples.iter().filter(|&&s| s != SILENCE).count();
    assert!(loud > 10_000, "only {} non-silent samples", loud);
}

#[test]
fn output_never_reaches_zero() {
    // The mix is clamped to +-0x7f around the midpoint.
    let samples = Controller::new(SynthConfig::default().with_output_scale_shift(0))
        .unwrap()
        .render_samples(66_000)
        .unwrap();
    assert!(samples.iter().all(|&s| s >= 1));
    assert!(samples.iter().any(|&s| s == 1 || s == 0xff), "expected clipping with no output shift");
}

#[test]
fn demo_plays_without_faults() {
    let sched = playing_scheduler(SynthConfig::default());
    let mut out = Capture(Vec::new());
    for _ in 0..33_000 * 3 {
        sched.on_sample(&mut out);
    }
    assert_eq!(sched.fault_count(), Ok(0));
    assert_eq!(sched.last_fault(), Ok(None));
}

#[test]
fn order_list_loops_back_to_start() {
    let sched = playing_scheduler(SynthConfig::default());
    let ticks = analyze(demo_song()).ticks_per_loop;
    assert_eq!(ticks, 256 * 12);

    let mut out = Capture(Vec::new());
    let mut highest = 0;
    let mut wrapped = false;
    // A tick needs at most samples_per_tick + 2 samples.
    let budget = (ticks as usize + 4) * (130 + 2);
    for _ in 0..budget {
        sched.on_sample(&mut out);
        let pos = sched.position().unwrap();
        highest = highest.max(pos.order_index);
        if highest == 3 && pos.order_index == 0 {
            wrapped = true;
            break;
        }
    }
    assert!(wrapped, "order index reached {} but never wrapped", highest);
}

#[test]
fn voice_count_limits_polyphony() {
    // The demo addresses voices 0-2; with two voices, voice 2 commands fault.
    let sched = playing_scheduler(SynthConfig::default().with_voice_count(2));
    let mut out = Capture(Vec::new());
    for _ in 0..33_000 {
        sched.on_sample(&mut out);
    }
    assert!(sched.fault_count().unwrap() > 0);
    assert!(out.0.iter().any(|&s| s != SILENCE));
}

#[test]
fn other_sample_rates_keep_tempo() {
    let ticks_at = |rate: u32| {
        let sched = playing_scheduler(SynthConfig::default().with_sample_rate(rate));
        let mut out = Capture(Vec::new());
        let mut ticks = 0u32;
        let mut last = sched.position().unwrap();
        for _ in 0..rate * 2 {
            sched.on_sample(&mut out);
            let pos = sched.position().unwrap();
            if pos != last {
                ticks += 1;
                last = pos;
            }
        }
        ticks
    };
    let slow = ticks_at(16_000);
    let fast = ticks_at(44_100);
    assert!(slow.abs_diff(fast) * 50 < fast, "{} vs {}", slow, fast);
}
