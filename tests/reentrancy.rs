//! The sample callback may be re-entered while a task is computing, the way
//! a re-enabled interrupt preempts its own handler.

use std::sync::atomic::{AtomicBool, Ordering};

use tt_engine::{ControlError, Hardware, Scheduler, SynthConfig};
use tt_master::demo_song;

/// Emits one nested sample every time a task re-enables interrupts.
struct Preempting<'a> {
    sched: &'a Scheduler,
    samples: Vec<u8>,
    nested: usize,
    busy_seen: usize,
    depth: usize,
}

impl<'a> Preempting<'a> {
    fn new(sched: &'a Scheduler) -> Self {
        Self {
            sched,
            samples: Vec::new(),
            nested: 0,
            busy_seen: 0,
            depth: 0,
        }
    }
}

impl Hardware for Preempting<'_> {
    fn write_sample(&mut self, sample: u8) {
        self.samples.push(sample);
    }

    fn reenable_interrupts(&mut self) {
        if self.depth > 0 {
            return;
        }
        self.depth += 1;
        self.nested += 1;
        let sched = self.sched;
        sched.on_sample(self);
        // The main loop cannot get in while a task runs
        if sched.set_volume(0, 0x40) == Err(ControlError::Busy) {
            self.busy_seen += 1;
        }
        self.depth -= 1;
    }
}

#[test]
fn nested_samples_are_emitted() {
    let sched = Scheduler::new(SynthConfig::default()).unwrap();
    sched.play_song(demo_song()).unwrap();
    let mut hw = Preempting::new(&sched);

    for _ in 0..20_000 {
        sched.on_sample(&mut hw);
    }

    assert!(hw.nested > 0);
    assert_eq!(hw.samples.len(), 20_000 + hw.nested);
    assert_eq!(sched.sample_count() as usize, hw.samples.len());
    assert_eq!(hw.busy_seen, hw.nested);
}

#[test]
fn nested_playback_still_advances_song() {
    let sched = Scheduler::new(SynthConfig::default()).unwrap();
    sched.play_song(demo_song()).unwrap();
    let mut hw = Preempting::new(&sched);

    for _ in 0..33_000 {
        sched.on_sample(&mut hw);
    }

    let pos = sched.position().unwrap();
    assert!(pos.order_index > 0 || pos.offset > 0);
    assert_eq!(sched.fault_count(), Ok(0));
    assert!(hw.samples.iter().any(|&s| s != tt_engine::SILENCE));
}

#[test]
fn control_from_another_thread_eventually_lands() {
    struct Null;
    impl Hardware for Null {
        fn write_sample(&mut self, _: u8) {}
    }

    let sched = Scheduler::new(SynthConfig::default()).unwrap();
    sched.play_song(demo_song()).unwrap();
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            let mut hw = Null;
            while !done.load(Ordering::Relaxed) {
                sched.on_sample(&mut hw);
            }
        });

        for voice in 0..5 {
            loop {
                match sched.set_pitch(voice, 330) {
                    Ok(()) => break,
                    Err(ControlError::Busy) => std::thread::yield_now(),
                    Err(e) => panic!("unexpected {:?}", e),
                }
            }
        }
        done.store(true, Ordering::Relaxed);
    });

    for voice in 0..5 {
        let hz = sched.with_voice(voice, |v| v.hz()).unwrap();
        // The song may have retuned the voice since
        assert!(hz > 0);
    }
}
