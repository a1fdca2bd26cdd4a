//! Ring-buffer sample sink.

use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tt_engine::Hardware;

/// Convert an unsigned 8-bit sample to a float in `[-1, 1)`.
pub fn to_f32(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 128.0
}

/// Stands in for the output compare register: every sample the scheduler
/// emits is pushed into a ring for an audio callback to drain.
pub struct RingSink {
    producer: HeapProd<u8>,
}

impl RingSink {
    /// Create a sink and the consumer end of its ring.
    pub fn with_capacity(capacity: usize) -> (Self, HeapCons<u8>) {
        let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
        (Self { producer }, consumer)
    }

    /// Push one sample, spinning until the ring has room.
    pub fn push_spin(&mut self, sample: u8) {
        while self.producer.try_push(sample).is_err() {
            std::hint::spin_loop();
        }
    }
}

impl Hardware for RingSink {
    fn write_sample(&mut self, sample: u8) {
        self.push_spin(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Observer};

    #[test]
    fn conversion_is_centred_on_midpoint() {
        assert_eq!(to_f32(0x80), 0.0);
        assert_eq!(to_f32(0x00), -1.0);
        assert!((to_f32(0xff) - 127.0 / 128.0).abs() < f32::EPSILON);
    }

    #[test]
    fn hardware_writes_reach_consumer_in_order() {
        let (mut sink, mut consumer) = RingSink::with_capacity(16);
        for s in [1u8, 2, 3] {
            sink.write_sample(s);
        }
        assert_eq!(consumer.try_pop(), Some(1));
        assert_eq!(consumer.try_pop(), Some(2));
        assert_eq!(consumer.try_pop(), Some(3));
        assert_eq!(consumer.try_pop(), None);
    }

    #[test]
    fn full_ring_holds_capacity() {
        let (mut sink, mut consumer) = RingSink::with_capacity(4);
        for s in 0..4 {
            sink.write_sample(s);
        }
        assert_eq!(consumer.occupied_len(), 4);
        assert_eq!(consumer.try_pop(), Some(0));
    }

    #[test]
    fn scheduler_drives_sink() {
        let sched = tt_engine::Scheduler::new(tt_engine::SynthConfig::default()).unwrap();
        let (mut sink, mut consumer) = RingSink::with_capacity(64);
        for _ in 0..32 {
            sched.on_sample(&mut sink);
        }
        let mut out = [0u8; 64];
        assert_eq!(consumer.pop_slice(&mut out), 32);
        assert!(out[..32].iter().all(|&s| s == tt_engine::SILENCE));
    }
}
