//! Rolling timings for named spans (eviction passes, sampling ticks)

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct SpanTimer {
    window: usize,
    spans: HashMap<&'static str, RingBuffer<Duration>>,
}

impl SpanTimer {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            spans: HashMap::new(),
        }
    }

    pub fn time<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let window = self.window;
        self.spans
            .entry(name)
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
        result
    }

    pub fn average(&self, name: &str) -> Duration {
        self.spans
            .get(name)
            .map(RingBuffer::average)
            .unwrap_or(Duration::ZERO)
    }

    pub fn max(&self, name: &str) -> Duration {
        self.spans
            .get(name)
            .map(RingBuffer::max)
            .unwrap_or(Duration::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.spans.iter().map(|(name, samples)| (*name, samples.average()))
    }
}

impl Default for SpanTimer {
    fn default() -> Self {
        Self::new(60)
    }
}
