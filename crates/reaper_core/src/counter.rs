//! Resource counter
//!
//! Per-category tallies plus a bounded, time-ordered log of recent creations.
//! Pure in-memory bookkeeping; unknown labels are rejected earlier by
//! `Category::from_str`, so everything here is infallible.

use crate::category::Category;
use crate::diagnostics::{labels, DiagnosticsRecorder};
use crate::time::SharedClock;
use glam::Vec2;
use reaper_metrics::{Counter, Decrement, RingBuffer};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_CREATION_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreationEvent {
    pub category: Category,
    pub timestamp: Duration,
    pub position: Option<Vec2>,
}

pub struct ResourceCounter {
    clock: SharedClock,
    diagnostics: DiagnosticsRecorder,
    tallies: Counter<Category>,
    creations: RingBuffer<CreationEvent>,
}

impl ResourceCounter {
    pub fn new(clock: SharedClock, diagnostics: DiagnosticsRecorder) -> Self {
        Self::with_log_capacity(clock, diagnostics, DEFAULT_CREATION_LOG_CAPACITY)
    }

    pub fn with_log_capacity(
        clock: SharedClock,
        diagnostics: DiagnosticsRecorder,
        capacity: usize,
    ) -> Self {
        Self {
            clock,
            diagnostics,
            tallies: Counter::new(),
            creations: RingBuffer::new(capacity),
        }
    }

    pub fn track(&mut self, category: Category, position: Option<Vec2>) {
        let count = self.tallies.increment(&category, 1);
        self.creations.push(CreationEvent {
            category,
            timestamp: self.clock.now(),
            position,
        });
        tracing::trace!(%category, count, "tracked");
    }

    /// Decrements the tally. At zero the count stays at zero and the drift is
    /// recorded as a `counter.underflow` observation.
    pub fn untrack(&mut self, category: Category) {
        if let Decrement::Clamped = self.tallies.decrement(&category) {
            tracing::warn!(%category, "untrack on empty category; clamped at zero");
            self.diagnostics.record(
                labels::COUNTER_UNDERFLOW,
                json!({ "category": category.as_str() }),
            );
        }
    }

    pub fn count_of(&self, category: Category) -> usize {
        self.tallies.get(&category)
    }

    pub fn total(&self) -> usize {
        self.tallies.total()
    }

    pub fn counts(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.tallies.iter().map(|(category, count)| (*category, *count))
    }

    /// Creation-log entries with `timestamp > now - window`, oldest first.
    pub fn recently_created(&self, window: Duration) -> Vec<CreationEvent> {
        let now = self.clock.now();
        self.creations
            .iter()
            .filter(|event| now.saturating_sub(event.timestamp) < window)
            .copied()
            .collect()
    }

    pub fn creation_log_len(&self) -> usize {
        self.creations.len()
    }
}
