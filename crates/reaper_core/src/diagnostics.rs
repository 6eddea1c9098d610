//! Diagnostics recorder
//!
//! Append-only ring of timestamped observations. Advisory only: nothing in the
//! lifecycle subsystem branches on what is recorded here; it exists so a human
//! can explain an anomaly after the fact.

use crate::time::SharedClock;
use reaper_metrics::RingBuffer;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// Well-known observation labels.
pub mod labels {
    pub const COUNTER_UNDERFLOW: &str = "counter.underflow";
    pub const DESTROY_FAILED: &str = "eviction.destroy_failed";
    pub const PRESSURE_ESCALATED: &str = "pressure.escalated";
    pub const POLICY_SWITCHED: &str = "policy.switched";
    pub const POLICY_SWITCH_FAILED: &str = "policy.switch_failed";
    pub const POLICY_RESTORED: &str = "policy.restored";
    pub const TEXTURE_EVICTED: &str = "texture.evicted";
}

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_PATTERN_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: Duration,
    pub label: String,
    pub data: serde_json::Value,
}

/// Per-label frequencies over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternReport {
    pub window: Duration,
    pub counts: BTreeMap<String, usize>,
    /// Labels seen more than the threshold within the window.
    pub concerning: Vec<String>,
}

struct Inner {
    ring: RingBuffer<Observation>,
    threshold: usize,
}

/// Cheap-to-clone handle; every clone writes to the same ring.
#[derive(Clone)]
pub struct DiagnosticsRecorder {
    clock: SharedClock,
    inner: Rc<RefCell<Inner>>,
}

impl DiagnosticsRecorder {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity(clock, DEFAULT_CAPACITY, DEFAULT_PATTERN_THRESHOLD)
    }

    pub fn with_capacity(clock: SharedClock, capacity: usize, threshold: usize) -> Self {
        Self {
            clock,
            inner: Rc::new(RefCell::new(Inner {
                ring: RingBuffer::new(capacity),
                threshold,
            })),
        }
    }

    pub fn record(&self, label: &str, data: serde_json::Value) {
        tracing::debug!(label, %data, "observation");
        let observation = Observation {
            timestamp: self.clock.now(),
            label: label.to_string(),
            data,
        };
        self.inner.borrow_mut().ring.push(observation);
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.borrow().ring.capacity()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().ring.clear();
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<Observation> {
        self.inner.borrow().ring.iter().cloned().collect()
    }

    pub fn count_of(&self, label: &str) -> usize {
        self.inner
            .borrow()
            .ring
            .iter()
            .filter(|observation| observation.label == label)
            .count()
    }

    pub fn analyze_patterns(&self, window: Duration) -> PatternReport {
        let now = self.clock.now();
        let since = now.saturating_sub(window);
        let inner = self.inner.borrow();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for observation in inner.ring.iter().filter(|o| o.timestamp >= since) {
            *counts.entry(observation.label.clone()).or_insert(0) += 1;
        }
        let concerning = counts
            .iter()
            .filter(|(_, &count)| count > inner.threshold)
            .map(|(label, _)| label.clone())
            .collect();

        PatternReport {
            window,
            counts,
            concerning,
        }
    }
}
