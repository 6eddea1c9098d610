//! Host capabilities the subsystem samples
//!
//! Both are best-effort: `None` means the host cannot tell us, and the
//! sampling tick that asked simply does nothing.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

impl MemorySample {
    /// `used / limit`; `None` when the limit is unknown (zero).
    pub fn usage_ratio(&self) -> Option<f64> {
        (self.limit > 0).then(|| self.used as f64 / self.limit as f64)
    }
}

pub trait MemoryTelemetry {
    fn sample(&self) -> Option<MemorySample>;
}

pub trait TextureTelemetry {
    /// Maximum textures the backend can bind at once.
    fn max_texture_units(&self) -> Option<u32>;
}

/// Reports nothing, for hosts without the capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl MemoryTelemetry for Unavailable {
    fn sample(&self) -> Option<MemorySample> {
        None
    }
}

impl TextureTelemetry for Unavailable {
    fn max_texture_units(&self) -> Option<u32> {
        None
    }
}

/// Adjustable memory reading. Clones share the reading.
#[derive(Debug, Clone, Default)]
pub struct FixedMemory {
    sample: Rc<Cell<Option<MemorySample>>>,
}

impl FixedMemory {
    pub fn new(sample: Option<MemorySample>) -> Self {
        Self {
            sample: Rc::new(Cell::new(sample)),
        }
    }

    /// `used` bytes out of a 1 GiB limit, so `ratio` maps straight to usage.
    pub fn at_ratio(ratio: f64) -> Self {
        let fixed = Self::default();
        fixed.set_ratio(ratio);
        fixed
    }

    pub fn set_ratio(&self, ratio: f64) {
        const LIMIT: u64 = 1 << 30;
        self.sample.set(Some(MemorySample {
            used: (LIMIT as f64 * ratio) as u64,
            total: LIMIT,
            limit: LIMIT,
        }));
    }

    pub fn set(&self, sample: Option<MemorySample>) {
        self.sample.set(sample);
    }
}

impl MemoryTelemetry for FixedMemory {
    fn sample(&self) -> Option<MemorySample> {
        self.sample.get()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedTextures(pub Option<u32>);

impl TextureTelemetry for FixedTextures {
    fn max_texture_units(&self) -> Option<u32> {
        self.0
    }
}
