//! Host telemetry adapters
//!
//! Bridge the platform queries into the capability traits the lifecycle
//! manager samples.

use reaper_core::telemetry::{MemorySample, MemoryTelemetry, TextureTelemetry};

/// Live process memory via `reaper_env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMemory;

impl MemoryTelemetry for HostMemory {
    fn sample(&self) -> Option<MemorySample> {
        reaper_env::process_memory().map(|memory| MemorySample {
            used: memory.used,
            total: memory.total,
            limit: memory.limit,
        })
    }
}

/// Backend texture limit, queried once. The limit does not change while the
/// adapter lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuTextures {
    max_units: Option<u32>,
}

impl GpuTextures {
    pub fn detect() -> Self {
        Self {
            max_units: reaper_render::query_capabilities().map(|caps| caps.max_texture_units),
        }
    }

    pub fn with_limit(max_units: Option<u32>) -> Self {
        Self { max_units }
    }

    pub fn max_units(&self) -> Option<u32> {
        self.max_units
    }
}

impl TextureTelemetry for GpuTextures {
    fn max_texture_units(&self) -> Option<u32> {
        self.max_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_memory_matches_platform_availability() {
        let sample = HostMemory.sample();
        assert_eq!(sample.is_some(), reaper_env::process_memory().is_some());
        if let Some(sample) = sample {
            assert!(sample.used > 0);
            assert!(sample.limit <= sample.total);
        }
    }

    #[test]
    fn fixed_limit_passes_through() {
        assert_eq!(GpuTextures::with_limit(Some(16)).max_texture_units(), Some(16));
        assert_eq!(GpuTextures::default().max_texture_units(), None);
    }
}
