//! Reaper Core
//!
//! The resource lifecycle subsystem of an endless scroller:
//! - Category registry and per-category resource counter
//! - Cleanup policies, named presets and the policy store
//! - Per-frame eviction engine
//! - Memory pressure monitor with escalation and rollback
//! - Texture cache guard
//! - Diagnostics recorder
//! - Virtual time and timers
//!
//! [`LifecycleManager`] wires them together; hosts normally only talk to it.

pub mod category;
pub mod config;
pub mod counter;
pub mod diagnostics;
pub mod eviction;
pub mod manager;
pub mod policy;
pub mod presets;
pub mod pressure;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod texture;
pub mod time;

pub use glam;

pub use category::{Category, CategoryError};
pub use config::LifecycleConfig;
pub use diagnostics::{DiagnosticsRecorder, Observation, PatternReport};
pub use eviction::{CategoryPass, PassReport};
pub use manager::{LifecycleError, LifecycleManager};
pub use policy::{CategoryPolicy, Floors, Policy};
pub use presets::{PresetCatalog, PresetName};
pub use registry::{DestroyError, ObjectId, TrackedObject};
pub use store::{Escalation, PolicyError, Stage};
pub use telemetry::{MemorySample, MemoryTelemetry, TextureTelemetry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
