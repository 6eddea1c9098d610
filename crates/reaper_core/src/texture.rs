//! Texture cache guard
//!
//! Tracks approximate graphics resource usage by key. When the number of
//! tracked resources nears the backend's limit it evicts only resources it
//! knows can be regenerated on demand (procedural fallbacks). Anything else
//! may still be referenced by a draw call, so it is never touched here.

use crate::diagnostics::{labels, DiagnosticsRecorder};
use crate::telemetry::TextureTelemetry;
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_EVICTION_RATIO: f32 = 0.8;

/// Keys of the backend's built-in fallback textures.
pub const DEFAULT_SAFE_KEYS: [&str; 4] = ["__DEFAULT", "__MISSING", "__WHITE", "__NORMAL"];
/// Prefix used for procedurally generated textures.
pub const DEFAULT_SAFE_PREFIXES: [&str; 1] = ["generated/"];

/// The statically-known set of regenerable resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeResources {
    pub keys: Vec<String>,
    pub prefixes: Vec<String>,
}

impl SafeResources {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
            || self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

impl Default for SafeResources {
    fn default() -> Self {
        Self {
            keys: DEFAULT_SAFE_KEYS.iter().map(|k| k.to_string()).collect(),
            prefixes: DEFAULT_SAFE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub struct TextureCacheGuard {
    diagnostics: DiagnosticsRecorder,
    safe: SafeResources,
    eviction_ratio: f32,
    resources: BTreeMap<String, u64>,
}

impl TextureCacheGuard {
    pub fn new(diagnostics: DiagnosticsRecorder) -> Self {
        Self::with_safe_set(diagnostics, SafeResources::default(), DEFAULT_EVICTION_RATIO)
    }

    pub fn with_safe_set(
        diagnostics: DiagnosticsRecorder,
        safe: SafeResources,
        eviction_ratio: f32,
    ) -> Self {
        Self {
            diagnostics,
            safe,
            eviction_ratio,
            resources: BTreeMap::new(),
        }
    }

    /// Records (or re-sizes) a resource estimate.
    pub fn track_resource(&mut self, key: impl Into<String>, approx_size: u64) {
        self.resources.insert(key.into(), approx_size);
    }

    /// Forgets a resource its owner released.
    pub fn release_resource(&mut self, key: &str) -> bool {
        self.resources.remove(key).is_some()
    }

    pub fn current_usage_estimate(&self) -> u64 {
        self.resources.values().sum()
    }

    pub fn tracked(&self) -> usize {
        self.resources.len()
    }

    pub fn is_safe(&self, key: &str) -> bool {
        self.safe.contains(key)
    }

    /// When more than `eviction_ratio * max_units` resources are tracked,
    /// drops every tracked safe resource and returns their keys so the caller
    /// can release them in the backend.
    pub fn check_and_evict(&mut self, max_units: u32) -> Vec<String> {
        let threshold = self.eviction_ratio as f64 * max_units as f64;
        if (self.resources.len() as f64) <= threshold {
            return Vec::new();
        }

        let evicted: Vec<String> = self
            .resources
            .keys()
            .filter(|key| self.safe.contains(key))
            .cloned()
            .collect();
        let freed: u64 = evicted
            .iter()
            .filter_map(|key| self.resources.remove(key))
            .sum();

        if evicted.is_empty() {
            tracing::warn!(
                tracked = self.resources.len(),
                max_units,
                "texture usage near limit but nothing is safe to evict"
            );
        } else {
            tracing::info!(
                evicted = evicted.len(),
                freed_bytes = freed,
                remaining = self.resources.len(),
                max_units,
                "evicted fallback textures"
            );
            self.diagnostics.record(
                labels::TEXTURE_EVICTED,
                json!({
                    "evicted": evicted.len(),
                    "freed_bytes": freed,
                    "remaining": self.resources.len(),
                    "max_units": max_units,
                }),
            );
        }
        evicted
    }

    /// One sampling tick: no-op when the backend limit is unknown.
    pub fn sample(&mut self, telemetry: &dyn TextureTelemetry) -> Vec<String> {
        match telemetry.max_texture_units() {
            Some(max_units) => self.check_and_evict(max_units),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FixedTextures, Unavailable};
    use crate::time::ManualClock;

    fn guard() -> (DiagnosticsRecorder, TextureCacheGuard) {
        let clock = ManualClock::new();
        let diagnostics = DiagnosticsRecorder::new(clock.shared());
        (diagnostics.clone(), TextureCacheGuard::new(diagnostics))
    }

    #[test]
    fn below_threshold_nothing_is_evicted() {
        let (_diagnostics, mut guard) = guard();
        for i in 0..12 {
            guard.track_resource(format!("generated/tile-{i}"), 1024);
        }
        // 12 <= 0.8 * 16
        assert!(guard.check_and_evict(16).is_empty());
        assert_eq!(guard.tracked(), 12);
    }

    #[test]
    fn only_safe_resources_are_evicted() {
        let (diagnostics, mut guard) = guard();
        guard.track_resource("__MISSING", 64);
        guard.track_resource("generated/ring-glow", 4096);
        for i in 0..15 {
            guard.track_resource(format!("atlas/world-{i}"), 1 << 20);
        }

        let evicted = guard.check_and_evict(16);
        assert_eq!(evicted, vec!["__MISSING".to_string(), "generated/ring-glow".to_string()]);
        assert_eq!(guard.tracked(), 15);
        assert_eq!(guard.current_usage_estimate(), 15 << 20);
        assert_eq!(diagnostics.count_of(labels::TEXTURE_EVICTED), 1);
    }

    #[test]
    fn unavailable_backend_is_a_no_op() {
        let (_diagnostics, mut guard) = guard();
        for i in 0..40 {
            guard.track_resource(format!("generated/{i}"), 1);
        }
        assert!(guard.sample(&Unavailable).is_empty());
        assert_eq!(guard.sample(&FixedTextures(Some(16))).len(), 40);
    }

    #[test]
    fn release_forgets_resource() {
        let (_diagnostics, mut guard) = guard();
        guard.track_resource("atlas/ui", 10);
        guard.track_resource("atlas/ui", 30);
        assert_eq!(guard.current_usage_estimate(), 30);
        assert!(guard.release_resource("atlas/ui"));
        assert!(!guard.release_resource("atlas/ui"));
        assert_eq!(guard.current_usage_estimate(), 0);
    }
}
