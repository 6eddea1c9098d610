//! Lifecycle configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::policy::{Floors, Policy};
use crate::presets::{PresetCatalog, PresetName};
use crate::pressure::PressureConfig;
use crate::texture::{
    SafeResources, DEFAULT_EVICTION_RATIO, DEFAULT_SAFE_KEYS, DEFAULT_SAFE_PREFIXES,
};
use crate::{counter, diagnostics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub default_preset: PresetName,
    pub creation_log_capacity: usize,
    pub pressure: PressureConfig,
    pub texture: TextureConfig,
    pub diagnostics: DiagnosticsConfig,
    pub floors: Floors,
    /// Replace built-in preset snapshots by name.
    pub preset_overrides: BTreeMap<PresetName, Policy>,
}

impl LifecycleConfig {
    pub fn catalog(&self) -> PresetCatalog {
        self.preset_overrides
            .iter()
            .fold(PresetCatalog::builtin(), |catalog, (name, policy)| {
                catalog.with_preset(*name, policy.clone())
            })
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_preset: PresetName::Baseline,
            creation_log_capacity: counter::DEFAULT_CREATION_LOG_CAPACITY,
            pressure: PressureConfig::default(),
            texture: TextureConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            floors: Floors::default(),
            preset_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub sample_interval_ms: u64,
    /// Fraction of the backend's texture units at which eviction starts.
    pub eviction_ratio: f32,
    pub safe_keys: Vec<String>,
    pub safe_prefixes: Vec<String>,
}

impl TextureConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn safe_resources(&self) -> SafeResources {
        SafeResources {
            keys: self.safe_keys.clone(),
            prefixes: self.safe_prefixes.clone(),
        }
    }
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 10_000,
            eviction_ratio: DEFAULT_EVICTION_RATIO,
            safe_keys: DEFAULT_SAFE_KEYS.iter().map(|k| k.to_string()).collect(),
            safe_prefixes: DEFAULT_SAFE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub capacity: usize,
    /// A label seen more than this many times in the window is concerning.
    pub pattern_threshold: usize,
    pub pattern_window_ms: u64,
}

impl DiagnosticsConfig {
    pub fn pattern_window(&self) -> Duration {
        Duration::from_millis(self.pattern_window_ms)
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            capacity: diagnostics::DEFAULT_CAPACITY,
            pattern_threshold: diagnostics::DEFAULT_PATTERN_THRESHOLD,
            pattern_window_ms: 60_000,
        }
    }
}
