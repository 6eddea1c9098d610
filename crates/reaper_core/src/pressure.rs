//! Memory pressure monitor
//!
//! Each sampling tick reads process memory through [`MemoryTelemetry`]. Above
//! the high watermark it asks the [`PolicyStore`] to escalate; the store
//! handles the cooldown and the rollback, and refreshes rather than compounds
//! when the monitor fires again while still escalated.

use crate::diagnostics::{labels, DiagnosticsRecorder};
use crate::store::{Escalation, PolicyStore};
use crate::telemetry::MemoryTelemetry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// `used / limit` above which the policy is escalated.
    pub high_watermark: f64,
    /// Factor applied to distances and caps while escalated.
    pub multiplier: f32,
    pub cooldown_ms: u64,
    pub sample_interval_ms: u64,
}

impl PressureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            high_watermark: 0.75,
            multiplier: 0.5,
            cooldown_ms: 30_000,
            sample_interval_ms: 15_000,
        }
    }
}

/// Outcome of one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressureReading {
    /// Telemetry unavailable; the tick did nothing.
    Unavailable,
    Nominal { ratio: f64 },
    Escalated { ratio: f64, escalation: Escalation },
}

pub struct PressureMonitor {
    config: PressureConfig,
    diagnostics: DiagnosticsRecorder,
    escalations: u64,
    last_ratio: Option<f64>,
}

impl PressureMonitor {
    pub fn new(config: PressureConfig, diagnostics: DiagnosticsRecorder) -> Self {
        Self {
            config,
            diagnostics,
            escalations: 0,
            last_ratio: None,
        }
    }

    pub fn config(&self) -> &PressureConfig {
        &self.config
    }

    /// Number of `escalate` calls this monitor has issued.
    pub fn escalations(&self) -> u64 {
        self.escalations
    }

    pub fn last_ratio(&self) -> Option<f64> {
        self.last_ratio
    }

    pub fn sample(
        &mut self,
        telemetry: &dyn MemoryTelemetry,
        store: &mut PolicyStore,
    ) -> PressureReading {
        let Some(sample) = telemetry.sample() else {
            return PressureReading::Unavailable;
        };
        let Some(ratio) = sample.usage_ratio() else {
            return PressureReading::Unavailable;
        };
        self.last_ratio = Some(ratio);

        if ratio <= self.config.high_watermark {
            tracing::trace!(ratio, "memory pressure nominal");
            return PressureReading::Nominal { ratio };
        }

        let escalation = store.escalate(self.config.multiplier, self.config.cooldown());
        self.escalations += 1;
        tracing::warn!(
            ratio,
            watermark = self.config.high_watermark,
            used = sample.used,
            limit = sample.limit,
            ?escalation,
            "memory pressure above watermark"
        );
        self.diagnostics.record(
            labels::PRESSURE_ESCALATED,
            json!({
                "ratio": ratio,
                "used": sample.used,
                "limit": sample.limit,
                "refreshed": escalation == Escalation::Refreshed,
            }),
        );
        PressureReading::Escalated { ratio, escalation }
    }
}
