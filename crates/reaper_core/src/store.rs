//! Policy store
//!
//! Holds the active [`Policy`] behind an `Arc` and swaps it wholesale, so a
//! reader that grabbed [`PolicyStore::current`] keeps a consistent snapshot
//! for as long as it needs it. Escalation installs a scaled-down policy under
//! [`Stage::Emergency`] and schedules its own rollback on a [`Timers`] queue
//! that the owner drives through [`PolicyStore::poll`].

use crate::diagnostics::{labels, DiagnosticsRecorder};
use crate::policy::{Floors, Policy};
use crate::presets::{PresetCatalog, PresetName};
use crate::time::{SharedClock, TimerHandle, Timers};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown preset '{name}'")]
    UnknownPreset { name: String },
}

/// What the active policy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preset(PresetName),
    /// Installed by pressure escalation; cannot be activated by name.
    Emergency,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preset(name) => name.as_str(),
            Stage::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an `escalate` call was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// A preset was active; it was captured as the restore target.
    Started,
    /// Already escalated; the cooldown restarted from now and the emergency
    /// policy was re-derived from the same restore target.
    Refreshed,
}

struct Restore {
    stage: PresetName,
    policy: Arc<Policy>,
}

pub struct PolicyStore {
    clock: SharedClock,
    diagnostics: DiagnosticsRecorder,
    catalog: PresetCatalog,
    floors: Floors,
    stage: Stage,
    current: Arc<Policy>,
    restores: Timers<Restore>,
    // Some exactly while `stage == Stage::Emergency`
    pending: Option<TimerHandle>,
}

impl PolicyStore {
    pub fn new(
        catalog: PresetCatalog,
        initial: PresetName,
        clock: SharedClock,
        diagnostics: DiagnosticsRecorder,
    ) -> Result<Self, PolicyError> {
        let current = catalog.get(initial).ok_or_else(|| PolicyError::UnknownPreset {
            name: initial.as_str().to_string(),
        })?;
        Ok(Self {
            clock,
            diagnostics,
            catalog,
            floors: Floors::default(),
            stage: Stage::Preset(initial),
            current,
            restores: Timers::new(),
            pending: None,
        })
    }

    pub fn with_floors(mut self, floors: Floors) -> Self {
        self.floors = floors;
        self
    }

    pub fn current(&self) -> (Stage, Arc<Policy>) {
        (self.stage, Arc::clone(&self.current))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn policy(&self) -> Arc<Policy> {
        Arc::clone(&self.current)
    }

    pub fn list_presets(&self) -> Vec<PresetName> {
        self.catalog.names()
    }

    pub fn is_escalated(&self) -> bool {
        self.stage == Stage::Emergency
    }

    /// Activates a preset by its external name. On error nothing changes.
    pub fn activate(&mut self, name: &str) -> Result<(), PolicyError> {
        match name.parse::<PresetName>() {
            Ok(preset) => self.activate_preset(preset),
            Err(err) => {
                self.reject(name);
                Err(err)
            }
        }
    }

    /// Swaps to the preset's snapshot and cancels any pending restore, so the
    /// explicit choice stays authoritative.
    pub fn activate_preset(&mut self, preset: PresetName) -> Result<(), PolicyError> {
        let Some(policy) = self.catalog.get(preset) else {
            self.reject(preset.as_str());
            return Err(PolicyError::UnknownPreset {
                name: preset.as_str().to_string(),
            });
        };

        if let Some(handle) = self.pending.take() {
            self.restores.cancel(handle);
            tracing::debug!(%preset, "explicit switch cancelled pending restore");
        }

        let previous = self.stage;
        self.install(Stage::Preset(preset), policy);
        tracing::info!(from = %previous, to = %preset, "policy preset activated");
        self.diagnostics.record(
            labels::POLICY_SWITCHED,
            json!({ "from": previous.as_str(), "to": preset.as_str() }),
        );
        Ok(())
    }

    /// Installs a scaled-down copy of the pre-escalation policy under
    /// `EMERGENCY` and schedules a restore `duration` from now.
    ///
    /// Repeated calls while escalated do not compound: the emergency policy
    /// is always derived from the captured pre-escalation policy, and the
    /// previous restore timer is replaced by one due `duration` from now.
    pub fn escalate(&mut self, multiplier: f32, duration: Duration) -> Escalation {
        let now = self.clock.now();
        let (outcome, restore) = match self.pending.take().and_then(|h| self.restores.take(h)) {
            Some(restore) => (Escalation::Refreshed, restore),
            None => {
                // Only a preset can be captured; Emergency always has a pending restore.
                let stage = match self.stage {
                    Stage::Preset(name) => name,
                    Stage::Emergency => PresetName::Baseline,
                };
                let restore = Restore {
                    stage,
                    policy: Arc::clone(&self.current),
                };
                (Escalation::Started, restore)
            }
        };

        let emergency = Arc::new(restore.policy.scaled(multiplier, self.floors));
        let restore_to = restore.stage;
        self.pending = Some(self.restores.schedule(now + duration, restore));
        self.install(Stage::Emergency, emergency);

        tracing::warn!(
            ?outcome,
            multiplier,
            cooldown_ms = duration.as_millis() as u64,
            restore_to = %restore_to,
            "policy escalated"
        );
        outcome
    }

    /// Fires due restores. Returns the stage restored to, if any.
    pub fn poll(&mut self) -> Option<Stage> {
        let now = self.clock.now();
        let mut restored = None;
        for (handle, restore) in self.restores.drain_due(now) {
            if self.pending == Some(handle) {
                self.pending = None;
            }
            restored = Some(self.apply_restore(restore, "cooldown"));
        }
        restored
    }

    /// `(due, stage)` of the scheduled restore while escalated.
    pub fn pending_restore(&self) -> Option<(Duration, PresetName)> {
        let handle = self.pending?;
        let due = self.restores.due_at(handle)?;
        let restore = self.restores.get(handle)?;
        Some((due, restore.stage))
    }

    /// Fires any pending restore immediately. Called on teardown so an
    /// escalated policy never outlives its owner silently.
    pub fn shutdown(&mut self) -> Option<Stage> {
        self.pending = None;
        let mut restored = None;
        for (_, restore) in self.restores.drain_all() {
            restored = Some(self.apply_restore(restore, "shutdown"));
        }
        restored
    }

    fn apply_restore(&mut self, restore: Restore, reason: &str) -> Stage {
        let stage = Stage::Preset(restore.stage);
        self.install(stage, restore.policy);
        tracing::info!(to = %stage, reason, "escalated policy restored");
        self.diagnostics.record(
            labels::POLICY_RESTORED,
            json!({ "to": stage.as_str(), "reason": reason }),
        );
        stage
    }

    fn install(&mut self, stage: Stage, policy: Arc<Policy>) {
        self.stage = stage;
        self.current = policy;
    }

    fn reject(&self, name: &str) {
        tracing::warn!(name, current = %self.stage, "unknown preset; policy unchanged");
        self.diagnostics.record(
            labels::POLICY_SWITCH_FAILED,
            json!({ "requested": name, "current": self.stage.as_str() }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::time::ManualClock;

    fn store() -> (ManualClock, DiagnosticsRecorder, PolicyStore) {
        let clock = ManualClock::new();
        let diagnostics = DiagnosticsRecorder::new(clock.shared());
        let store = PolicyStore::new(
            PresetCatalog::builtin(),
            PresetName::Stage5Complete,
            clock.shared(),
            diagnostics.clone(),
        )
        .unwrap();
        (clock, diagnostics, store)
    }

    fn distance(policy: &Policy, category: Category) -> f32 {
        policy.rule(category).unwrap().cleanup_distance
    }

    #[test]
    fn unknown_preset_leaves_policy_untouched() {
        let (_clock, diagnostics, mut store) = store();
        let before = store.current();

        let err = store.activate("NOT_A_REAL_PRESET").unwrap_err();
        assert_eq!(
            err,
            PolicyError::UnknownPreset {
                name: "NOT_A_REAL_PRESET".into()
            }
        );
        assert_eq!(store.current(), before);
        assert_eq!(diagnostics.count_of(labels::POLICY_SWITCH_FAILED), 1);
    }

    #[test]
    fn emergency_is_not_activatable() {
        let (_clock, _diagnostics, mut store) = store();
        assert!(store.activate("EMERGENCY").is_err());
        assert_eq!(store.stage(), Stage::Preset(PresetName::Stage5Complete));
    }

    #[test]
    fn preset_missing_from_catalog_is_rejected() {
        let clock = ManualClock::new();
        let diagnostics = DiagnosticsRecorder::new(clock.shared());
        let catalog = PresetCatalog::empty()
            .with_preset(PresetName::Baseline, Policy::new(false, Duration::from_secs(1)));
        let mut store =
            PolicyStore::new(catalog, PresetName::Baseline, clock.shared(), diagnostics).unwrap();

        assert!(store.activate_preset(PresetName::Stage5Complete).is_err());
        assert_eq!(store.stage(), Stage::Preset(PresetName::Baseline));
        assert_eq!(store.list_presets(), vec![PresetName::Baseline]);
    }

    #[test]
    fn escalation_reverts_to_exact_prior_policy() {
        let (clock, _diagnostics, mut store) = store();
        let (_, before) = store.current();

        assert_eq!(store.escalate(0.5, Duration::from_millis(1000)), Escalation::Started);
        let (stage, escalated) = store.current();
        assert_eq!(stage, Stage::Emergency);
        assert_eq!(distance(&escalated, Category::DecorationTree), 600.0);

        clock.advance(Duration::from_millis(999));
        assert_eq!(store.poll(), None);
        clock.advance(Duration::from_millis(2));
        assert_eq!(store.poll(), Some(Stage::Preset(PresetName::Stage5Complete)));

        let (stage, after) = store.current();
        assert_eq!(stage, Stage::Preset(PresetName::Stage5Complete));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn overlapping_escalations_refresh_without_compounding() {
        let (clock, _diagnostics, mut store) = store();
        let (_, before) = store.current();

        store.escalate(0.5, Duration::from_millis(1000));
        clock.advance(Duration::from_millis(800));
        assert_eq!(store.escalate(0.5, Duration::from_millis(1000)), Escalation::Refreshed);

        // Same shrink as a single escalation
        assert_eq!(distance(&store.policy(), Category::DecorationTree), 600.0);

        // The first cooldown would have ended here; the refresh keeps us escalated
        clock.advance(Duration::from_millis(400));
        assert_eq!(store.poll(), None);
        assert!(store.is_escalated());
        assert_eq!(
            store.pending_restore(),
            Some((Duration::from_millis(1800), PresetName::Stage5Complete))
        );

        clock.advance(Duration::from_millis(600));
        assert_eq!(store.poll(), Some(Stage::Preset(PresetName::Stage5Complete)));
        assert_eq!(*store.policy(), *before);
    }

    #[test]
    fn explicit_switch_cancels_pending_restore() {
        let (clock, _diagnostics, mut store) = store();
        store.escalate(0.5, Duration::from_millis(1000));
        store.activate("BASELINE").unwrap();
        assert_eq!(store.pending_restore(), None);

        clock.advance(Duration::from_secs(5));
        assert_eq!(store.poll(), None);
        assert_eq!(store.stage(), Stage::Preset(PresetName::Baseline));
    }

    #[test]
    fn shutdown_flushes_pending_restore() {
        let (_clock, diagnostics, mut store) = store();
        store.escalate(0.25, Duration::from_secs(60));
        assert_eq!(store.shutdown(), Some(Stage::Preset(PresetName::Stage5Complete)));
        assert!(!store.is_escalated());
        assert_eq!(diagnostics.count_of(labels::POLICY_RESTORED), 1);
    }
}
