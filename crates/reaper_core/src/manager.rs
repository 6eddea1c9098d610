//! Lifecycle manager
//!
//! Composition root for the subsystem. The host owns one manager, feeds it
//! spawned objects through [`LifecycleManager::track`] and calls
//! [`LifecycleManager::frame`] once per simulation tick. Everything that runs
//! on a timer (policy logging, memory sampling, texture sampling, escalation
//! rollback) is driven from `frame` or [`LifecycleManager::poll`], so virtual
//! time in tests is just a `ManualClock`.

use crate::category::Category;
use crate::config::LifecycleConfig;
use crate::counter::{CreationEvent, ResourceCounter};
use crate::diagnostics::{DiagnosticsRecorder, PatternReport};
use crate::eviction::{EvictionEngine, PassReport};
use crate::policy::Policy;
use crate::presets::PresetName;
use crate::pressure::{PressureMonitor, PressureReading};
use crate::registry::{LiveObjects, ObjectId, TrackedObject};
use crate::store::{Escalation, PolicyError, PolicyStore, Stage};
use crate::telemetry::{MemoryTelemetry, TextureTelemetry};
use crate::texture::TextureCacheGuard;
use crate::time::{SharedClock, TimerHandle, Timers};
use glam::Vec2;
use reaper_metrics::SpanTimer;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("default preset unavailable: {0}")]
    DefaultPreset(#[from] PolicyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    LogCounts,
    SampleMemory,
    SampleTextures,
}

pub struct LifecycleManager {
    clock: SharedClock,
    diagnostics: DiagnosticsRecorder,
    pattern_window: Duration,
    counter: ResourceCounter,
    live: LiveObjects,
    store: PolicyStore,
    eviction: EvictionEngine,
    pressure: PressureMonitor,
    textures: TextureCacheGuard,
    texture_interval: Duration,
    memory_telemetry: Box<dyn MemoryTelemetry>,
    texture_telemetry: Box<dyn TextureTelemetry>,
    tasks: Timers<Task>,
    log_timer: TimerHandle,
    logged_ticks: u64,
    last_viewport: Option<Vec2>,
    released_textures: Vec<String>,
    spans: SpanTimer,
}

impl LifecycleManager {
    pub fn new(
        config: &LifecycleConfig,
        clock: SharedClock,
        memory_telemetry: Box<dyn MemoryTelemetry>,
        texture_telemetry: Box<dyn TextureTelemetry>,
    ) -> Result<Self, LifecycleError> {
        let diagnostics = DiagnosticsRecorder::with_capacity(
            clock.clone(),
            config.diagnostics.capacity,
            config.diagnostics.pattern_threshold,
        );
        let store = PolicyStore::new(
            config.catalog(),
            config.default_preset,
            clock.clone(),
            diagnostics.clone(),
        )?
        .with_floors(config.floors);

        let now = clock.now();
        let mut tasks = Timers::new();
        let log_timer = tasks.schedule(now + store.policy().logging_interval(), Task::LogCounts);
        tasks.schedule(now + config.pressure.sample_interval(), Task::SampleMemory);
        tasks.schedule(now + config.texture.sample_interval(), Task::SampleTextures);

        tracing::info!(
            preset = %config.default_preset,
            watermark = config.pressure.high_watermark,
            "lifecycle manager started"
        );

        Ok(Self {
            counter: ResourceCounter::with_log_capacity(
                clock.clone(),
                diagnostics.clone(),
                config.creation_log_capacity,
            ),
            live: LiveObjects::new(),
            eviction: EvictionEngine::new(diagnostics.clone()),
            pressure: PressureMonitor::new(config.pressure, diagnostics.clone()),
            textures: TextureCacheGuard::with_safe_set(
                diagnostics.clone(),
                config.texture.safe_resources(),
                config.texture.eviction_ratio,
            ),
            texture_interval: config.texture.sample_interval(),
            pattern_window: config.diagnostics.pattern_window(),
            memory_telemetry,
            texture_telemetry,
            tasks,
            log_timer,
            logged_ticks: 0,
            last_viewport: None,
            released_textures: Vec::new(),
            spans: SpanTimer::default(),
            clock,
            diagnostics,
            store,
        })
    }

    // ------------------------------------------------------------------
    // Object bookkeeping
    // ------------------------------------------------------------------

    /// Registers a freshly spawned object. The manager keeps the reference
    /// until the object is evicted or the host calls [`Self::untrack`].
    pub fn track(&mut self, category: Category, object: Box<dyn TrackedObject>) -> ObjectId {
        self.counter.track(category, Some(object.position()));
        self.live.insert(category, object)
    }

    /// Natural destruction path (collected, crashed, despawned by the host).
    /// Returns `false` for ids already evicted or never tracked; those do not
    /// touch the counter.
    pub fn untrack(&mut self, id: ObjectId) -> bool {
        match self.live.remove(id) {
            Some(category) => {
                self.counter.untrack(category);
                true
            }
            None => false,
        }
    }

    pub fn is_tracked(&self, id: ObjectId) -> bool {
        self.live.contains(id)
    }

    pub fn count_of(&self, category: Category) -> usize {
        self.counter.count_of(category)
    }

    pub fn total(&self) -> usize {
        self.counter.total()
    }

    pub fn recently_created(&self, window: Duration) -> Vec<CreationEvent> {
        self.counter.recently_created(window)
    }

    pub fn counter(&self) -> &ResourceCounter {
        &self.counter
    }

    // ------------------------------------------------------------------
    // Frame + timers
    // ------------------------------------------------------------------

    /// Once per simulation tick: fires due timers, then runs an eviction pass
    /// against a single policy snapshot.
    pub fn frame(&mut self, viewport: Vec2) -> PassReport {
        self.last_viewport = Some(viewport);
        self.poll();
        self.run_pass(viewport)
    }

    /// Runs an eviction pass outside the frame cadence.
    pub fn run_pass(&mut self, viewport: Vec2) -> PassReport {
        let policy = self.store.policy();
        let Self {
            eviction,
            live,
            counter,
            spans,
            ..
        } = self;
        spans.time("eviction.pass", || {
            eviction.run_pass(viewport, &policy, live, counter)
        })
    }

    /// Fires due restores and periodic tasks. Tasks run one at a time, in due
    /// order, each to completion before the next starts.
    pub fn poll(&mut self) {
        self.store.poll();

        let now = self.clock.now();
        for (_, task) in self.tasks.drain_due(now) {
            let interval = match task {
                Task::LogCounts => {
                    self.log_counts();
                    self.store.policy().logging_interval()
                }
                Task::SampleMemory => {
                    self.sample_memory();
                    self.pressure.config().sample_interval()
                }
                Task::SampleTextures => {
                    self.sample_textures();
                    self.texture_interval
                }
            };
            let handle = self.tasks.schedule(now + interval, task);
            if task == Task::LogCounts {
                self.log_timer = handle;
            }
        }
    }

    /// When the next count log is due. The interval is read from the active
    /// policy each time the task fires, so a switch takes effect after the
    /// already scheduled tick.
    pub fn next_log_due(&self) -> Option<Duration> {
        self.tasks.due_at(self.log_timer)
    }

    /// Count-log ticks that actually logged. Ticks under a policy with
    /// logging off are skipped and not counted.
    pub fn logged_ticks(&self) -> u64 {
        self.logged_ticks
    }

    fn log_counts(&mut self) {
        let (stage, policy) = self.store.current();
        if !policy.logging_enabled() {
            return;
        }
        self.logged_ticks += 1;
        for category in Category::ALL {
            tracing::info!(
                %stage,
                %category,
                live = self.counter.count_of(category),
                enabled = policy.is_enabled(category),
                "resource counts"
            );
        }
        reaper_metrics::metrics! {
            for (span, average) in self.spans.iter() {
                tracing::debug!(span, average_us = average.as_micros() as u64, "span timing");
            }
        }
    }

    fn sample_memory(&mut self) {
        let reading = self
            .spans
            .time("pressure.sample", || {
                self.pressure
                    .sample(self.memory_telemetry.as_ref(), &mut self.store)
            });
        if let PressureReading::Escalated { .. } = reading {
            self.evict_after_escalation();
        }
    }

    fn sample_textures(&mut self) {
        let evicted = self.textures.sample(self.texture_telemetry.as_ref());
        self.released_textures.extend(evicted);
    }

    fn evict_after_escalation(&mut self) {
        let Some(viewport) = self.last_viewport else {
            return;
        };
        let report = self.run_pass(viewport);
        tracing::debug!(
            evicted = report.evicted(),
            failures = report.destroy_failures(),
            "opportunistic pass after escalation"
        );
    }

    // ------------------------------------------------------------------
    // Policy control surface
    // ------------------------------------------------------------------

    pub fn activate(&mut self, name: &str) -> Result<(), PolicyError> {
        self.store.activate(name)
    }

    pub fn activate_preset(&mut self, preset: PresetName) -> Result<(), PolicyError> {
        self.store.activate_preset(preset)
    }

    pub fn current(&self) -> (Stage, Arc<Policy>) {
        self.store.current()
    }

    pub fn list_presets(&self) -> Vec<PresetName> {
        self.store.list_presets()
    }

    /// Manual escalation. Also trims right away at the last known viewport.
    pub fn escalate(&mut self, multiplier: f32, duration: Duration) -> Escalation {
        let outcome = self.store.escalate(multiplier, duration);
        self.evict_after_escalation();
        outcome
    }

    pub fn policy_store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn pressure(&self) -> &PressureMonitor {
        &self.pressure
    }

    pub fn eviction(&self) -> &EvictionEngine {
        &self.eviction
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    pub fn track_texture(&mut self, key: impl Into<String>, approx_size: u64) {
        self.textures.track_resource(key, approx_size);
    }

    pub fn release_texture(&mut self, key: &str) -> bool {
        self.textures.release_resource(key)
    }

    pub fn textures(&self) -> &TextureCacheGuard {
        &self.textures
    }

    /// Keys evicted by texture sampling since the last call. The host frees
    /// them in the graphics backend.
    pub fn take_released_textures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released_textures)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub fn diagnostics(&self) -> &DiagnosticsRecorder {
        &self.diagnostics
    }

    /// Pattern analysis over the configured window.
    pub fn analyze_patterns(&self) -> PatternReport {
        self.diagnostics.analyze_patterns(self.pattern_window)
    }

    /// Stops the periodic tasks and fires any pending restore so an escalated
    /// policy never outlives the session.
    pub fn shutdown(&mut self) -> Option<Stage> {
        self.tasks.drain_all();
        let restored = self.store.shutdown();
        tracing::info!(
            live = self.live.len(),
            evicted_total = self.eviction.evicted_total(),
            passes = self.eviction.passes(),
            "lifecycle manager stopped"
        );
        restored
    }
}
