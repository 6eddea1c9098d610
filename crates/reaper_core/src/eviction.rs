//! Eviction engine
//!
//! Once per frame, for every enabled category, trims the live population back
//! to the category's cap. Victims are taken furthest-behind first (lowest `x`,
//! then oldest registration), so objects beyond the cleanup distance always go
//! before anything still near the viewport. Disabled categories are never
//! touched.

use crate::category::Category;
use crate::counter::ResourceCounter;
use crate::diagnostics::{labels, DiagnosticsRecorder};
use crate::policy::{CategoryPolicy, Policy};
use crate::registry::{LiveObjects, ObjectId};
use glam::Vec2;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// What one pass did to one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryPass {
    pub live_before: usize,
    /// Removed while behind `viewport.x - cleanup_distance`.
    pub distance_evicted: usize,
    /// Removed from within the cleanup distance to honour the cap.
    pub cap_evicted: usize,
    /// Destroy calls that failed; those objects stay tracked for the next pass.
    pub destroy_failures: usize,
}

impl CategoryPass {
    pub fn evicted(&self) -> usize {
        self.distance_evicted + self.cap_evicted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    pub viewport_x: f32,
    pub categories: BTreeMap<Category, CategoryPass>,
}

impl PassReport {
    pub fn evicted(&self) -> usize {
        self.categories.values().map(CategoryPass::evicted).sum()
    }

    pub fn destroy_failures(&self) -> usize {
        self.categories.values().map(|c| c.destroy_failures).sum()
    }

    pub fn category(&self, category: Category) -> CategoryPass {
        self.categories.get(&category).copied().unwrap_or_default()
    }
}

pub struct EvictionEngine {
    diagnostics: DiagnosticsRecorder,
    passes: u64,
    evicted_total: u64,
}

impl EvictionEngine {
    pub fn new(diagnostics: DiagnosticsRecorder) -> Self {
        Self {
            diagnostics,
            passes: 0,
            evicted_total: 0,
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    /// Runs one pass against a policy snapshot. Safe with zero live objects.
    pub fn run_pass(
        &mut self,
        viewport: Vec2,
        policy: &Policy,
        live: &mut LiveObjects,
        counter: &mut ResourceCounter,
    ) -> PassReport {
        self.passes += 1;
        let mut report = PassReport {
            viewport_x: viewport.x,
            categories: BTreeMap::new(),
        };

        for (category, rule) in policy.enabled_rules() {
            let pass = self.trim_category(category, rule, viewport.x, live, counter);
            if pass.evicted() > 0 || pass.destroy_failures > 0 {
                tracing::debug!(
                    %category,
                    live_before = pass.live_before,
                    distance = pass.distance_evicted,
                    cap = pass.cap_evicted,
                    failures = pass.destroy_failures,
                    "eviction pass trimmed category"
                );
            }
            self.evicted_total += pass.evicted() as u64;
            report.categories.insert(category, pass);
        }

        report
    }

    fn trim_category(
        &mut self,
        category: Category,
        rule: &CategoryPolicy,
        viewport_x: f32,
        live: &mut LiveObjects,
        counter: &mut ResourceCounter,
    ) -> CategoryPass {
        let mut positions = live.positions(category);
        let mut pass = CategoryPass {
            live_before: positions.len(),
            ..CategoryPass::default()
        };

        let excess = positions.len().saturating_sub(rule.max_count);
        if excess == 0 {
            return pass;
        }

        // Ids grow with registration, so equal x falls back to oldest first.
        positions.sort_by(|(a_id, a_x), (b_id, b_x)| {
            a_x.total_cmp(b_x).then(a_id.cmp(b_id))
        });
        let behind = viewport_x - rule.cleanup_distance;

        // A failed destroy hands its slot to the next candidate so a stuck
        // object cannot hold the category above its cap.
        for &(id, x) in &positions {
            if pass.evicted() == excess {
                break;
            }
            if !self.evict_one(category, id, x, live) {
                pass.destroy_failures += 1;
                continue;
            }
            counter.untrack(category);
            if x < behind {
                pass.distance_evicted += 1;
            } else {
                pass.cap_evicted += 1;
            }
        }

        pass
    }

    /// Destroys and forgets one object. `false` means the destroy failed and
    /// the object stays tracked.
    fn evict_one(
        &mut self,
        category: Category,
        id: ObjectId,
        x: f32,
        live: &mut LiveObjects,
    ) -> bool {
        match live.destroy(category, id) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                tracing::warn!(
                    %category,
                    object = id.to_raw(),
                    error = %err,
                    "destroy failed; object kept"
                );
                self.diagnostics.record(
                    labels::DESTROY_FAILED,
                    json!({
                        "category": category.as_str(),
                        "object": id.to_raw(),
                        "x": x,
                        "error": err.reason,
                    }),
                );
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::{DestroyLog, FakeObject};
    use crate::time::ManualClock;
    use std::time::Duration;

    struct Rig {
        diagnostics: DiagnosticsRecorder,
        live: LiveObjects,
        counter: ResourceCounter,
        engine: EvictionEngine,
        log: DestroyLog,
    }

    impl Rig {
        fn new() -> Self {
            let clock = ManualClock::new();
            let diagnostics = DiagnosticsRecorder::new(clock.shared());
            Self {
                live: LiveObjects::new(),
                counter: ResourceCounter::new(clock.shared(), diagnostics.clone()),
                engine: EvictionEngine::new(diagnostics.clone()),
                diagnostics,
                log: DestroyLog::default(),
            }
        }

        fn spawn(&mut self, category: Category, tag: u32, x: f32) {
            self.live.insert(category, FakeObject::boxed(tag, x, &self.log));
            self.counter.track(category, Some(Vec2::new(x, 0.0)));
        }

        fn spawn_failing(&mut self, category: Category, tag: u32, x: f32) {
            self.live.insert(category, FakeObject::failing(tag, x, &self.log));
            self.counter.track(category, Some(Vec2::new(x, 0.0)));
        }

        fn pass(&mut self, viewport_x: f32, policy: &Policy) -> PassReport {
            self.engine.run_pass(
                Vec2::new(viewport_x, 0.0),
                policy,
                &mut self.live,
                &mut self.counter,
            )
        }
    }

    fn trees(distance: f32, max_count: usize) -> Policy {
        Policy::new(false, Duration::from_secs(5))
            .with_category(Category::DecorationTree, CategoryPolicy::enabled(distance, max_count))
    }

    #[test]
    fn empty_world_is_a_no_op() {
        let mut rig = Rig::new();
        let report = rig.pass(1000.0, &trees(100.0, 1));
        assert_eq!(report.evicted(), 0);
        assert!(rig.diagnostics.is_empty());
    }

    #[test]
    fn only_excess_is_removed_furthest_behind_first() {
        let mut rig = Rig::new();
        for (tag, x) in [(1, 300.0), (2, 10.0), (3, 900.0), (4, 50.0)] {
            rig.spawn(Category::DecorationTree, tag, x);
        }

        let report = rig.pass(1000.0, &trees(500.0, 2));

        assert_eq!(rig.counter.count_of(Category::DecorationTree), 2);
        assert_eq!(*rig.log.destroyed.borrow(), vec![2, 4]);
        assert_eq!(report.category(Category::DecorationTree).distance_evicted, 2);
    }

    #[test]
    fn cap_is_enforced_even_inside_cleanup_distance() {
        let mut rig = Rig::new();
        for tag in 0..5 {
            rig.spawn(Category::DecorationTree, tag, 900.0 + tag as f32);
        }

        let report = rig.pass(1000.0, &trees(500.0, 3));
        let pass = report.category(Category::DecorationTree);
        assert_eq!(pass.distance_evicted, 0);
        assert_eq!(pass.cap_evicted, 2);
        assert_eq!(rig.counter.count_of(Category::DecorationTree), 3);
    }

    #[test]
    fn equal_positions_evict_oldest_first() {
        let mut rig = Rig::new();
        for tag in 1..=4 {
            rig.spawn(Category::DecorationTree, tag, 0.0);
        }

        rig.pass(1000.0, &trees(100.0, 2));
        assert_eq!(*rig.log.destroyed.borrow(), vec![1, 2]);
    }

    #[test]
    fn disabled_categories_are_left_alone() {
        let mut rig = Rig::new();
        for tag in 0..20 {
            rig.spawn(Category::ObstacleCloud, tag, tag as f32);
        }
        let policy = trees(100.0, 1).with_category(
            Category::ObstacleCloud,
            CategoryPolicy::disabled(100.0, 1),
        );

        for _ in 0..3 {
            rig.pass(10_000.0, &policy);
        }
        assert_eq!(rig.counter.count_of(Category::ObstacleCloud), 20);
        assert_eq!(rig.log.len(), 0);
    }

    #[test]
    fn repeated_passes_never_destroy_twice() {
        let mut rig = Rig::new();
        for tag in 0..10 {
            rig.spawn(Category::DecorationTree, tag, tag as f32 * 10.0);
        }
        let policy = trees(100.0, 4);

        rig.pass(1000.0, &policy);
        let second = rig.pass(1000.0, &policy);

        assert_eq!(second.evicted(), 0);
        assert_eq!(rig.log.len(), 6);
        assert!((0..10).all(|tag| rig.log.times_destroyed(tag) <= 1));
    }

    #[test]
    fn failed_destroy_is_recorded_and_pass_continues() {
        let mut rig = Rig::new();
        rig.spawn_failing(Category::DecorationTree, 1, 0.0);
        rig.spawn(Category::DecorationTree, 2, 10.0);
        rig.spawn(Category::DecorationTree, 3, 20.0);
        rig.spawn(Category::CollectibleRing, 4, 0.0);
        rig.spawn(Category::CollectibleRing, 5, 5.0);

        let policy = trees(100.0, 1)
            .with_category(Category::CollectibleRing, CategoryPolicy::enabled(100.0, 1));
        let report = rig.pass(1000.0, &policy);

        let tree_pass = report.category(Category::DecorationTree);
        assert_eq!(tree_pass.destroy_failures, 1);
        assert_eq!(tree_pass.evicted(), 2);
        assert_eq!(report.category(Category::CollectibleRing).evicted(), 1);
        assert_eq!(rig.diagnostics.count_of(labels::DESTROY_FAILED), 1);

        // The locked object stays tracked; the cap still holds
        assert_eq!(rig.live.len_of(Category::DecorationTree), 1);
        assert_eq!(rig.counter.count_of(Category::DecorationTree), 1);
        assert_eq!(*rig.log.destroyed.borrow(), vec![2, 3, 4]);
    }

    struct Exploding;

    impl crate::registry::TrackedObject for Exploding {
        fn position(&self) -> Vec2 {
            Vec2::ZERO
        }

        fn destroy(&mut self) -> Result<(), crate::registry::DestroyError> {
            panic!("destroy blew up");
        }
    }

    #[test]
    fn panicking_destroy_leaves_registry_and_counter_in_step() {
        let mut rig = Rig::new();
        rig.live.insert(Category::DecorationTree, Box::new(Exploding));
        rig.counter.track(Category::DecorationTree, None);
        rig.spawn(Category::DecorationTree, 2, 500.0);

        let policy = trees(100.0, 1);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rig.pass(1000.0, &policy)
        }));

        assert!(outcome.is_err());
        assert_eq!(rig.live.len_of(Category::DecorationTree), 2);
        assert_eq!(rig.counter.count_of(Category::DecorationTree), 2);
    }
}
