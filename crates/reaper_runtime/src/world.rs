//! Stand-in simulation: object storage, a spawner and ring collection.

use reaper_core::glam::Vec2;
use reaper_core::{Category, DestroyError, ObjectId, TrackedObject};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Distance ahead of the viewport where new objects appear.
const SPAWN_LEAD: f32 = 1280.0;

#[derive(Default)]
struct State {
    next_key: u64,
    objects: HashMap<u64, Category>,
    rings: Vec<Ring>,
}

struct Ring {
    id: ObjectId,
    key: u64,
    x: f32,
}

/// Shared object storage. Clones see the same world.
#[derive(Clone, Default)]
pub struct World {
    state: Rc<RefCell<State>>,
}

impl World {
    /// Returns the world key alongside the object handed to the manager.
    pub fn spawn(&self, category: Category, x: f32) -> (u64, Box<dyn TrackedObject>) {
        let mut state = self.state.borrow_mut();
        let key = state.next_key;
        state.next_key += 1;
        state.objects.insert(key, category);
        let entity = Entity {
            key,
            x,
            world: self.clone(),
        };
        (key, Box::new(entity))
    }

    pub fn watch_ring(&self, id: ObjectId, key: u64, x: f32) {
        self.state.borrow_mut().rings.push(Ring { id, key, x });
    }

    /// Despawns the rings the player has run through since the last call and
    /// returns their ids so the manager can untrack them.
    pub fn collect_rings(&self, player_x: f32) -> Vec<ObjectId> {
        let mut state = self.state.borrow_mut();
        let (collected, ahead): (Vec<Ring>, Vec<Ring>) =
            state.rings.drain(..).partition(|ring| ring.x <= player_x);
        state.rings = ahead;
        for ring in &collected {
            state.objects.remove(&ring.key);
        }
        collected.into_iter().map(|ring| ring.id).collect()
    }

    pub fn alive(&self, category: Category) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|&&c| c == category)
            .count()
    }

    fn despawn(&self, key: u64) {
        self.state.borrow_mut().objects.remove(&key);
    }
}

struct Entity {
    key: u64,
    x: f32,
    world: World,
}

impl TrackedObject for Entity {
    fn position(&self) -> Vec2 {
        Vec2::new(self.x, 0.0)
    }

    fn destroy(&mut self) -> Result<(), DestroyError> {
        // Removing a missing key is a no-op, so repeated destroys are fine
        self.world.despawn(self.key);
        Ok(())
    }
}

/// Deterministic xorshift spawner.
pub struct Spawner {
    state: u64,
    textures: u64,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
            textures: 0,
        }
    }

    fn next_f32(&mut self) -> f32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        (self.state >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Per-tick spawn rolls for every category.
    pub fn spawn_ahead(&mut self, viewport_x: f32) -> Vec<(Category, f32)> {
        let mut spawned = Vec::new();
        for category in Category::ALL {
            let chance = match category {
                Category::BackgroundSection => 0.02,
                Category::DecorationTree => 0.30,
                Category::CollectibleRing => 0.20,
                Category::ObstacleCloud => 0.05,
            };
            if self.next_f32() < chance {
                let x = viewport_x + SPAWN_LEAD + self.next_f32() * 400.0;
                spawned.push((category, x));
            }
        }
        spawned
    }

    /// Occasionally a new texture is uploaded; most are regenerable.
    pub fn texture_request(&mut self, tick: u64) -> Option<String> {
        if tick % 30 != 0 {
            return None;
        }
        self.textures += 1;
        let key = if self.textures % 4 == 0 {
            format!("atlas/chunk-{}", self.textures)
        } else {
            format!("generated/glow-{}", self.textures)
        };
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::registry::LiveObjects;

    #[test]
    fn destroy_is_idempotent() {
        let world = World::default();
        let (_, mut tree) = world.spawn(Category::DecorationTree, 10.0);
        assert_eq!(world.alive(Category::DecorationTree), 1);
        tree.destroy().unwrap();
        tree.destroy().unwrap();
        assert_eq!(world.alive(Category::DecorationTree), 0);
    }

    #[test]
    fn collected_rings_leave_the_world() {
        let world = World::default();
        let mut live = LiveObjects::new();
        let mut spawn_ring = |x: f32| {
            let (key, object) = world.spawn(Category::CollectibleRing, x);
            let id = live.insert(Category::CollectibleRing, object);
            world.watch_ring(id, key, x);
            id
        };
        let near = spawn_ring(100.0);
        let far = spawn_ring(900.0);
        assert_eq!(world.alive(Category::CollectibleRing), 2);

        assert_eq!(world.collect_rings(500.0), vec![near]);
        assert_eq!(world.alive(Category::CollectibleRing), 1);
        assert!(world.collect_rings(500.0).is_empty());

        assert_eq!(world.collect_rings(1000.0), vec![far]);
        assert_eq!(world.alive(Category::CollectibleRing), 0);
    }

    #[test]
    fn spawns_land_ahead_of_viewport() {
        let mut spawner = Spawner::new(7);
        for _ in 0..500 {
            for (_, x) in spawner.spawn_ahead(1000.0) {
                assert!(x >= 1000.0 + SPAWN_LEAD);
            }
        }
    }
}
