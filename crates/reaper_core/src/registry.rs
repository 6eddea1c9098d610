//! Live object registry
//!
//! Holds the references the simulation hands over at spawn time so the
//! eviction engine has something to destroy. Objects are owned by the
//! simulation; a [`TrackedObject`] is a handle into it.

use crate::category::Category;
use glam::Vec2;
use std::collections::BTreeMap;
use thiserror::Error;

/// A destroy call the simulation could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("destroy failed: {reason}")]
pub struct DestroyError {
    pub reason: String,
}

impl DestroyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Handle to a world object owned by the simulation.
pub trait TrackedObject {
    /// Current world position; only `x` is compared against the viewport.
    fn position(&self) -> Vec2;

    /// Destroys the underlying object. Must be idempotent: destroying an
    /// already-destroyed object is `Ok(())`. Report failures through
    /// `Err` rather than panicking. A panic unwinds out of the eviction pass
    /// with the object still tracked.
    fn destroy(&mut self) -> Result<(), DestroyError>;
}

/// Registration order is the id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

pub(crate) struct LiveEntry {
    pub(crate) category: Category,
    pub(crate) object: Box<dyn TrackedObject>,
}

pub struct LiveObjects {
    next_id: u64,
    by_category: BTreeMap<Category, BTreeMap<ObjectId, LiveEntry>>,
}

impl LiveObjects {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            by_category: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, category: Category, object: Box<dyn TrackedObject>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.by_category
            .entry(category)
            .or_default()
            .insert(id, LiveEntry { category, object });
        id
    }

    /// Drops the reference without destroying. Returns the category it was
    /// filed under, or `None` if the id is not live.
    pub fn remove(&mut self, id: ObjectId) -> Option<Category> {
        self.by_category
            .values_mut()
            .find_map(|objects| objects.remove(&id))
            .map(|entry| entry.category)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.by_category
            .values()
            .any(|objects| objects.contains_key(&id))
    }

    pub fn len_of(&self, category: Category) -> usize {
        self.by_category.get(&category).map_or(0, BTreeMap::len)
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(id, x)` for every live object of `category`, in registration order.
    pub fn positions(&self, category: Category) -> Vec<(ObjectId, f32)> {
        self.by_category
            .get(&category)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(id, entry)| (*id, entry.object.position().x))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Destroys the object while it is still filed, so a panicking destroy
    /// leaves the registry and the counter in agreement. The entry is only
    /// dropped once the destroy succeeds.
    pub(crate) fn destroy(
        &mut self,
        category: Category,
        id: ObjectId,
    ) -> Option<Result<(), DestroyError>> {
        let objects = self.by_category.get_mut(&category)?;
        let result = objects.get_mut(&id)?.object.destroy();
        if result.is_ok() {
            objects.remove(&id);
        }
        Some(result)
    }
}

impl Default for LiveObjects {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn ids_follow_registration_order_across_categories() {
        let log = DestroyLog::default();
        let mut live = LiveObjects::new();
        let a = live.insert(Category::DecorationTree, FakeObject::boxed(1, 5.0, &log));
        let b = live.insert(Category::ObstacleCloud, FakeObject::boxed(2, 1.0, &log));
        let c = live.insert(Category::DecorationTree, FakeObject::boxed(3, 2.0, &log));
        assert!(a < b && b < c);

        assert_eq!(live.positions(Category::DecorationTree), vec![(a, 5.0), (c, 2.0)]);
        assert_eq!(live.remove(b), Some(Category::ObstacleCloud));
        assert_eq!(live.remove(b), None);
        assert_eq!(live.len(), 2);
        assert_eq!(log.len(), 0);
    }
}
