//! Keyed tallies that never go below zero

use std::collections::BTreeMap;

/// Result of a decrement on a [`Counter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The tally went down by one; carries the new value.
    Applied(usize),
    /// The tally was already zero and stayed there.
    Clamped,
}

pub struct Counter<K> {
    counters: BTreeMap<K, usize>,
}

impl<K: Ord + Clone> Counter<K> {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, key: &K, value: usize) -> usize {
        let slot = self.counters.entry(key.clone()).or_insert(0);
        *slot = slot.saturating_add(value);
        *slot
    }

    pub fn decrement(&mut self, key: &K) -> Decrement {
        match self.counters.get_mut(key) {
            Some(slot) if *slot > 0 => {
                *slot -= 1;
                Decrement::Applied(*slot)
            }
            _ => Decrement::Clamped,
        }
    }

    pub fn get(&self, key: &K) -> usize {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn total(&self) -> usize {
        self.counters.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &usize)> {
        self.counters.iter()
    }
}

impl<K: Ord + Clone> Default for Counter<K> {
    fn default() -> Self {
        Self::new()
    }
}
