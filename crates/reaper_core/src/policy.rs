//! Cleanup policy values
//!
//! A [`Policy`] is immutable once built. The store swaps whole policies
//! (behind an `Arc`), it never edits one in place.

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub enabled: bool,
    /// Pixels behind the viewport beyond which objects become eviction candidates.
    pub cleanup_distance: f32,
    /// Hard population cap for the category.
    pub max_count: usize,
}

impl CategoryPolicy {
    pub const fn enabled(cleanup_distance: f32, max_count: usize) -> Self {
        Self {
            enabled: true,
            cleanup_distance,
            max_count,
        }
    }

    pub const fn disabled(cleanup_distance: f32, max_count: usize) -> Self {
        Self {
            enabled: false,
            cleanup_distance,
            max_count,
        }
    }
}

/// Lower bounds applied when a policy is scaled down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Floors {
    pub min_cleanup_distance: f32,
    pub min_max_count: usize,
}

impl Default for Floors {
    fn default() -> Self {
        Self {
            min_cleanup_distance: 100.0,
            min_max_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    categories: BTreeMap<Category, CategoryPolicy>,
    logging_enabled: bool,
    logging_interval_ms: u64,
}

impl Policy {
    /// Every category disabled.
    pub fn new(logging_enabled: bool, logging_interval: Duration) -> Self {
        Self {
            categories: BTreeMap::new(),
            logging_enabled,
            logging_interval_ms: logging_interval.as_millis() as u64,
        }
    }

    pub fn with_category(mut self, category: Category, rule: CategoryPolicy) -> Self {
        self.categories.insert(category, rule);
        self
    }

    /// Categories without an explicit rule are disabled.
    pub fn rule(&self, category: Category) -> Option<&CategoryPolicy> {
        self.categories.get(&category)
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.rule(category).is_some_and(|rule| rule.enabled)
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = (Category, &CategoryPolicy)> {
        self.categories
            .iter()
            .filter(|(_, rule)| rule.enabled)
            .map(|(category, rule)| (*category, rule))
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    pub fn logging_interval(&self) -> Duration {
        Duration::from_millis(self.logging_interval_ms.max(1))
    }

    /// Derives a tighter policy: every enabled category's distance and cap
    /// are multiplied by `multiplier` (clamped to `0.0..=1.0`) and held at
    /// or above `floors`. Disabled categories are copied unchanged.
    pub fn scaled(&self, multiplier: f32, floors: Floors) -> Policy {
        let factor = if multiplier.is_finite() {
            multiplier.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let categories = self
            .categories
            .iter()
            .map(|(category, rule)| {
                let rule = if rule.enabled {
                    let distance = (rule.cleanup_distance * factor)
                        .max(floors.min_cleanup_distance)
                        .min(rule.cleanup_distance);
                    let cap = ((rule.max_count as f32 * factor).floor() as usize)
                        .max(floors.min_max_count)
                        .min(rule.max_count.max(floors.min_max_count));
                    CategoryPolicy::enabled(distance, cap)
                } else {
                    *rule
                };
                (*category, rule)
            })
            .collect();

        Policy {
            categories,
            logging_enabled: self.logging_enabled,
            logging_interval_ms: self.logging_interval_ms,
        }
    }
}
