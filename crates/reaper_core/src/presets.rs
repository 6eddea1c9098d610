//! Named policy snapshots
//!
//! The staged presets roll cleanup out one category at a time, which is how
//! a regression in a single category gets bisected: BASELINE reproduces the
//! unbounded growth, each stage enables one more category.

use crate::category::Category;
use crate::policy::{CategoryPolicy, Policy};
use crate::store::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetName {
    Baseline,
    #[serde(rename = "STAGE_1_GROUND_CLEANUP")]
    Stage1GroundCleanup,
    #[serde(rename = "STAGE_2_TREE_CLEANUP")]
    Stage2TreeCleanup,
    #[serde(rename = "STAGE_3_COLLECTIBLE_CLEANUP")]
    Stage3CollectibleCleanup,
    #[serde(rename = "STAGE_4_OBSTACLE_CLEANUP")]
    Stage4ObstacleCleanup,
    #[serde(rename = "STAGE_5_COMPLETE")]
    Stage5Complete,
    ProductionAggressive,
}

impl PresetName {
    pub const ALL: [PresetName; 7] = [
        PresetName::Baseline,
        PresetName::Stage1GroundCleanup,
        PresetName::Stage2TreeCleanup,
        PresetName::Stage3CollectibleCleanup,
        PresetName::Stage4ObstacleCleanup,
        PresetName::Stage5Complete,
        PresetName::ProductionAggressive,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PresetName::Baseline => "BASELINE",
            PresetName::Stage1GroundCleanup => "STAGE_1_GROUND_CLEANUP",
            PresetName::Stage2TreeCleanup => "STAGE_2_TREE_CLEANUP",
            PresetName::Stage3CollectibleCleanup => "STAGE_3_COLLECTIBLE_CLEANUP",
            PresetName::Stage4ObstacleCleanup => "STAGE_4_OBSTACLE_CLEANUP",
            PresetName::Stage5Complete => "STAGE_5_COMPLETE",
            PresetName::ProductionAggressive => "PRODUCTION_AGGRESSIVE",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = PolicyError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        PresetName::ALL
            .into_iter()
            .find(|preset| preset.as_str() == name)
            .ok_or_else(|| PolicyError::UnknownPreset {
                name: name.to_string(),
            })
    }
}

const GROUND: CategoryPolicy = CategoryPolicy::enabled(1600.0, 12);
const TREES: CategoryPolicy = CategoryPolicy::enabled(1200.0, 150);
const RINGS: CategoryPolicy = CategoryPolicy::enabled(1000.0, 100);
const CLOUDS: CategoryPolicy = CategoryPolicy::enabled(1500.0, 40);

fn staged(logging_interval: Duration, enabled: &[(Category, CategoryPolicy)]) -> Policy {
    enabled
        .iter()
        .fold(Policy::new(true, logging_interval), |policy, (category, rule)| {
            policy.with_category(*category, *rule)
        })
}

/// Built-in snapshot for a preset.
pub fn builtin(name: PresetName) -> Policy {
    let every_5s = Duration::from_secs(5);
    match name {
        PresetName::Baseline => Policy::new(true, every_5s),
        PresetName::Stage1GroundCleanup => {
            staged(every_5s, &[(Category::BackgroundSection, GROUND)])
        }
        PresetName::Stage2TreeCleanup => staged(
            every_5s,
            &[
                (Category::BackgroundSection, GROUND),
                (Category::DecorationTree, TREES),
            ],
        ),
        PresetName::Stage3CollectibleCleanup => staged(
            every_5s,
            &[
                (Category::BackgroundSection, GROUND),
                (Category::DecorationTree, TREES),
                (Category::CollectibleRing, RINGS),
            ],
        ),
        PresetName::Stage4ObstacleCleanup | PresetName::Stage5Complete => {
            let interval = if name == PresetName::Stage5Complete {
                Duration::from_secs(10)
            } else {
                every_5s
            };
            staged(
                interval,
                &[
                    (Category::BackgroundSection, GROUND),
                    (Category::DecorationTree, TREES),
                    (Category::CollectibleRing, RINGS),
                    (Category::ObstacleCloud, CLOUDS),
                ],
            )
        }
        PresetName::ProductionAggressive => Policy::new(false, Duration::from_secs(30))
            .with_category(Category::BackgroundSection, CategoryPolicy::enabled(800.0, 6))
            .with_category(Category::DecorationTree, CategoryPolicy::enabled(600.0, 60))
            .with_category(Category::CollectibleRing, CategoryPolicy::enabled(500.0, 40))
            .with_category(Category::ObstacleCloud, CategoryPolicy::enabled(800.0, 20)),
    }
}

/// The set of presets the store can activate.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: BTreeMap<PresetName, Arc<Policy>>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        Self {
            presets: PresetName::ALL
                .into_iter()
                .map(|name| (name, Arc::new(builtin(name))))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            presets: BTreeMap::new(),
        }
    }

    pub fn with_preset(mut self, name: PresetName, policy: Policy) -> Self {
        self.presets.insert(name, Arc::new(policy));
        self
    }

    pub fn get(&self, name: PresetName) -> Option<Arc<Policy>> {
        self.presets.get(&name).cloned()
    }

    pub fn names(&self) -> Vec<PresetName> {
        self.presets.keys().copied().collect()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_enable_one_more_category_each() {
        let enabled: Vec<usize> = [
            PresetName::Baseline,
            PresetName::Stage1GroundCleanup,
            PresetName::Stage2TreeCleanup,
            PresetName::Stage3CollectibleCleanup,
            PresetName::Stage4ObstacleCleanup,
        ]
        .into_iter()
        .map(|name| builtin(name).enabled_rules().count())
        .collect();
        assert_eq!(enabled, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn names_parse_and_serialize_the_same_way() {
        for name in PresetName::ALL {
            assert_eq!(name.as_str().parse::<PresetName>(), Ok(name));
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
        assert!("EMERGENCY".parse::<PresetName>().is_err());
    }

    #[test]
    fn aggressive_preset_disables_logging() {
        let policy = builtin(PresetName::ProductionAggressive);
        assert!(!policy.logging_enabled());
        assert!(Category::ALL.iter().all(|c| policy.is_enabled(*c)));
    }
}
