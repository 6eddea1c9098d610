//! Closed registry of tracked object kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of ephemeral world object the simulation spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Ground/background strips stitched ahead of the camera.
    #[serde(rename = "background.section")]
    BackgroundSection,
    #[serde(rename = "decoration.tree")]
    DecorationTree,
    #[serde(rename = "collectible.ring")]
    CollectibleRing,
    #[serde(rename = "obstacle.cloud")]
    ObstacleCloud,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("unknown category '{label}'")]
    Unknown { label: String },
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::BackgroundSection,
        Category::DecorationTree,
        Category::CollectibleRing,
        Category::ObstacleCloud,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::BackgroundSection => "background.section",
            Category::DecorationTree => "decoration.tree",
            Category::CollectibleRing => "collectible.ring",
            Category::ObstacleCloud => "obstacle.cloud",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == label)
            .ok_or_else(|| CategoryError::Unknown {
                label: label.to_string(),
            })
    }
}
