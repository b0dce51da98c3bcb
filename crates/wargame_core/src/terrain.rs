//! Terrain tags and movement costs.

use serde::{Deserialize, Serialize};

/// Movement cost charged for terrain this build does not recognise.
pub const DEFAULT_TERRAIN_COST: u32 = 1;

/// Terrain tag of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground (cost: 1).
    #[default]
    Plains,
    /// Woodland (cost: 2).
    Forest,
    /// Rough ground (cost: 2).
    Hills,
    /// Marsh (cost: 3).
    Swamp,
    /// Impassable.
    Water,
    /// Impassable.
    Mountain,
    /// A tag written by a newer build.
    #[serde(other)]
    Unknown,
}

impl Terrain {
    /// Movement cost of entering a cell with this terrain.
    /// Returns `None` for impassable terrain.
    #[must_use]
    pub const fn movement_cost(self) -> Option<u32> {
        match self {
            Self::Plains => Some(1),
            Self::Forest | Self::Hills => Some(2),
            Self::Swamp => Some(3),
            Self::Water | Self::Mountain => None,
            Self::Unknown => Some(DEFAULT_TERRAIN_COST),
        }
    }

    /// Returns true if units can enter this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        self.movement_cost().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_costs() {
        assert_eq!(Terrain::Plains.movement_cost(), Some(1));
        assert_eq!(Terrain::Forest.movement_cost(), Some(2));
        assert_eq!(Terrain::Hills.movement_cost(), Some(2));
        assert_eq!(Terrain::Swamp.movement_cost(), Some(3));
        assert_eq!(Terrain::Water.movement_cost(), None);
        assert_eq!(Terrain::Mountain.movement_cost(), None);
    }

    #[test]
    fn test_unknown_tag_defaults_to_cost_one() {
        let terrain: Terrain = serde_json::from_str("\"lava_field\"").unwrap();
        assert_eq!(terrain, Terrain::Unknown);
        assert_eq!(terrain.movement_cost(), Some(DEFAULT_TERRAIN_COST));
    }

    #[test]
    fn test_tags_are_snake_case() {
        assert_eq!(serde_json::to_string(&Terrain::Water).unwrap(), "\"water\"");
    }
}
