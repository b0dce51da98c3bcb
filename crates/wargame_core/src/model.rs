//! Record definitions.
//!
//! Records are pure data. Cross references are ids into the
//! [`World`](crate::world::World) arena; the arena enforces referential rules.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hex::{ChunkCoord, Hex};
use crate::ids::{
    KingdomId, LandId, MatchId, ParticipantId, ProvinceId, TownId, TurnId, UnitId, UnitTypeId,
};
use crate::orders::OrderPayload;
use crate::snapshot::TurnSnapshot;
use crate::terrain::Terrain;

/// Status tag given to freshly spawned units.
pub const UNIT_STATUS_ACTIVE: &str = "active";

/// A match: the shared clock and world of a set of participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier.
    pub id: MatchId,
    /// Display name.
    pub name: String,
    /// Upper bound on seat numbers.
    pub max_players: u8,
    /// Real-time length of one turn, in seconds.
    pub turn_length_seconds: u32,
    /// Instant turn 1 unlocked. `None` until first observed.
    pub start_time: Option<DateTime<Utc>>,
    /// Global override that can only extend the unlockable horizon.
    pub max_turn_override: Option<u32>,
    /// Seed for world generation.
    pub world_seed: u64,
    /// Edge length of generated chunks, in cells.
    pub chunk_size: u32,
    /// Last history index handed out; 0 before any resolution.
    pub last_history_index: u64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// A seat in a match with its own private turn track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier.
    pub id: ParticipantId,
    /// Owning match.
    pub match_id: MatchId,
    /// Seat number, unique within the match.
    pub seat_order: u8,
    /// Kingdom this seat plays.
    pub kingdom: Option<KingdomId>,
    /// Inactive seats can neither order nor resolve.
    pub is_active: bool,
    /// Highest resolved turn on this seat's track.
    pub last_resolved_turn: u32,
    /// Optional per-seat cap on the unlockable horizon.
    pub max_turn_override: Option<u32>,
}

impl Participant {
    /// Next turn number this participant has not resolved yet.
    #[must_use]
    pub const fn next_turn(&self) -> u32 {
        self.last_resolved_turn + 1
    }
}

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Waiting for resolution; its order may still be replaced.
    #[default]
    Pending,
    /// Resolved; immutable apart from its stored snapshot.
    Resolved,
    /// Superseded without an order. Unused on per-participant tracks.
    Expired,
}

impl TurnStatus {
    /// Terminal states accept no further orders.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One slot on a participant's turn track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Identifier.
    pub id: TurnId,
    /// Owning match.
    pub match_id: MatchId,
    /// Owning participant.
    pub participant_id: ParticipantId,
    /// Position on the participant's track, starting at 1.
    pub number: u32,
    /// Match-wide sequence number, assigned at resolution.
    pub history_index: Option<u64>,
    /// Lifecycle state.
    pub status: TurnStatus,
    /// The single order for this turn, if one was submitted.
    pub order: Option<OrderPayload>,
    /// Snapshot stored at resolution. Shared, since snapshots are immutable.
    pub snapshot: Option<Arc<TurnSnapshot>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Resolution instant.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Movement and combat statistics shared by units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Identifier.
    pub id: UnitTypeId,
    /// Unique name.
    pub name: String,
    /// Hit points a fresh unit starts with.
    pub max_hp: u16,
    /// Attack strength.
    pub attack: u16,
    /// Defense strength.
    pub defense: u16,
    /// Per-turn movement budget.
    pub move_points: u32,
}

/// Parameters for registering a unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeSpec {
    /// Unique name.
    pub name: String,
    /// Hit points a fresh unit starts with.
    pub max_hp: u16,
    /// Attack strength.
    pub attack: u16,
    /// Defense strength.
    pub defense: u16,
    /// Per-turn movement budget.
    pub move_points: u32,
}

impl UnitTypeSpec {
    /// The default line infantry.
    #[must_use]
    pub fn infantry() -> Self {
        Self {
            name: "Infantry".to_string(),
            max_hp: 10,
            attack: 1,
            defense: 1,
            move_points: 3,
        }
    }

    /// Set the movement budget.
    #[must_use]
    pub const fn with_move_points(mut self, move_points: u32) -> Self {
        self.move_points = move_points;
        self
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Owning match.
    pub match_id: MatchId,
    /// Owning kingdom.
    pub owner: KingdomId,
    /// Statistics.
    pub unit_type: UnitTypeId,
    /// Current cell.
    pub position: Hex,
    /// Remaining hit points.
    pub hp: u16,
    /// Free-form status tag.
    pub status: String,
}

/// A kingdom: the top of the ownership hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kingdom {
    /// Identifier.
    pub id: KingdomId,
    /// Owning match.
    pub match_id: MatchId,
    /// Display name.
    pub name: String,
}

/// A group of provinces, optionally held by a kingdom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    /// Identifier.
    pub id: LandId,
    /// Owning match.
    pub match_id: MatchId,
    /// Holding kingdom.
    pub kingdom: Option<KingdomId>,
    /// Display name.
    pub name: String,
}

/// A contiguous group of cells, optionally part of a land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    /// Identifier.
    pub id: ProvinceId,
    /// Owning match.
    pub match_id: MatchId,
    /// Containing land.
    pub land: Option<LandId>,
    /// Display name.
    pub name: String,
}

/// A capturable cell inside a province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    /// Identifier.
    pub id: TownId,
    /// Owning match.
    pub match_id: MatchId,
    /// Province the town sits in.
    pub province: ProvinceId,
    /// Cell of the town.
    pub position: Hex,
}

/// A generated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Cell coordinate.
    pub hex: Hex,
    /// Terrain tag.
    pub terrain: Terrain,
    /// Province the cell belongs to.
    pub province: Option<ProvinceId>,
}

impl TerrainCell {
    /// Movement cost of entering this cell.
    #[must_use]
    pub const fn movement_cost(&self) -> Option<u32> {
        self.terrain.movement_cost()
    }
}

/// Generation metadata recorded with a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Chunk-local PRNG seed.
    pub seed: u64,
    /// Provinces generated.
    pub province_count: u32,
    /// Lands generated.
    pub land_count: u32,
    /// Kingdoms generated.
    pub kingdom_count: u32,
    /// Towns placed.
    pub town_count: u32,
}

/// A square block of generated cells.
///
/// Cells are stored column-major from the chunk origin: index `dq * size + dr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning match.
    pub match_id: MatchId,
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Edge length in cells.
    pub size: u32,
    /// All `size * size` cells.
    pub cells: Vec<TerrainCell>,
    /// Generation metadata.
    pub meta: ChunkMeta,
}

impl Chunk {
    /// Index of a cell in `cells`, or `None` if outside this chunk.
    fn cell_index(&self, hex: Hex) -> Option<usize> {
        let origin = self.coord.checked_origin(self.size)?;
        let dq = hex.q.checked_sub(origin.q)?;
        let dr = hex.r.checked_sub(origin.r)?;
        let size = i32::try_from(self.size).ok()?;
        if (0..size).contains(&dq) && (0..size).contains(&dr) {
            usize::try_from(dq * size + dr).ok()
        } else {
            None
        }
    }

    /// Cell at `hex`, if it lies in this chunk.
    #[must_use]
    pub fn cell(&self, hex: Hex) -> Option<&TerrainCell> {
        self.cell_index(hex).and_then(|index| self.cells.get(index))
    }

    /// Overwrite the terrain of one cell.
    /// Returns `false` if the cell is outside this chunk.
    pub fn set_terrain(&mut self, hex: Hex, terrain: Terrain) -> bool {
        match self.cell_index(hex).and_then(|index| self.cells.get_mut(index)) {
            Some(cell) => {
                cell.terrain = terrain;
                true
            }
            None => false,
        }
    }

    /// Distinct provinces referenced by this chunk, in first-seen order.
    #[must_use]
    pub fn province_ids(&self) -> Vec<ProvinceId> {
        let mut seen = std::collections::BTreeSet::new();
        self.cells
            .iter()
            .filter_map(|cell| cell.province)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plains_chunk(coord: ChunkCoord, size: u32) -> Chunk {
        let origin = coord.origin(size);
        let mut cells = Vec::new();
        for dq in 0..size as i32 {
            for dr in 0..size as i32 {
                cells.push(TerrainCell {
                    hex: Hex::new(origin.q + dq, origin.r + dr),
                    terrain: Terrain::Plains,
                    province: None,
                });
            }
        }
        Chunk {
            match_id: MatchId(1),
            coord,
            size,
            cells,
            meta: ChunkMeta::default(),
        }
    }

    #[test]
    fn test_cell_lookup_matches_coordinates() {
        let chunk = plains_chunk(ChunkCoord::new(-1, 2), 4);
        for cell in &chunk.cells {
            assert_eq!(chunk.cell(cell.hex).map(|c| c.hex), Some(cell.hex));
        }
        assert!(chunk.cell(Hex::new(0, 8)).is_none());
    }

    #[test]
    fn test_set_terrain() {
        let mut chunk = plains_chunk(ChunkCoord::new(0, 0), 4);
        assert!(chunk.set_terrain(Hex::new(1, 2), Terrain::Water));
        assert_eq!(chunk.cell(Hex::new(1, 2)).unwrap().terrain, Terrain::Water);
        assert!(!chunk.set_terrain(Hex::new(4, 0), Terrain::Water));
    }

    #[test]
    fn test_turn_status_terminal() {
        assert!(!TurnStatus::Pending.is_terminal());
        assert!(TurnStatus::Resolved.is_terminal());
        assert!(TurnStatus::Expired.is_terminal());
    }
}
