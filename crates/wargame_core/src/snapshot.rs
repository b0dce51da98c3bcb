//! Point-in-time world views stored on resolved turns.
//!
//! A snapshot is built once, at resolution, and stored verbatim. Reads of a
//! historical turn return the stored copy, never a recomputation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hex::Hex;
use crate::ids::{KingdomId, LandId, MatchId, ProvinceId, UnitId, UnitTypeId};
use crate::resolution::TurnResult;
use crate::world::World;

/// Snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A unit as it stood when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit id.
    pub id: UnitId,
    /// Owning kingdom.
    pub owner: KingdomId,
    /// Unit type.
    pub unit_type: UnitTypeId,
    /// Cell.
    pub position: Hex,
    /// Hit points.
    pub hp: u16,
    /// Status tag.
    pub status: String,
}

/// World state of one match after a turn resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Schema version, [`SNAPSHOT_VERSION`] when written by this build.
    pub version: u32,
    /// All units of the match, in id order.
    pub units: Vec<UnitSnapshot>,
    /// Land holding each province.
    pub province_to_land: BTreeMap<ProvinceId, Option<LandId>>,
    /// Kingdom holding each land.
    pub land_to_kingdom: BTreeMap<LandId, Option<KingdomId>>,
    /// What the turn did.
    pub result: TurnResult,
}

impl TurnSnapshot {
    /// Capture the current state of `match_id`.
    #[must_use]
    pub fn capture(world: &World, match_id: MatchId, result: TurnResult) -> Self {
        let units = world
            .units_in(match_id)
            .map(|unit| UnitSnapshot {
                id: unit.id,
                owner: unit.owner,
                unit_type: unit.unit_type,
                position: unit.position,
                hp: unit.hp,
                status: unit.status.clone(),
            })
            .collect();
        let province_to_land = world
            .provinces_in(match_id)
            .map(|p| (p.id, p.land))
            .collect();
        let land_to_kingdom = world
            .lands_in(match_id)
            .map(|l| (l.id, l.kingdom))
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            units,
            province_to_land,
            land_to_kingdom,
            result,
        }
    }

    /// Kingdom holding `province` in this snapshot.
    #[must_use]
    pub fn province_kingdom(&self, province: ProvinceId) -> Option<KingdomId> {
        let land = (*self.province_to_land.get(&province)?)?;
        *self.land_to_kingdom.get(&land)?
    }
}
