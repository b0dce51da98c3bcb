//! Town capture.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hex::Hex;
use crate::ids::{KingdomId, LandId, MatchId, ProvinceId};
use crate::world::World;

/// Effect of a unit entering a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// No town at the cell.
    #[default]
    None,
    /// The town's province is already held by the unit's kingdom.
    AlreadyOwned {
        /// Province containing the town.
        province: ProvinceId,
        /// Holding kingdom.
        kingdom: KingdomId,
    },
    /// The province changed hands.
    Captured {
        /// Province containing the town.
        province: ProvinceId,
        /// New holder.
        kingdom: KingdomId,
        /// Land the province now belongs to.
        land: LandId,
        /// Land the province belonged to before.
        previous_land: Option<LandId>,
    },
}

impl CaptureOutcome {
    /// Returns true if ownership changed.
    #[must_use]
    pub const fn is_captured(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }
}

/// Apply capture rules for `kingdom` entering `position`.
///
/// The captured province moves into the lowest-id land `kingdom` already
/// holds in the match; a new land is created only when it holds none.
pub fn capture(
    world: &mut World,
    match_id: MatchId,
    kingdom: KingdomId,
    position: Hex,
) -> Result<CaptureOutcome> {
    let Some(town) = world.town_at(match_id, position) else {
        return Ok(CaptureOutcome::None);
    };
    let province = town.province;

    if world.province_kingdom(province) == Some(kingdom) {
        return Ok(CaptureOutcome::AlreadyOwned { province, kingdom });
    }

    let previous_land = world.province(province)?.land;
    let existing = world
        .lands_of(kingdom)
        .find(|land| land.match_id == match_id)
        .map(|land| land.id);
    let land = match existing {
        Some(land) => land,
        None => {
            let name = format!("{} holdings", world.kingdom(kingdom)?.name);
            world.add_land(match_id, Some(kingdom), name)?
        }
    };
    world.set_province_land(province, Some(land))?;

    tracing::info!(
        match_id = %match_id,
        province = %province,
        kingdom = %kingdom,
        land = %land,
        "Town captured"
    );

    Ok(CaptureOutcome::Captured {
        province,
        kingdom,
        land,
        previous_land,
    })
}
