//! Match setup: seats, kingdoms, the starting region and starter units.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex::{ChunkCoord, Hex};
use crate::ids::{KingdomId, MatchId, ParticipantId, ProvinceId, UnitId, UnitTypeId};
use crate::map_generation::{generate_chunk, GenerationConfig};
use crate::model::{ChunkMeta, Match, UnitTypeSpec};
use crate::orders::OrderPayload;
use crate::pathfinding::find_path;
use crate::resolution::walk_path;
use crate::scheduler::{self, QueueReport};
use crate::tiles::{TileIndex, TileLookup};
use crate::turn_gate::participant_max_turn;
use crate::world::World;

/// One seat of a new match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatSetup {
    /// Seat number; the lowest free seat when `None`.
    pub seat_order: Option<u8>,
    /// Kingdom display name; `Kingdom <seat>` when `None`.
    pub kingdom_name: Option<String>,
    /// Inactive seats exist but cannot act.
    pub inactive: bool,
}

/// Parameters of a new match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSetup {
    /// Display name.
    pub name: String,
    /// Upper bound on seat numbers.
    pub max_players: u8,
    /// Turn length in seconds.
    pub turn_length_seconds: u32,
    /// World generation seed.
    pub world_seed: u64,
    /// Start the turn clock at creation.
    pub start_now: bool,
    /// Global max-turn override.
    pub max_turn_override: Option<u32>,
    /// Seats. Two default seats (or one, for single-seat matches) when empty.
    pub seats: Vec<SeatSetup>,
    /// Chunk to generate at creation, if any.
    pub initial_chunk: Option<ChunkCoord>,
    /// Generation settings; `generation.size` becomes the match chunk size.
    pub generation: GenerationConfig,
    /// Queue starter-unit marches toward the nearest town on every unlocked turn.
    pub auto_orders: bool,
}

impl Default for MatchSetup {
    fn default() -> Self {
        Self {
            name: "Skirmish".to_string(),
            max_players: 2,
            turn_length_seconds: crate::config::DEFAULT_TURN_LENGTH_SECONDS,
            world_seed: 0,
            start_now: false,
            max_turn_override: None,
            seats: Vec::new(),
            initial_chunk: Some(ChunkCoord::new(0, 0)),
            generation: GenerationConfig::default(),
            auto_orders: false,
        }
    }
}

/// A seat as created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSummary {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Seat number.
    pub seat_order: u8,
    /// Kingdom the seat plays.
    pub kingdom: KingdomId,
    /// Province granted at setup.
    pub starter_province: Option<ProvinceId>,
    /// Unit spawned at setup.
    pub starter_unit: Option<UnitId>,
}

/// Result of [`create_match`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// New match id.
    pub match_id: MatchId,
    /// Seats in creation order.
    pub seats: Vec<SeatSummary>,
    /// Metadata of the generated chunk, if one was generated.
    pub chunk: Option<ChunkMeta>,
}

/// Resolve seat numbers: explicit seats are checked first, then missing
/// seats take the lowest free numbers.
fn assign_seats(seats: &[SeatSetup], max_players: u8) -> Result<Vec<u8>> {
    let mut used = BTreeSet::new();
    for seat in seats.iter().filter_map(|s| s.seat_order) {
        if seat == 0 || seat > max_players {
            return Err(GameError::validation(format!(
                "seat_order {seat} exceeds max_players {max_players}"
            )));
        }
        if !used.insert(seat) {
            return Err(GameError::validation(format!("seat_order {seat} is duplicated")));
        }
    }

    let mut next_free = 1u8;
    let mut assigned = Vec::with_capacity(seats.len());
    for seat in seats {
        let number = match seat.seat_order {
            Some(number) => number,
            None => {
                while used.contains(&next_free) {
                    next_free = next_free.saturating_add(1);
                }
                if next_free > max_players {
                    return Err(GameError::validation(format!(
                        "more seats than max_players {max_players}"
                    )));
                }
                used.insert(next_free);
                next_free
            }
        };
        assigned.push(number);
    }
    Ok(assigned)
}

/// Get the default infantry type, registering it on first use.
fn infantry_type(world: &mut World) -> Result<UnitTypeId> {
    let spec = UnitTypeSpec::infantry();
    match world.unit_type_by_name(&spec.name) {
        Some(existing) => Ok(existing.id),
        None => world.add_unit_type(spec),
    }
}

/// Create a match with its seats, kingdoms and optional starting region.
///
/// When a chunk is generated, its lands are detached from the generated
/// kingdoms, every seat's kingdom receives a starter land holding one
/// distinct province, and an infantry unit is spawned on that province's
/// first cell.
///
/// # Errors
///
/// Returns [`GameError::Validation`] for invalid seats or generation
/// settings, or when the chunk has fewer usable provinces than seats.
pub fn create_match(
    world: &mut World,
    setup: &MatchSetup,
    now: DateTime<Utc>,
) -> Result<MatchSummary> {
    if setup.max_players == 0 {
        return Err(GameError::validation("max_players must be positive"));
    }
    if setup.turn_length_seconds == 0 {
        return Err(GameError::validation("turn_length_seconds must be positive"));
    }
    if setup.max_turn_override == Some(0) {
        return Err(GameError::validation("max_turn_override must be at least 1"));
    }
    setup.generation.validate()?;

    let seats = if setup.seats.is_empty() {
        vec![SeatSetup::default(); usize::from(setup.max_players.min(2))]
    } else {
        setup.seats.clone()
    };
    let seat_numbers = assign_seats(&seats, setup.max_players)?;

    let match_id = world.insert_match(Match {
        id: MatchId(0),
        name: setup.name.clone(),
        max_players: setup.max_players,
        turn_length_seconds: setup.turn_length_seconds,
        start_time: setup.start_now.then_some(now),
        max_turn_override: setup.max_turn_override,
        world_seed: setup.world_seed,
        chunk_size: setup.generation.size,
        last_history_index: 0,
        created_at: now,
    });

    let mut summaries = Vec::with_capacity(seats.len());
    for (seat, &seat_order) in seats.iter().zip(&seat_numbers) {
        let name = seat
            .kingdom_name
            .clone()
            .unwrap_or_else(|| format!("Kingdom {seat_order}"));
        let kingdom = world.add_kingdom(match_id, name)?;
        let participant_id = world.add_participant(match_id, seat_order, Some(kingdom))?;
        if seat.inactive {
            world.participant_mut(participant_id)?.is_active = false;
        }
        summaries.push(SeatSummary {
            participant_id,
            seat_order,
            kingdom,
            starter_province: None,
            starter_unit: None,
        });
    }

    let mut chunk_meta = None;
    if let Some(coord) = setup.initial_chunk {
        let generated = generate_chunk(setup.world_seed, coord, &setup.generation)?;
        let (chunk, _) = world.install_generated_chunk(match_id, &generated)?;
        chunk_meta = Some(chunk.meta);

        let generated_lands: Vec<_> = world.lands_in(match_id).map(|l| l.id).collect();
        for land in generated_lands {
            world.set_land_kingdom(land, None)?;
        }

        // First passable cell of every province, in cell order.
        let mut starters: Vec<(ProvinceId, Hex)> = Vec::new();
        let mut seen = BTreeSet::new();
        for cell in &chunk.cells {
            let Some(province) = cell.province else {
                continue;
            };
            if seen.insert(province) && cell.terrain.is_passable() {
                starters.push((province, cell.hex));
            }
        }
        if starters.len() < summaries.len() {
            return Err(GameError::validation(
                "not enough provinces for starter ownership",
            ));
        }

        let unit_type = infantry_type(world)?;
        for (summary, &(province, tile)) in summaries.iter_mut().zip(&starters) {
            let name = format!("{} heartland", world.kingdom(summary.kingdom)?.name);
            let land = world.add_land(match_id, Some(summary.kingdom), name)?;
            world.set_province_land(province, Some(land))?;
            let unit = world.spawn_unit(match_id, summary.kingdom, unit_type, tile)?;
            summary.starter_province = Some(province);
            summary.starter_unit = Some(unit);
        }
    }

    tracing::info!(
        match_id = %match_id,
        seats = summaries.len(),
        seed = setup.world_seed,
        chunk = ?setup.initial_chunk,
        "Created match"
    );

    Ok(MatchSummary {
        match_id,
        seats: summaries,
        chunk: chunk_meta,
    })
}

/// A town a starter unit is marching on.
struct March {
    target: Hex,
    province: ProvinceId,
    path: Vec<Hex>,
    index: usize,
}

/// Nearest reachable town, preferring towns outside `kingdom`'s holdings.
///
/// Towns are tried in distance order, ties broken by position.
fn nearest_town_march<T: TileLookup>(
    tiles: &mut T,
    from: Hex,
    towns: &[(Hex, ProvinceId)],
    holders: &BTreeMap<ProvinceId, Option<KingdomId>>,
    kingdom: KingdomId,
    blocked: &HashSet<Hex>,
    max_expansions: usize,
) -> Option<March> {
    let foreign: Vec<(Hex, ProvinceId)> = towns
        .iter()
        .copied()
        .filter(|(_, province)| holders.get(province).copied().flatten() != Some(kingdom))
        .collect();
    let mut candidates = if foreign.is_empty() {
        towns.to_vec()
    } else {
        foreign
    };
    candidates.sort_by_key(|(position, _)| (from.distance(*position), *position));

    candidates.into_iter().find_map(|(target, province)| {
        find_path(tiles, from, target, blocked, max_expansions).map(|path| March {
            target,
            province,
            path,
            index: 0,
        })
    })
}

/// Queue move orders that march every seat's starter unit on towns.
///
/// For each active seat with a starter unit, every turn from its next turn
/// up to its current horizon receives a move order toward the nearest town
/// not held by its kingdom. The march is simulated with the unit's movement
/// points: once a town would be reached its province counts as held and the
/// next town is picked. Seats with no reachable town get pass orders.
///
/// # Errors
///
/// Returns an error if the match or a seat record is missing.
pub fn queue_auto_orders(
    world: &mut World,
    summary: &MatchSummary,
    now: DateTime<Utc>,
    max_expansions: usize,
) -> Result<Vec<QueueReport>> {
    let match_id = summary.match_id;
    let game = world.match_record(match_id)?.clone();
    let towns: Vec<(Hex, ProvinceId)> = world
        .towns_in(match_id)
        .map(|town| (town.position, town.province))
        .collect();
    let mut holders: BTreeMap<ProvinceId, Option<KingdomId>> = world
        .provinces_in(match_id)
        .map(|province| (province.id, world.province_kingdom(province.id)))
        .collect();

    let mut plans = Vec::new();
    for seat in &summary.seats {
        let Some(unit_id) = seat.starter_unit else {
            continue;
        };
        let participant = world.participant(seat.participant_id)?;
        if !participant.is_active {
            continue;
        }
        let max_turn = participant_max_turn(&game, participant, now);
        let next_turn = participant.next_turn();
        let unit = world.unit(unit_id)?;
        let move_points = world.unit_type(unit.unit_type)?.move_points;
        let blocked: HashSet<Hex> = world
            .units_in(match_id)
            .filter(|other| other.id != unit_id)
            .map(|other| other.position)
            .collect();

        let mut tiles = TileIndex::new(world.chunk_source(match_id), game.chunk_size);
        let mut position = unit.position;
        let mut march: Option<March> = None;
        let mut orders = Vec::new();
        for _ in next_turn..=max_turn {
            if !matches!(&march, Some(m) if m.index + 1 < m.path.len()) {
                march = nearest_town_march(
                    &mut tiles,
                    position,
                    &towns,
                    &holders,
                    seat.kingdom,
                    &blocked,
                    max_expansions,
                );
            }
            let Some(current) = march.as_mut() else {
                orders.push(OrderPayload::pass());
                continue;
            };
            orders.push(OrderPayload::move_unit(unit_id, current.target));

            let remaining = &current.path[current.index..];
            let walk = walk_path(&mut tiles, remaining, &blocked, move_points);
            current.index += current
                .path
                .iter()
                .skip(current.index)
                .position(|hex| *hex == walk.reached)
                .unwrap_or(0);
            position = walk.reached;
            if position == current.target {
                holders.insert(current.province, Some(seat.kingdom));
                march = None;
            }
        }
        plans.push((seat.participant_id, max_turn, orders));
    }

    let mut reports = Vec::with_capacity(plans.len());
    for (participant_id, max_turn, orders) in plans {
        tracing::debug!(
            match_id = %match_id,
            participant_id = %participant_id,
            orders = orders.len(),
            "Planned starter march"
        );
        reports.push(scheduler::queue_orders(
            world,
            match_id,
            participant_id,
            &orders,
            max_turn,
            now,
        )?);
    }
    Ok(reports)
}
