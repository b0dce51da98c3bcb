//! Turn resolution.
//!
//! Resolving a pending turn consumes its single order (a pass when none was
//! submitted), applies movement and capture, stamps the next match-wide
//! history index and stores a snapshot. Orders that cannot achieve their
//! intent still resolve the turn with a typed [`MoveOutcome`]; only missing
//! records and conflicting turn state are errors.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConflictReason, GameError, RecordKind, Result};
use crate::hex::Hex;
use crate::ids::{MatchId, ParticipantId, UnitId};
use crate::model::TurnStatus;
use crate::orders::{Order, OrderPayload};
use crate::ownership::{self, CaptureOutcome};
use crate::pathfinding::find_path;
use crate::snapshot::TurnSnapshot;
use crate::tiles::{TileIndex, TileLookup};
use crate::world::World;

/// What an order achieved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// A pass order, or no order at all.
    #[default]
    Passed,
    /// The unit advanced at least one cell.
    Moved {
        /// Unit that moved.
        unit_id: UnitId,
        /// Start cell.
        from: Hex,
        /// Final cell.
        to: Hex,
        /// Movement points spent.
        spent: u32,
    },
    /// A path exists but no step was affordable.
    Stayed {
        /// Unit that stayed.
        unit_id: UnitId,
        /// Cell it stayed on.
        at: Hex,
        /// Movement points spent; always zero.
        spent: u32,
        /// Why no step was taken.
        reason: String,
    },
    /// No path to the destination.
    Blocked {
        /// Unit that could not move.
        unit_id: UnitId,
        /// Why.
        reason: String,
    },
    /// The order could not be carried out at all.
    Invalid {
        /// Why.
        reason: String,
    },
}

/// Stored result of a resolved turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnResult {
    /// Movement effect.
    pub outcome: MoveOutcome,
    /// Capture effect of the final cell.
    pub capture: CaptureOutcome,
}

/// Report returned for each resolved turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTurn {
    /// Participant whose track advanced.
    pub participant_id: ParticipantId,
    /// Turn number on that track.
    pub turn: u32,
    /// Match-wide history index assigned.
    pub history_index: u64,
    /// What the turn did.
    pub result: TurnResult,
}

/// Cells walked along a path within a movement budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Walk {
    pub(crate) reached: Hex,
    pub(crate) spent: u32,
}

/// Walk `path` from its second cell, stopping before the first step that is
/// blocked, unknown, impassable or unaffordable.
pub(crate) fn walk_path<T: TileLookup>(
    tiles: &mut T,
    path: &[Hex],
    blocked: &HashSet<Hex>,
    move_points: u32,
) -> Walk {
    let mut walk = Walk {
        reached: path.first().copied().unwrap_or_default(),
        spent: 0,
    };
    for &step in path.iter().skip(1) {
        if blocked.contains(&step) {
            break;
        }
        let Some(cost) = tiles.get_tile(step).and_then(|cell| cell.movement_cost()) else {
            break;
        };
        if walk.spent + cost > move_points {
            break;
        }
        walk.spent += cost;
        walk.reached = step;
    }
    walk
}

/// Apply a move order to the world.
fn resolve_move(
    world: &mut World,
    match_id: MatchId,
    unit_id: UnitId,
    destination: Hex,
    max_expansions: usize,
) -> Result<TurnResult> {
    let unit = match world.unit(unit_id) {
        Ok(unit) if unit.match_id == match_id => unit,
        _ => {
            return Ok(TurnResult {
                outcome: MoveOutcome::Invalid {
                    reason: "unit not found".to_string(),
                },
                capture: CaptureOutcome::None,
            })
        }
    };
    let start = unit.position;
    let owner = unit.owner;
    let move_points = world.unit_type(unit.unit_type)?.move_points;
    let chunk_size = world.match_record(match_id)?.chunk_size;

    let blocked: HashSet<Hex> = world
        .units_in(match_id)
        .filter(|other| other.id != unit_id)
        .map(|other| other.position)
        .collect();

    let (path, walk) = {
        let mut tiles = TileIndex::new(world.chunk_source(match_id), chunk_size);
        let Some(path) = find_path(&mut tiles, start, destination, &blocked, max_expansions)
        else {
            return Ok(TurnResult {
                outcome: MoveOutcome::Blocked {
                    unit_id,
                    reason: "no path".to_string(),
                },
                capture: CaptureOutcome::None,
            });
        };
        let walk = walk_path(&mut tiles, &path, &blocked, move_points);
        (path, walk)
    };
    tracing::debug!(
        unit = %unit_id,
        from = %start,
        to = %walk.reached,
        spent = walk.spent,
        path_length = path.len(),
        "Walked path"
    );

    if walk.reached == start {
        let reason = if path.len() == 1 {
            "already at destination"
        } else {
            "insufficient movement points"
        };
        return Ok(TurnResult {
            outcome: MoveOutcome::Stayed {
                unit_id,
                at: start,
                spent: 0,
                reason: reason.to_string(),
            },
            capture: CaptureOutcome::None,
        });
    }

    world.unit_mut(unit_id)?.position = walk.reached;
    let capture = ownership::capture(world, match_id, owner, walk.reached)?;

    Ok(TurnResult {
        outcome: MoveOutcome::Moved {
            unit_id,
            from: start,
            to: walk.reached,
            spent: walk.spent,
        },
        capture,
    })
}

/// Compute the effect of one order payload.
fn apply_order(
    world: &mut World,
    match_id: MatchId,
    payload: &OrderPayload,
    max_expansions: usize,
) -> Result<TurnResult> {
    match payload.validate() {
        Err(GameError::Validation(reason)) => Ok(TurnResult {
            outcome: MoveOutcome::Invalid { reason },
            capture: CaptureOutcome::None,
        }),
        Err(other) => Err(other),
        Ok(Order::Pass) => Ok(TurnResult::default()),
        Ok(Order::Move {
            unit_id,
            destination,
        }) => resolve_move(world, match_id, unit_id, destination, max_expansions),
    }
}

/// Resolve turn `number` of a participant.
///
/// The turn must exist, be pending, and be the participant's next turn.
///
/// # Errors
///
/// - [`GameError::NotFound`] for an unknown match, participant or turn
/// - [`GameError::Conflict`] if the turn is already resolved
/// - [`GameError::Validation`] if an earlier turn is still unresolved
pub fn resolve_turn(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    number: u32,
    now: DateTime<Utc>,
    max_expansions: usize,
) -> Result<ResolvedTurn> {
    let participant = world.active_participant(match_id, participant_id)?;
    let next_turn = participant.next_turn();
    let turn = world.turn(participant_id, number).ok_or_else(|| {
        GameError::not_found(RecordKind::Turn, format!("{participant_id}/{number}"))
    })?;
    let turn_id = turn.id;

    if turn.status.is_terminal() {
        return Err(GameError::Conflict(ConflictReason::TurnAlreadyResolved {
            turn: number,
        }));
    }
    if number > next_turn {
        return Err(GameError::validation(format!(
            "turn {number} cannot resolve before turn {next_turn}"
        )));
    }

    let payload = turn.order.clone().unwrap_or_default();
    let result = apply_order(world, match_id, &payload, max_expansions)?;

    let history_index = world.assign_history_index(match_id, turn_id)?;
    let snapshot = TurnSnapshot::capture(world, match_id, result.clone());
    let turn = world.turn_mut(turn_id)?;
    turn.status = TurnStatus::Resolved;
    turn.resolved_at = Some(now);
    turn.order = Some(payload);
    turn.snapshot = Some(Arc::new(snapshot));

    let participant = world.participant_mut(participant_id)?;
    if participant.last_resolved_turn < number {
        participant.last_resolved_turn = number;
    }

    tracing::info!(
        match_id = %match_id,
        participant_id = %participant_id,
        turn = number,
        history_index,
        outcome = ?result.outcome,
        "Turn resolved"
    );

    Ok(ResolvedTurn {
        participant_id,
        turn: number,
        history_index,
        result,
    })
}
