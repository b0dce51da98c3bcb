//! Turn creation, order queuing and catch-up resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConflictReason, GameError, Result};
use crate::ids::{MatchId, ParticipantId, TurnId};
use crate::orders::OrderPayload;
use crate::resolution::{resolve_turn, ResolvedTurn};
use crate::world::World;

/// Reason reported for orders that do not fit the unlocked horizon.
pub const SKIP_BEYOND_MAX_TURN: &str = "beyond max_turn";
/// Reason reported for orders aimed at an already resolved turn.
pub const SKIP_ALREADY_RESOLVED: &str = "turn already resolved";

/// An order stored on a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOrder {
    /// Turn number the order landed on.
    pub turn: u32,
    /// Turn record id.
    pub turn_id: TurnId,
    /// False if an earlier order on the same turn was replaced.
    pub created: bool,
}

/// An order that was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOrder {
    /// The order as submitted.
    pub order: OrderPayload,
    /// Turn it would have landed on.
    pub turn: u32,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of [`queue_orders`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueReport {
    /// Horizon the orders were checked against.
    pub max_turn: u32,
    /// Stored orders, in submission order.
    pub queued: Vec<QueuedOrder>,
    /// Orders that were not stored, in submission order.
    pub skipped: Vec<SkippedOrder>,
}

/// Result of [`resolve_until_max`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    /// Horizon resolution ran up to.
    pub max_turn: u32,
    /// Turns resolved, in order.
    pub resolved: Vec<ResolvedTurn>,
}

impl ResolveReport {
    /// Number of turns resolved.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

/// Fetch the turn slot, creating it if needed.
pub fn ensure_turn(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    number: u32,
    now: DateTime<Utc>,
) -> Result<TurnId> {
    match world.turn_id(participant_id, number) {
        Some(id) => Ok(id),
        None => world.create_turn(match_id, participant_id, number, now),
    }
}

/// Store `order` on a pending turn, replacing any earlier order.
///
/// Returns whether no order was present before.
///
/// # Errors
///
/// Returns [`GameError::Conflict`] if the turn is already resolved.
pub fn upsert_order(world: &mut World, turn_id: TurnId, order: OrderPayload) -> Result<bool> {
    let turn = world.turn_mut(turn_id)?;
    if turn.status.is_terminal() {
        return Err(GameError::Conflict(ConflictReason::TurnAlreadyResolved {
            turn: turn.number,
        }));
    }
    let created = turn.order.is_none();
    turn.order = Some(order);
    Ok(created)
}

/// Queue orders on consecutive unresolved turns of a participant.
///
/// The first order targets the participant's next turn and each stored order
/// moves the target one turn further. Orders whose target lies beyond
/// `max_turn` are skipped and reported. All payloads are validated before
/// anything is stored.
///
/// # Errors
///
/// - [`GameError::Validation`] if any payload is malformed
/// - [`GameError::NotFound`] for an unknown match or inactive participant
pub fn queue_orders(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    orders: &[OrderPayload],
    max_turn: u32,
    now: DateTime<Utc>,
) -> Result<QueueReport> {
    for order in orders {
        order.validate()?;
    }

    let mut next_turn = world.active_participant(match_id, participant_id)?.next_turn();
    let mut report = QueueReport {
        max_turn,
        ..QueueReport::default()
    };

    for order in orders {
        if next_turn > max_turn {
            tracing::warn!(
                match_id = %match_id,
                participant_id = %participant_id,
                turn = next_turn,
                max_turn,
                "Skipping order beyond max_turn"
            );
            report.skipped.push(SkippedOrder {
                order: order.clone(),
                turn: next_turn,
                reason: SKIP_BEYOND_MAX_TURN.to_string(),
            });
            continue;
        }

        if world
            .turn(participant_id, next_turn)
            .is_some_and(|t| t.status.is_terminal())
        {
            tracing::warn!(
                match_id = %match_id,
                participant_id = %participant_id,
                turn = next_turn,
                "Skipping order for resolved turn"
            );
            report.skipped.push(SkippedOrder {
                order: order.clone(),
                turn: next_turn,
                reason: SKIP_ALREADY_RESOLVED.to_string(),
            });
            next_turn += 1;
            continue;
        }

        let turn_id = ensure_turn(world, match_id, participant_id, next_turn, now)?;
        let created = upsert_order(world, turn_id, order.clone())?;
        report.queued.push(QueuedOrder {
            turn: next_turn,
            turn_id,
            created,
        });
        next_turn += 1;
    }

    tracing::info!(
        match_id = %match_id,
        participant_id = %participant_id,
        queued = report.queued.len(),
        skipped = report.skipped.len(),
        max_turn,
        "Queued orders"
    );

    Ok(report)
}

/// Store `order` on the participant's next turn and resolve it at once.
///
/// # Errors
///
/// - [`GameError::Validation`] if the payload is malformed
/// - [`GameError::Conflict`] with [`ConflictReason::TurnNotAvailable`] if
///   the next turn is beyond `max_turn`
pub fn submit_order(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    order: OrderPayload,
    max_turn: u32,
    now: DateTime<Utc>,
    max_expansions: usize,
) -> Result<ResolvedTurn> {
    order.validate()?;
    let next_turn = world.active_participant(match_id, participant_id)?.next_turn();
    if next_turn > max_turn {
        return Err(GameError::Conflict(ConflictReason::TurnNotAvailable {
            turn: next_turn,
            max_turn,
        }));
    }

    let turn_id = ensure_turn(world, match_id, participant_id, next_turn, now)?;
    upsert_order(world, turn_id, order)?;
    resolve_turn(world, match_id, participant_id, next_turn, now, max_expansions)
}

/// Resolve a participant's pending turns up to `max_turn`.
///
/// Turns without an order resolve as passes. The loop runs at most
/// `iteration_cap` times.
///
/// # Errors
///
/// Returns [`GameError::Conflict`] with [`ConflictReason::NoProgress`] if a
/// resolution leaves `last_resolved_turn` unchanged.
pub fn resolve_until_max(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    max_turn: u32,
    now: DateTime<Utc>,
    iteration_cap: usize,
    max_expansions: usize,
) -> Result<ResolveReport> {
    let mut report = ResolveReport {
        max_turn,
        resolved: Vec::new(),
    };

    for _ in 0..iteration_cap {
        let previous = world
            .active_participant(match_id, participant_id)?
            .last_resolved_turn;
        let next_turn = previous + 1;
        if next_turn > max_turn {
            return Ok(report);
        }

        ensure_turn(world, match_id, participant_id, next_turn, now)?;
        let resolved =
            resolve_turn(world, match_id, participant_id, next_turn, now, max_expansions)?;

        let current = world.participant(participant_id)?.last_resolved_turn;
        if current == previous {
            return Err(GameError::Conflict(ConflictReason::NoProgress {
                turn: next_turn,
                last_resolved_turn: current,
            }));
        }
        report.resolved.push(resolved);
    }

    tracing::warn!(
        match_id = %match_id,
        participant_id = %participant_id,
        iteration_cap,
        resolved = report.resolved.len(),
        "Resolve loop hit iteration cap"
    );
    Ok(report)
}
