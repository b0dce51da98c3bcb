//! The engine facade.
//!
//! [`Engine`] is the synchronous API a transport layer calls. Each method is
//! one logical operation executed as a single store transaction, reading the
//! current time only through its [`Clock`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{GameError, RecordKind, Result};
use crate::hex::{ChunkCoord, Hex};
use crate::ids::{KingdomId, LandId, MatchId, ParticipantId, ProvinceId, TownId};
use crate::map_generation::{generate_chunk, GenerationConfig};
use crate::model::{Chunk, ChunkMeta, Match, TurnStatus};
use crate::orders::OrderPayload;
use crate::resolution::{ResolvedTurn, TurnResult};
use crate::scheduler::{self, QueueReport, ResolveReport};
use crate::setup::{self, MatchSetup, MatchSummary};
use crate::snapshot::TurnSnapshot;
use crate::store::{MemoryStore, WorldStore};
use crate::turn_gate::{match_max_turn, observe_start, participant_max_turn};
use crate::world::World;

/// Source of the current time.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven time, for tests and scripted runs.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock stopped at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Set the current instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Reference to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnRef {
    /// Turn `number` on a participant's own track.
    Participant {
        /// Participant.
        participant_id: ParticipantId,
        /// Turn number, starting at 1.
        number: u32,
    },
    /// Turn holding a match-wide history index.
    History(u64),
}

/// Target of a max-turn override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideTarget {
    /// The whole match; can only extend the horizon.
    Match,
    /// One participant; caps that participant's horizon.
    Participant(ParticipantId),
}

/// State of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    /// Owning participant.
    pub participant_id: ParticipantId,
    /// Turn number.
    pub turn: u32,
    /// Lifecycle state.
    pub status: TurnStatus,
    /// History index, once resolved.
    pub history_index: Option<u64>,
    /// Resolution instant, once resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Pending order, if any.
    pub order: Option<OrderPayload>,
    /// Stored snapshot for resolved turns; current state otherwise.
    pub snapshot: TurnSnapshot,
}

/// A town and the kingdom holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownView {
    /// Town id.
    pub id: TownId,
    /// Province the town sits in.
    pub province: ProvinceId,
    /// Town cell.
    pub position: Hex,
    /// Holder at the viewed point in time.
    pub kingdom: Option<KingdomId>,
}

/// A chunk with ownership at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkView {
    /// Cells and metadata.
    pub chunk: Arc<Chunk>,
    /// Generation metadata.
    pub meta: ChunkMeta,
    /// Land of every province in the chunk.
    pub province_to_land: BTreeMap<ProvinceId, Option<LandId>>,
    /// Kingdom of every land referenced above.
    pub land_to_kingdom: BTreeMap<LandId, Option<KingdomId>>,
    /// Towns in the chunk.
    pub towns: Vec<TownView>,
}

/// Per-participant clock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Seat number.
    pub seat_order: u8,
    /// Kingdom played.
    pub kingdom: Option<KingdomId>,
    /// Whether the seat can act.
    pub is_active: bool,
    /// Highest resolved turn.
    pub last_resolved_turn: u32,
    /// Highest unlockable turn now.
    pub max_turn: u32,
    /// Next turn to resolve.
    pub next_turn: u32,
    /// Per-seat override.
    pub max_turn_override: Option<u32>,
}

/// Match settings and clock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Match record.
    pub game: Match,
    /// Match-wide unlockable turn now.
    pub max_turn: u32,
    /// Seats in id order.
    pub participants: Vec<ParticipantState>,
}

/// Synchronous turn engine over a store and a clock.
#[derive(Debug)]
pub struct Engine<S = MemoryStore, C = SystemClock> {
    store: S,
    clock: C,
    config: EngineConfig,
}

impl Engine<MemoryStore, SystemClock> {
    /// Engine over an empty in-memory world and the system clock.
    #[must_use]
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(MemoryStore::default(), SystemClock, config)
    }
}

impl<S: WorldStore, C: Clock> Engine<S, C> {
    /// Create an engine.
    pub fn new(store: S, clock: C, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Clock.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a match with seats and, optionally, its starting region.
    ///
    /// With `setup.auto_orders`, starter units also get marching orders on
    /// every unlocked turn in the same transaction.
    pub fn create_match(&self, setup: &MatchSetup) -> Result<MatchSummary> {
        let now = self.clock.now();
        let max_expansions = self.config.max_path_expansions;
        self.store.transaction(|world| {
            let summary = setup::create_match(world, setup, now)?;
            if setup.auto_orders {
                setup::queue_auto_orders(world, &summary, now, max_expansions)?;
            }
            Ok(summary)
        })
    }

    /// Generate and install a chunk of a match.
    ///
    /// `seed` defaults to the match's world seed. Regenerating an existing
    /// coordinate returns the stored chunk unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if `generation.size` differs from
    /// the match's chunk size or a range is invalid.
    pub fn create_world_region(
        &self,
        match_id: MatchId,
        seed: Option<u64>,
        coord: ChunkCoord,
        generation: &GenerationConfig,
    ) -> Result<Arc<Chunk>> {
        self.store.transaction(|world| {
            let game = world.match_record(match_id)?;
            if let Some(existing) = world.chunk(match_id, coord) {
                tracing::warn!(match_id = %match_id, chunk = %coord, "Region already generated");
                return Ok(existing);
            }
            if generation.size != game.chunk_size {
                return Err(GameError::validation(format!(
                    "region size {} differs from match chunk size {}",
                    generation.size, game.chunk_size
                )));
            }
            let seed = seed.unwrap_or(game.world_seed);
            let generated = generate_chunk(seed, coord, generation)?;
            let (chunk, _) = world.install_generated_chunk(match_id, &generated)?;
            Ok(chunk)
        })
    }

    /// Store an order on the participant's next turn and resolve it.
    ///
    /// # Errors
    ///
    /// [`GameError::Conflict`] if the next turn is not unlocked yet.
    pub fn submit_order(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        order: OrderPayload,
    ) -> Result<ResolvedTurn> {
        let now = self.clock.now();
        let max_expansions = self.config.max_path_expansions;
        self.store.transaction(|world| {
            let max_turn = observed_max_turn(world, match_id, participant_id, now)?;
            scheduler::submit_order(
                world,
                match_id,
                participant_id,
                order,
                max_turn,
                now,
                max_expansions,
            )
        })
    }

    /// Queue orders on the participant's upcoming turns.
    pub fn queue_orders(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        orders: &[OrderPayload],
    ) -> Result<QueueReport> {
        let now = self.clock.now();
        self.store.transaction(|world| {
            let max_turn = observed_max_turn(world, match_id, participant_id, now)?;
            scheduler::queue_orders(world, match_id, participant_id, orders, max_turn, now)
        })
    }

    /// Resolve every unlocked turn of a participant.
    pub fn resolve_until_max(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
    ) -> Result<ResolveReport> {
        let now = self.clock.now();
        let cap = self.config.resolve_iteration_cap;
        let max_expansions = self.config.max_path_expansions;
        self.store.transaction(|world| {
            let max_turn = observed_max_turn(world, match_id, participant_id, now)?;
            scheduler::resolve_until_max(
                world,
                match_id,
                participant_id,
                max_turn,
                now,
                cap,
                max_expansions,
            )
        })
    }

    /// Status and snapshot of a turn.
    ///
    /// Resolved turns return their stored snapshot. Pending or not yet
    /// created turns return the current state.
    pub fn get_turn_state(&self, match_id: MatchId, turn: TurnRef) -> Result<TurnState> {
        self.store.read(|world| {
            world.match_record(match_id)?;
            match turn {
                TurnRef::History(index) => {
                    let record = world.turn_by_history(match_id, index).ok_or_else(|| {
                        GameError::not_found(RecordKind::Turn, format!("#{index}"))
                    })?;
                    Ok(turn_state(world, match_id, record.participant_id, record.number))
                }
                TurnRef::Participant {
                    participant_id,
                    number,
                } => {
                    if number == 0 {
                        return Err(GameError::validation("turn numbers start at 1"));
                    }
                    let participant = world.participant(participant_id)?;
                    if participant.match_id != match_id {
                        return Err(GameError::not_found(RecordKind::Participant, participant_id));
                    }
                    Ok(turn_state(world, match_id, participant_id, number))
                }
            }
        })
    }

    /// Cells of a chunk with ownership from live state or a resolved turn.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] for an ungenerated chunk or unknown turn;
    /// [`GameError::Validation`] if the referenced turn is not resolved.
    pub fn get_chunk(
        &self,
        match_id: MatchId,
        coord: ChunkCoord,
        at: Option<TurnRef>,
    ) -> Result<ChunkView> {
        self.store.read(|world| {
            world.match_record(match_id)?;
            let chunk = world
                .chunk(match_id, coord)
                .ok_or_else(|| GameError::not_found(RecordKind::Chunk, coord))?;
            let provinces = chunk.province_ids();

            let (province_to_land, land_to_kingdom) = match at {
                None => {
                    let province_to_land: BTreeMap<ProvinceId, Option<LandId>> = provinces
                        .iter()
                        .map(|&id| -> Result<_> { Ok((id, world.province(id)?.land)) })
                        .collect::<Result<_>>()?;
                    let land_to_kingdom: BTreeMap<LandId, Option<KingdomId>> = province_to_land
                        .values()
                        .flatten()
                        .map(|&land| -> Result<_> { Ok((land, world.land(land)?.kingdom)) })
                        .collect::<Result<_>>()?;
                    (province_to_land, land_to_kingdom)
                }
                Some(turn) => {
                    let snapshot = stored_snapshot(world, match_id, turn)?;
                    let province_to_land: BTreeMap<ProvinceId, Option<LandId>> = provinces
                        .iter()
                        .map(|&id| {
                            let land = snapshot.province_to_land.get(&id).copied().flatten();
                            (id, land)
                        })
                        .collect();
                    let land_to_kingdom: BTreeMap<LandId, Option<KingdomId>> = province_to_land
                        .values()
                        .flatten()
                        .map(|&land| {
                            let kingdom = snapshot.land_to_kingdom.get(&land).copied().flatten();
                            (land, kingdom)
                        })
                        .collect();
                    (province_to_land, land_to_kingdom)
                }
            };

            let towns = world
                .towns_in(match_id)
                .filter(|town| province_to_land.contains_key(&town.province))
                .map(|town| TownView {
                    id: town.id,
                    province: town.province,
                    position: town.position,
                    kingdom: province_to_land
                        .get(&town.province)
                        .copied()
                        .flatten()
                        .and_then(|land| land_to_kingdom.get(&land).copied().flatten()),
                })
                .collect();

            Ok(ChunkView {
                meta: chunk.meta,
                chunk,
                province_to_land,
                land_to_kingdom,
                towns,
            })
        })
    }

    /// Set or clear a max-turn override and return the resulting horizon.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for an override of zero.
    pub fn set_max_turn_override(
        &self,
        match_id: MatchId,
        target: OverrideTarget,
        value: Option<u32>,
    ) -> Result<u32> {
        if value == Some(0) {
            return Err(GameError::validation("max_turn override must be at least 1"));
        }
        let now = self.clock.now();
        self.store.transaction(|world| {
            let max_turn = match target {
                OverrideTarget::Match => {
                    let game = world.match_mut(match_id)?;
                    game.max_turn_override = value;
                    match_max_turn(game, now)
                }
                OverrideTarget::Participant(participant_id) => {
                    world.active_participant(match_id, participant_id)?;
                    world.participant_mut(participant_id)?.max_turn_override = value;
                    let game = world.match_record(match_id)?;
                    participant_max_turn(game, world.participant(participant_id)?, now)
                }
            };
            tracing::info!(
                match_id = %match_id,
                target = ?target,
                value = ?value,
                max_turn,
                "Max turn override updated"
            );
            Ok(max_turn)
        })
    }

    /// Settings, horizon and per-seat progress of a match.
    pub fn match_state(&self, match_id: MatchId) -> Result<MatchState> {
        let now = self.clock.now();
        self.store.read(|world| {
            let game = world.match_record(match_id)?;
            let participants = world
                .participants_in(match_id)
                .map(|p| ParticipantState {
                    participant_id: p.id,
                    seat_order: p.seat_order,
                    kingdom: p.kingdom,
                    is_active: p.is_active,
                    last_resolved_turn: p.last_resolved_turn,
                    max_turn: participant_max_turn(game, p, now),
                    next_turn: p.next_turn(),
                    max_turn_override: p.max_turn_override,
                })
                .collect();
            Ok(MatchState {
                game: game.clone(),
                max_turn: match_max_turn(game, now),
                participants,
            })
        })
    }
}

/// Record the start instant if unset, then compute the participant's horizon.
fn observed_max_turn(
    world: &mut World,
    match_id: MatchId,
    participant_id: ParticipantId,
    now: DateTime<Utc>,
) -> Result<u32> {
    world.active_participant(match_id, participant_id)?;
    observe_start(world.match_mut(match_id)?, now);
    let game = world.match_record(match_id)?;
    Ok(participant_max_turn(game, world.participant(participant_id)?, now))
}

fn turn_state(
    world: &World,
    match_id: MatchId,
    participant_id: ParticipantId,
    number: u32,
) -> TurnState {
    match world.turn(participant_id, number) {
        Some(turn) => TurnState {
            participant_id,
            turn: number,
            status: turn.status,
            history_index: turn.history_index,
            resolved_at: turn.resolved_at,
            order: turn.order.clone(),
            snapshot: turn
                .snapshot
                .as_deref()
                .cloned()
                .unwrap_or_else(|| TurnSnapshot::capture(world, match_id, TurnResult::default())),
        },
        None => TurnState {
            participant_id,
            turn: number,
            status: TurnStatus::Pending,
            history_index: None,
            resolved_at: None,
            order: None,
            snapshot: TurnSnapshot::capture(world, match_id, TurnResult::default()),
        },
    }
}

fn stored_snapshot(world: &World, match_id: MatchId, turn: TurnRef) -> Result<&TurnSnapshot> {
    let record = match turn {
        TurnRef::History(index) => world
            .turn_by_history(match_id, index)
            .ok_or_else(|| GameError::not_found(RecordKind::Turn, format!("#{index}")))?,
        TurnRef::Participant {
            participant_id,
            number,
        } => world
            .turn(participant_id, number)
            .filter(|t| t.match_id == match_id)
            .ok_or_else(|| {
                GameError::not_found(RecordKind::Turn, format!("{participant_id}/{number}"))
            })?,
    };
    record.snapshot.as_deref().ok_or_else(|| {
        GameError::validation(format!(
            "turn {} of participant {} is not resolved",
            record.number, record.participant_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::default();
        clock.advance(Duration::hours(3));
        assert_eq!(
            clock.now(),
            DateTime::<Utc>::UNIX_EPOCH + Duration::hours(3)
        );
        let shared = Arc::new(clock);
        shared.set(DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(shared.now(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_override_of_zero_rejected() {
        let engine = Engine::new(
            MemoryStore::default(),
            FixedClock::default(),
            EngineConfig::default(),
        );
        assert!(matches!(
            engine.set_max_turn_override(MatchId(1), OverrideTarget::Match, Some(0)),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_match_not_found() {
        let engine = Engine::new(
            MemoryStore::default(),
            FixedClock::default(),
            EngineConfig::default(),
        );
        assert!(matches!(
            engine.match_state(MatchId(99)),
            Err(GameError::NotFound {
                kind: RecordKind::Match,
                ..
            })
        ));
    }
}
