//! Saved world inspection.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wargame_core::prelude::*;
use wargame_core::turn_gate::{match_max_turn, participant_max_turn};

/// Progress of one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReport {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Seat number.
    pub seat_order: u8,
    /// Whether the seat can act.
    pub is_active: bool,
    /// Highest resolved turn.
    pub last_resolved_turn: u32,
    /// Horizon at inspection time.
    pub max_turn: u32,
    /// Units owned by the seat's kingdom.
    pub units: usize,
    /// Provinces held by the seat's kingdom.
    pub provinces: usize,
}

/// Summary of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Match id.
    pub match_id: MatchId,
    /// Display name.
    pub name: String,
    /// Turn length in seconds.
    pub turn_length_seconds: u32,
    /// Start instant, if started.
    pub start_time: Option<DateTime<Utc>>,
    /// Match horizon at inspection time.
    pub max_turn: u32,
    /// Highest history index handed out.
    pub last_history_index: u64,
    /// Generated chunk coordinates.
    pub chunks: Vec<ChunkCoord>,
    /// Town count.
    pub towns: usize,
    /// Seats in seat order.
    pub seats: Vec<SeatReport>,
}

/// Summary of a world file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldReport {
    /// Matches in id order.
    pub matches: Vec<MatchReport>,
    /// Hash of the whole world.
    pub state_hash: u64,
    /// First violated cross-record invariant, if any.
    pub invariant_error: Option<String>,
}

impl WorldReport {
    /// True if every invariant held.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.invariant_error.is_none()
    }
}

impl fmt::Display for WorldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "World hash {:016x}", self.state_hash)?;
        match &self.invariant_error {
            None => writeln!(f, "Invariants: ok")?,
            Some(error) => writeln!(f, "Invariants: VIOLATED ({error})")?,
        }
        for game in &self.matches {
            let started = game
                .start_time
                .map_or_else(|| "not started".to_string(), |t| t.to_rfc3339());
            writeln!(
                f,
                "\nMatch {} \"{}\": {}s turns, {}, max turn {}, {} history entries",
                game.match_id,
                game.name,
                game.turn_length_seconds,
                started,
                game.max_turn,
                game.last_history_index
            )?;
            let chunks: Vec<String> = game.chunks.iter().map(ToString::to_string).collect();
            writeln!(f, "  chunks [{}], {} towns", chunks.join("; "), game.towns)?;
            for seat in &game.seats {
                writeln!(
                    f,
                    "  seat {}{}: resolved {}/{}, {} units, {} provinces",
                    seat.seat_order,
                    if seat.is_active { "" } else { " (inactive)" },
                    seat.last_resolved_turn,
                    seat.max_turn,
                    seat.units,
                    seat.provinces
                )?;
            }
        }
        Ok(())
    }
}

/// Summarize every match in `world` as of `now`.
#[must_use]
pub fn inspect_world(world: &World, now: DateTime<Utc>) -> WorldReport {
    let matches = world
        .matches()
        .map(|game| {
            let seats = world
                .participants_in(game.id)
                .map(|p| {
                    let units = p.kingdom.map_or(0, |kingdom| {
                        world.units_in(game.id).filter(|u| u.owner == kingdom).count()
                    });
                    let provinces = p.kingdom.map_or(0, |kingdom| {
                        world
                            .provinces_in(game.id)
                            .filter(|pr| world.province_kingdom(pr.id) == Some(kingdom))
                            .count()
                    });
                    SeatReport {
                        participant_id: p.id,
                        seat_order: p.seat_order,
                        is_active: p.is_active,
                        last_resolved_turn: p.last_resolved_turn,
                        max_turn: participant_max_turn(game, p, now),
                        units,
                        provinces,
                    }
                })
                .collect();
            MatchReport {
                match_id: game.id,
                name: game.name.clone(),
                turn_length_seconds: game.turn_length_seconds,
                start_time: game.start_time,
                max_turn: match_max_turn(game, now),
                last_history_index: game.last_history_index,
                chunks: world.chunks_in(game.id).map(|c| c.coord).collect(),
                towns: world.towns_in(game.id).count(),
                seats,
            }
        })
        .collect();

    WorldReport {
        matches,
        state_hash: world.state_hash(),
        invariant_error: world.check_invariants().err().map(|e| e.to_string()),
    }
}

/// Load a world file into an engine on the system clock.
pub fn load_engine<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Engine> {
    let store = MemoryStore::load(path)?;
    Ok(Engine::new(store, SystemClock, config))
}

/// Load a world file and summarize it.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<WorldReport> {
    let engine = load_engine(path, EngineConfig::default())?;
    let now = engine.clock().now();
    engine.store().read(|world| Ok(inspect_world(world, now)))
}
