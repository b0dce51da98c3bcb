//! # Wargame Core
//!
//! Deterministic turn engine for an asynchronous hex-grid strategy game.
//!
//! This crate contains the rules of the game and nothing else:
//! - No network surface
//! - No wall-clock reads outside the injected [`engine::Clock`]
//! - No system randomness (world generation is seeded)
//!
//! Each participant advances on their own turn track. A turn becomes
//! available once enough real time has passed since the match started, and
//! resolving it moves at most one unit along a hex path and may capture the
//! province it ends in. Every resolved turn is stamped with a match-wide
//! history index and a snapshot of unit and ownership state.
//!
//! ## Crate Structure
//!
//! - [`engine`] - Operation surface over a store and a clock
//! - [`world`] - Arena of all records, keyed by typed ids
//! - [`turn_gate`] - Real-time turn availability
//! - [`resolution`] - Applying one turn's order
//! - [`scheduler`] - Queueing orders and catching a track up
//! - [`map_generation`] - Seeded chunk generation
//! - [`pathfinding`] - Bounded A* over hex tiles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod hex;
pub mod ids;
pub mod map_generation;
pub mod model;
pub mod orders;
pub mod ownership;
pub mod pathfinding;
pub mod resolution;
pub mod scheduler;
pub mod setup;
pub mod snapshot;
pub mod store;
pub mod terrain;
pub mod tiles;
pub mod turn_gate;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::engine::{
        ChunkView, Clock, Engine, FixedClock, MatchState, OverrideTarget, ParticipantState,
        SystemClock, TownView, TurnRef, TurnState,
    };
    pub use crate::error::{ConflictReason, GameError, RecordKind, Result};
    pub use crate::hex::{ChunkCoord, Hex};
    pub use crate::ids::{
        KingdomId, LandId, MatchId, ParticipantId, ProvinceId, TownId, TurnId, UnitId, UnitTypeId,
    };
    pub use crate::map_generation::{GenerationConfig, SizeRange, TerrainMode};
    pub use crate::model::{
        Chunk, ChunkMeta, Match, Participant, TerrainCell, Turn, TurnStatus, Unit, UnitTypeSpec,
    };
    pub use crate::orders::{Order, OrderKind, OrderPayload};
    pub use crate::ownership::CaptureOutcome;
    pub use crate::resolution::{MoveOutcome, ResolvedTurn, TurnResult};
    pub use crate::scheduler::{QueueReport, ResolveReport};
    pub use crate::setup::{MatchSetup, MatchSummary, SeatSetup, SeatSummary};
    pub use crate::snapshot::{TurnSnapshot, UnitSnapshot};
    pub use crate::store::{MemoryStore, WorldStore};
    pub use crate::terrain::Terrain;
    pub use crate::world::World;
}
