//! Test fixtures and helpers.
//!
//! Ready-made matches driven by a [`FixedClock`], with helpers to paint
//! terrain, place units and found towns without going through world
//! generation randomness.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use wargame_core::prelude::*;

/// Turn length used by fixture matches, in seconds.
pub const TEST_TURN_LENGTH_SECONDS: u32 = 3_600;

/// Seed used by fixture matches.
pub const TEST_SEED: u64 = 42;

/// Engine type used by fixtures.
pub type TestEngine = Engine<MemoryStore, Arc<FixedClock>>;

/// Instant every fixture clock starts at.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Generation settings for an all-plains chunk without towns.
///
/// Provinces are small so even tiny chunks hold a starter province per seat.
#[must_use]
pub fn plains_generation(size: u32) -> GenerationConfig {
    GenerationConfig::default()
        .with_size(size)
        .with_province_range(2, 6)
        .with_land_range(1, 3)
        .with_kingdom_range(1, 2)
        .with_towns(false)
        .with_terrain(TerrainMode::Uniform(Terrain::Plains))
}

/// A unit to place in a described fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Seat index (0-based) whose kingdom owns the unit.
    pub seat: usize,
    /// Cell to place the unit on.
    pub at: Hex,
    /// Movement budget.
    pub move_points: u32,
}

/// A fixture described in RON.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSpec {
    /// Chunk edge length.
    pub size: u32,
    /// Seats.
    pub players: u8,
    /// Keep the units spawned by match setup.
    pub keep_starter_units: bool,
    /// Terrain overrides.
    pub terrain: Vec<(Hex, Terrain)>,
    /// Units to place.
    pub units: Vec<UnitPlacement>,
    /// Town cells.
    pub towns: Vec<Hex>,
}

/// A running match with a controllable clock.
#[derive(Debug)]
pub struct TestMatch {
    /// Engine under test.
    pub engine: TestEngine,
    /// Clock shared with the engine.
    pub clock: Arc<FixedClock>,
    /// The match.
    pub match_id: MatchId,
    /// Seats in creation order.
    pub seats: Vec<SeatSummary>,
}

impl TestMatch {
    /// Create a started match on one all-plains chunk at the origin.
    ///
    /// # Panics
    ///
    /// Panics if match setup fails.
    #[must_use]
    pub fn plains(size: u32, players: u8) -> Self {
        let setup = MatchSetup {
            name: "fixture".to_string(),
            max_players: players,
            turn_length_seconds: TEST_TURN_LENGTH_SECONDS,
            world_seed: TEST_SEED,
            start_now: true,
            seats: vec![SeatSetup::default(); usize::from(players)],
            generation: plains_generation(size),
            ..MatchSetup::default()
        };
        Self::with_setup(&setup)
    }

    /// Create a match from an explicit setup.
    ///
    /// # Panics
    ///
    /// Panics if match setup fails.
    #[must_use]
    pub fn with_setup(setup: &MatchSetup) -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        let engine = Engine::new(
            MemoryStore::default(),
            Arc::clone(&clock),
            EngineConfig::default(),
        );
        let summary = engine
            .create_match(setup)
            .expect("fixture match setup failed");
        tracing::debug!(match_id = %summary.match_id, "Created fixture match");
        Self {
            engine,
            clock,
            match_id: summary.match_id,
            seats: summary.seats,
        }
    }

    /// Build a fixture from its RON description.
    ///
    /// # Panics
    ///
    /// Panics if the RON is malformed or any placement fails.
    #[must_use]
    pub fn from_ron(ron: &str) -> Self {
        let spec: FixtureSpec = ron::from_str(ron).expect("malformed fixture RON");
        let mut fixture = Self::plains(spec.size, spec.players);
        if !spec.keep_starter_units {
            fixture = fixture.without_starter_units();
        }
        for (hex, terrain) in spec.terrain {
            fixture.paint(hex, terrain);
        }
        for unit in spec.units {
            let kingdom = fixture.kingdom(unit.seat);
            fixture.place_unit(kingdom, unit.at, unit.move_points);
        }
        for town in spec.towns {
            fixture.place_town(town);
        }
        fixture
    }

    /// Delete every unit created by match setup.
    ///
    /// # Panics
    ///
    /// Panics if the store fails.
    #[must_use]
    pub fn without_starter_units(self) -> Self {
        let match_id = self.match_id;
        self.with_world(|world| {
            let ids: Vec<UnitId> = world.units_in(match_id).map(|u| u.id).collect();
            for id in ids {
                world.delete_unit(id)?;
            }
            Ok(())
        });
        self
    }

    /// Run a mutation against the world in one transaction.
    ///
    /// # Panics
    ///
    /// Panics if `f` fails.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> Result<R>) -> R {
        self.engine
            .store()
            .transaction(f)
            .expect("fixture world mutation failed")
    }

    /// Read the world.
    ///
    /// # Panics
    ///
    /// Panics if `f` fails.
    pub fn read<R>(&self, f: impl FnOnce(&World) -> Result<R>) -> R {
        self.engine
            .store()
            .read(f)
            .expect("fixture world read failed")
    }

    /// Participant of seat `index` (0-based).
    #[must_use]
    pub fn participant(&self, index: usize) -> ParticipantId {
        self.seats[index].participant_id
    }

    /// Kingdom of seat `index` (0-based).
    #[must_use]
    pub fn kingdom(&self, index: usize) -> KingdomId {
        self.seats[index].kingdom
    }

    /// Overwrite the terrain of one cell.
    pub fn paint(&self, hex: Hex, terrain: Terrain) {
        let match_id = self.match_id;
        self.with_world(|world| world.paint_terrain(match_id, hex, terrain));
    }

    /// Place a unit with the given movement budget.
    ///
    /// Unit types are registered on demand, one per budget.
    pub fn place_unit(&self, owner: KingdomId, at: Hex, move_points: u32) -> UnitId {
        let match_id = self.match_id;
        self.with_world(|world| {
            let spec = UnitTypeSpec {
                name: format!("Fixture ({move_points} mp)"),
                ..UnitTypeSpec::infantry().with_move_points(move_points)
            };
            let unit_type = match world.unit_type_by_name(&spec.name) {
                Some(existing) => existing.id,
                None => world.add_unit_type(spec)?,
            };
            world.spawn_unit(match_id, owner, unit_type, at)
        })
    }

    /// Found a town on a generated cell, in the cell's province.
    pub fn place_town(&self, at: Hex) -> TownId {
        let match_id = self.match_id;
        self.with_world(|world| {
            let chunk_size = world.match_record(match_id)?.chunk_size;
            let province = world
                .chunk(match_id, at.chunk(chunk_size))
                .and_then(|chunk| chunk.cell(at).and_then(|cell| cell.province))
                .ok_or_else(|| GameError::validation(format!("no province at {at}")))?;
            world.add_town(match_id, province, at)
        })
    }

    /// Province containing a generated cell.
    #[must_use]
    pub fn province_at(&self, at: Hex) -> ProvinceId {
        let match_id = self.match_id;
        self.read(|world| {
            let chunk_size = world.match_record(match_id)?.chunk_size;
            world
                .chunk(match_id, at.chunk(chunk_size))
                .and_then(|chunk| chunk.cell(at).and_then(|cell| cell.province))
                .ok_or_else(|| GameError::validation(format!("no province at {at}")))
        })
    }

    /// Current position of a unit.
    #[must_use]
    pub fn unit_position(&self, unit: UnitId) -> Hex {
        self.read(|world| Ok(world.unit(unit)?.position))
    }

    /// Move the clock forward by `turns` turn lengths.
    pub fn advance_turns(&self, turns: u32) {
        let seconds = i64::from(TEST_TURN_LENGTH_SECONDS) * i64::from(turns);
        self.clock.advance(Duration::seconds(seconds));
    }

    /// Submit an order for seat `index`.
    ///
    /// # Panics
    ///
    /// Panics if the submission is rejected.
    pub fn submit(&self, index: usize, order: OrderPayload) -> ResolvedTurn {
        self.engine
            .submit_order(self.match_id, self.participant(index), order)
            .expect("fixture order rejected")
    }

    /// State hash of the whole world.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.read(|world| Ok(world.state_hash()))
    }
}
