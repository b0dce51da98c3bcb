//! The record arena.
//!
//! `World` owns every record of every match in ordered maps keyed by id, so
//! iteration order, serialization and hashing are deterministic. All
//! cross-references go through the insert and update methods here, which
//! enforce the referential rules a relational schema would otherwise enforce:
//!
//! - a province's land and a land's kingdom must belong to the same match
//! - units reference a live kingdom and unit type, which are protected from
//!   deletion while referenced
//! - deleting a land first detaches the provinces that reference it

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, RecordKind, Result};
use crate::hex::{ChunkCoord, Hex};
use crate::ids::{
    KingdomId, LandId, MatchId, ParticipantId, ProvinceId, TownId, TurnId, UnitId, UnitTypeId,
};
use crate::map_generation::GeneratedChunk;
use crate::model::{
    Chunk, ChunkMeta, Kingdom, Land, Match, Participant, Province, TerrainCell, Town, Turn,
    TurnStatus, Unit, UnitType, UnitTypeSpec, UNIT_STATUS_ACTIVE,
};
use crate::terrain::Terrain;
use crate::tiles::ChunkSource;

/// World file format version for compatibility.
pub const WORLD_FORMAT_VERSION: u32 = 2;

/// Versioned envelope written by [`World::to_bytes`].
#[derive(Serialize)]
struct WorldFileRef<'a> {
    version: u32,
    world: &'a World,
}

#[derive(Deserialize)]
struct WorldFile {
    version: u32,
    world: World,
}

/// All records of all matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    next_id: u64,
    matches: BTreeMap<MatchId, Match>,
    participants: BTreeMap<ParticipantId, Participant>,
    turns: BTreeMap<TurnId, Turn>,
    turn_slots: BTreeMap<(ParticipantId, u32), TurnId>,
    history: BTreeMap<(MatchId, u64), TurnId>,
    unit_types: BTreeMap<UnitTypeId, UnitType>,
    units: BTreeMap<UnitId, Unit>,
    kingdoms: BTreeMap<KingdomId, Kingdom>,
    lands: BTreeMap<LandId, Land>,
    provinces: BTreeMap<ProvinceId, Province>,
    towns: BTreeMap<TownId, Town>,
    town_positions: BTreeMap<(MatchId, Hex), TownId>,
    chunks: BTreeMap<(MatchId, ChunkCoord), Arc<Chunk>>,
}

/// Chunks of one match, as seen by a [`TileIndex`](crate::tiles::TileIndex).
#[derive(Debug, Clone, Copy)]
pub struct MatchChunks<'a> {
    world: &'a World,
    match_id: MatchId,
}

impl ChunkSource for MatchChunks<'_> {
    fn load_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.world.chunk(self.match_id, coord)
    }
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // --- Matches ---

    /// Register a new match. The `id` field of `record` is overwritten.
    pub fn insert_match(&mut self, mut record: Match) -> MatchId {
        let id = MatchId(self.allocate());
        record.id = id;
        self.matches.insert(id, record);
        id
    }

    /// Look up a match.
    pub fn match_record(&self, id: MatchId) -> Result<&Match> {
        self.matches
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Match, id))
    }

    /// Look up a match for mutation.
    pub fn match_mut(&mut self, id: MatchId) -> Result<&mut Match> {
        self.matches
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Match, id))
    }

    /// All matches in id order.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    // --- Participants ---

    /// Seat a new participant.
    ///
    /// # Errors
    ///
    /// Fails if the match or kingdom is unknown, the kingdom belongs to
    /// another match, or the seat is zero, above `max_players` or taken.
    pub fn add_participant(
        &mut self,
        match_id: MatchId,
        seat_order: u8,
        kingdom: Option<KingdomId>,
    ) -> Result<ParticipantId> {
        let max_players = self.match_record(match_id)?.max_players;
        if seat_order == 0 || seat_order > max_players {
            return Err(GameError::validation(format!(
                "seat {seat_order} outside 1..={max_players}"
            )));
        }
        if self
            .participants_in(match_id)
            .any(|p| p.seat_order == seat_order)
        {
            return Err(GameError::validation(format!("seat {seat_order} already taken")));
        }
        if let Some(kingdom) = kingdom {
            self.check_kingdom_in(kingdom, match_id)?;
        }

        let id = ParticipantId(self.allocate());
        self.participants.insert(
            id,
            Participant {
                id,
                match_id,
                seat_order,
                kingdom,
                is_active: true,
                last_resolved_turn: 0,
                max_turn_override: None,
            },
        );
        Ok(id)
    }

    /// Look up a participant.
    pub fn participant(&self, id: ParticipantId) -> Result<&Participant> {
        self.participants
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Participant, id))
    }

    /// Look up an active participant of `match_id`.
    ///
    /// Inactive seats and seats of other matches are reported as not found.
    pub fn active_participant(
        &self,
        match_id: MatchId,
        id: ParticipantId,
    ) -> Result<&Participant> {
        self.match_record(match_id)?;
        self.participants
            .get(&id)
            .filter(|p| p.match_id == match_id && p.is_active)
            .ok_or_else(|| GameError::not_found(RecordKind::Participant, id))
    }

    /// Look up a participant for mutation.
    pub fn participant_mut(&mut self, id: ParticipantId) -> Result<&mut Participant> {
        self.participants
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Participant, id))
    }

    /// Participants of a match in id order.
    pub fn participants_in(&self, match_id: MatchId) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(move |p| p.match_id == match_id)
    }

    // --- Turns ---

    /// Id of the turn at `number` on a participant's track, if created.
    #[must_use]
    pub fn turn_id(&self, participant: ParticipantId, number: u32) -> Option<TurnId> {
        self.turn_slots.get(&(participant, number)).copied()
    }

    /// Turn at `number` on a participant's track, if created.
    #[must_use]
    pub fn turn(&self, participant: ParticipantId, number: u32) -> Option<&Turn> {
        self.turn_id(participant, number)
            .and_then(|id| self.turns.get(&id))
    }

    /// Look up a turn by id for mutation.
    pub fn turn_mut(&mut self, id: TurnId) -> Result<&mut Turn> {
        self.turns
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Turn, id))
    }

    /// Turns of a participant in number order.
    pub fn turns_of(&self, participant: ParticipantId) -> impl Iterator<Item = &Turn> {
        self.turn_slots
            .range((participant, 0)..=(participant, u32::MAX))
            .filter_map(|(_, id)| self.turns.get(id))
    }

    /// Create a pending turn slot.
    ///
    /// # Errors
    ///
    /// Fails if the participant is unknown, belongs to another match, or the
    /// slot already exists.
    pub fn create_turn(
        &mut self,
        match_id: MatchId,
        participant_id: ParticipantId,
        number: u32,
        now: DateTime<Utc>,
    ) -> Result<TurnId> {
        let participant = self.participant(participant_id)?;
        if participant.match_id != match_id {
            return Err(GameError::not_found(RecordKind::Participant, participant_id));
        }
        if number == 0 {
            return Err(GameError::validation("turn numbers start at 1"));
        }
        if self.turn_slots.contains_key(&(participant_id, number)) {
            return Err(GameError::validation(format!(
                "turn {number} already exists for participant {participant_id}"
            )));
        }

        let id = TurnId(self.allocate());
        self.turns.insert(
            id,
            Turn {
                id,
                match_id,
                participant_id,
                number,
                history_index: None,
                status: TurnStatus::Pending,
                order: None,
                snapshot: None,
                created_at: now,
                resolved_at: None,
            },
        );
        self.turn_slots.insert((participant_id, number), id);
        Ok(id)
    }

    /// Hand out the next history index of a match and bind it to `turn`.
    ///
    /// # Errors
    ///
    /// Fails if the match or turn is unknown or the turn already has an index.
    pub fn assign_history_index(&mut self, match_id: MatchId, turn: TurnId) -> Result<u64> {
        let record = self
            .turns
            .get(&turn)
            .ok_or_else(|| GameError::not_found(RecordKind::Turn, turn))?;
        if record.history_index.is_some() {
            return Err(GameError::validation(format!(
                "turn {turn} already has a history index"
            )));
        }
        let game = self.match_mut(match_id)?;
        game.last_history_index += 1;
        let index = game.last_history_index;
        self.history.insert((match_id, index), turn);
        self.turn_mut(turn)?.history_index = Some(index);
        Ok(index)
    }

    /// Turn that received `index` in the match-wide history.
    #[must_use]
    pub fn turn_by_history(&self, match_id: MatchId, index: u64) -> Option<&Turn> {
        self.history
            .get(&(match_id, index))
            .and_then(|id| self.turns.get(id))
    }

    // --- Unit types and units ---

    /// Register a unit type.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty or already registered.
    pub fn add_unit_type(&mut self, spec: UnitTypeSpec) -> Result<UnitTypeId> {
        if spec.name.is_empty() {
            return Err(GameError::validation("unit type name must not be empty"));
        }
        if self.unit_type_by_name(&spec.name).is_some() {
            return Err(GameError::validation(format!(
                "unit type {} already exists",
                spec.name
            )));
        }
        let id = UnitTypeId(self.allocate());
        self.unit_types.insert(
            id,
            UnitType {
                id,
                name: spec.name,
                max_hp: spec.max_hp,
                attack: spec.attack,
                defense: spec.defense,
                move_points: spec.move_points,
            },
        );
        Ok(id)
    }

    /// Unit type registered under `name`, if any.
    #[must_use]
    pub fn unit_type_by_name(&self, name: &str) -> Option<&UnitType> {
        self.unit_types.values().find(|t| t.name == name)
    }

    /// Look up a unit type.
    pub fn unit_type(&self, id: UnitTypeId) -> Result<&UnitType> {
        self.unit_types
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::UnitType, id))
    }

    /// Spawn a unit at full health.
    ///
    /// # Errors
    ///
    /// Fails if the kingdom is not in `match_id` or the unit type is unknown.
    pub fn spawn_unit(
        &mut self,
        match_id: MatchId,
        owner: KingdomId,
        unit_type: UnitTypeId,
        position: Hex,
    ) -> Result<UnitId> {
        self.check_kingdom_in(owner, match_id)?;
        let hp = self.unit_type(unit_type)?.max_hp;
        let id = UnitId(self.allocate());
        self.units.insert(
            id,
            Unit {
                id,
                match_id,
                owner,
                unit_type,
                position,
                hp,
                status: UNIT_STATUS_ACTIVE.to_string(),
            },
        );
        Ok(id)
    }

    /// Look up a unit.
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Unit, id))
    }

    /// Look up a unit for mutation.
    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Unit, id))
    }

    /// Units of a match in id order.
    pub fn units_in(&self, match_id: MatchId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.match_id == match_id)
    }

    /// Remove a unit.
    pub fn delete_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.units
            .remove(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Unit, id))
    }

    /// Remove a unit type that no unit references.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if a unit still uses the type.
    pub fn delete_unit_type(&mut self, id: UnitTypeId) -> Result<UnitType> {
        self.unit_type(id)?;
        if self.units.values().any(|u| u.unit_type == id) {
            return Err(GameError::validation(format!(
                "unit type {id} is protected: referenced by units"
            )));
        }
        self.unit_types
            .remove(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::UnitType, id))
    }

    // --- Kingdoms, lands, provinces ---

    /// Create a kingdom.
    pub fn add_kingdom(&mut self, match_id: MatchId, name: impl Into<String>) -> Result<KingdomId> {
        self.match_record(match_id)?;
        let id = KingdomId(self.allocate());
        self.kingdoms.insert(
            id,
            Kingdom {
                id,
                match_id,
                name: name.into(),
            },
        );
        Ok(id)
    }

    /// Look up a kingdom.
    pub fn kingdom(&self, id: KingdomId) -> Result<&Kingdom> {
        self.kingdoms
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Kingdom, id))
    }

    /// Kingdoms of a match in id order.
    pub fn kingdoms_in(&self, match_id: MatchId) -> impl Iterator<Item = &Kingdom> {
        self.kingdoms.values().filter(move |k| k.match_id == match_id)
    }

    /// Remove a kingdom that no unit references.
    ///
    /// Lands it holds become unowned and participants playing it lose their
    /// kingdom reference.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if a unit still belongs to it.
    pub fn delete_kingdom(&mut self, id: KingdomId) -> Result<Kingdom> {
        self.kingdom(id)?;
        if self.units.values().any(|u| u.owner == id) {
            return Err(GameError::validation(format!(
                "kingdom {id} is protected: referenced by units"
            )));
        }
        for land in self.lands.values_mut().filter(|l| l.kingdom == Some(id)) {
            land.kingdom = None;
        }
        for participant in self
            .participants
            .values_mut()
            .filter(|p| p.kingdom == Some(id))
        {
            participant.kingdom = None;
        }
        self.kingdoms
            .remove(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Kingdom, id))
    }

    /// Create a land, optionally held by a kingdom of the same match.
    pub fn add_land(
        &mut self,
        match_id: MatchId,
        kingdom: Option<KingdomId>,
        name: impl Into<String>,
    ) -> Result<LandId> {
        self.match_record(match_id)?;
        if let Some(kingdom) = kingdom {
            self.check_kingdom_in(kingdom, match_id)?;
        }
        let id = LandId(self.allocate());
        self.lands.insert(
            id,
            Land {
                id,
                match_id,
                kingdom,
                name: name.into(),
            },
        );
        Ok(id)
    }

    /// Look up a land.
    pub fn land(&self, id: LandId) -> Result<&Land> {
        self.lands
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Land, id))
    }

    /// Lands of a match in id order.
    pub fn lands_in(&self, match_id: MatchId) -> impl Iterator<Item = &Land> {
        self.lands.values().filter(move |l| l.match_id == match_id)
    }

    /// Lands held by `kingdom`, lowest id first.
    pub fn lands_of(&self, kingdom: KingdomId) -> impl Iterator<Item = &Land> {
        self.lands
            .values()
            .filter(move |l| l.kingdom == Some(kingdom))
    }

    /// Change which kingdom holds a land.
    pub fn set_land_kingdom(&mut self, id: LandId, kingdom: Option<KingdomId>) -> Result<()> {
        let match_id = self.land(id)?.match_id;
        if let Some(kingdom) = kingdom {
            self.check_kingdom_in(kingdom, match_id)?;
        }
        if let Some(land) = self.lands.get_mut(&id) {
            land.kingdom = kingdom;
        }
        Ok(())
    }

    /// Remove a land, detaching every province that references it.
    pub fn delete_land(&mut self, id: LandId) -> Result<Land> {
        let land = self
            .lands
            .remove(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Land, id))?;
        for province in self.provinces.values_mut().filter(|p| p.land == Some(id)) {
            province.land = None;
        }
        Ok(land)
    }

    /// Create a province, optionally inside a land of the same match.
    pub fn add_province(
        &mut self,
        match_id: MatchId,
        land: Option<LandId>,
        name: impl Into<String>,
    ) -> Result<ProvinceId> {
        self.match_record(match_id)?;
        if let Some(land) = land {
            self.check_land_in(land, match_id)?;
        }
        let id = ProvinceId(self.allocate());
        self.provinces.insert(
            id,
            Province {
                id,
                match_id,
                land,
                name: name.into(),
            },
        );
        Ok(id)
    }

    /// Look up a province.
    pub fn province(&self, id: ProvinceId) -> Result<&Province> {
        self.provinces
            .get(&id)
            .ok_or_else(|| GameError::not_found(RecordKind::Province, id))
    }

    /// Provinces of a match in id order.
    pub fn provinces_in(&self, match_id: MatchId) -> impl Iterator<Item = &Province> {
        self.provinces
            .values()
            .filter(move |p| p.match_id == match_id)
    }

    /// Move a province into another land, or out of any land.
    pub fn set_province_land(&mut self, id: ProvinceId, land: Option<LandId>) -> Result<()> {
        let match_id = self.province(id)?.match_id;
        if let Some(land) = land {
            self.check_land_in(land, match_id)?;
        }
        if let Some(province) = self.provinces.get_mut(&id) {
            province.land = land;
        }
        Ok(())
    }

    /// Kingdom currently holding a province through its land.
    #[must_use]
    pub fn province_kingdom(&self, id: ProvinceId) -> Option<KingdomId> {
        let land = self.provinces.get(&id)?.land?;
        self.lands.get(&land)?.kingdom
    }

    fn check_kingdom_in(&self, kingdom: KingdomId, match_id: MatchId) -> Result<()> {
        match self.kingdoms.get(&kingdom) {
            Some(k) if k.match_id == match_id => Ok(()),
            Some(_) => Err(GameError::validation(format!(
                "kingdom {kingdom} belongs to another match"
            ))),
            None => Err(GameError::not_found(RecordKind::Kingdom, kingdom)),
        }
    }

    fn check_land_in(&self, land: LandId, match_id: MatchId) -> Result<()> {
        match self.lands.get(&land) {
            Some(l) if l.match_id == match_id => Ok(()),
            Some(_) => Err(GameError::validation(format!(
                "land {land} belongs to another match"
            ))),
            None => Err(GameError::not_found(RecordKind::Land, land)),
        }
    }

    // --- Towns ---

    /// Place a town.
    ///
    /// # Errors
    ///
    /// Fails if the province is not in `match_id`, already has a town, or
    /// another town occupies `position`.
    pub fn add_town(
        &mut self,
        match_id: MatchId,
        province: ProvinceId,
        position: Hex,
    ) -> Result<TownId> {
        if self.province(province)?.match_id != match_id {
            return Err(GameError::validation(format!(
                "province {province} belongs to another match"
            )));
        }
        if self.town_in_province(province).is_some() {
            return Err(GameError::validation(format!(
                "province {province} already has a town"
            )));
        }
        if self.town_positions.contains_key(&(match_id, position)) {
            return Err(GameError::validation(format!(
                "a town already stands at {position}"
            )));
        }
        let id = TownId(self.allocate());
        self.towns.insert(
            id,
            Town {
                id,
                match_id,
                province,
                position,
            },
        );
        self.town_positions.insert((match_id, position), id);
        Ok(id)
    }

    /// Town standing at `position`, if any.
    #[must_use]
    pub fn town_at(&self, match_id: MatchId, position: Hex) -> Option<&Town> {
        self.town_positions
            .get(&(match_id, position))
            .and_then(|id| self.towns.get(id))
    }

    /// Town of a province, if any.
    #[must_use]
    pub fn town_in_province(&self, province: ProvinceId) -> Option<&Town> {
        self.towns.values().find(|t| t.province == province)
    }

    /// Towns of a match in id order.
    pub fn towns_in(&self, match_id: MatchId) -> impl Iterator<Item = &Town> {
        self.towns.values().filter(move |t| t.match_id == match_id)
    }

    // --- Chunks ---

    /// Generated chunk at `coord`, if any.
    #[must_use]
    pub fn chunk(&self, match_id: MatchId, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.chunks.get(&(match_id, coord)).cloned()
    }

    /// Chunks of a match in coordinate order.
    pub fn chunks_in(&self, match_id: MatchId) -> impl Iterator<Item = &Arc<Chunk>> {
        let first = (match_id, ChunkCoord::new(i32::MIN, i32::MIN));
        let last = (match_id, ChunkCoord::new(i32::MAX, i32::MAX));
        self.chunks.range(first..=last).map(|(_, chunk)| chunk)
    }

    /// Tile source over the chunks of one match.
    #[must_use]
    pub const fn chunk_source(&self, match_id: MatchId) -> MatchChunks<'_> {
        MatchChunks {
            world: self,
            match_id,
        }
    }

    /// Install a generated chunk with its kingdoms, lands, provinces and towns.
    ///
    /// Installing a coordinate that already exists is a no-op returning the
    /// stored chunk; the second tuple element reports whether anything was
    /// created.
    ///
    /// # Errors
    ///
    /// Fails if the match is unknown or the chunk size differs from the
    /// match's chunk size.
    pub fn install_generated_chunk(
        &mut self,
        match_id: MatchId,
        generated: &GeneratedChunk,
    ) -> Result<(Arc<Chunk>, bool)> {
        let chunk_size = self.match_record(match_id)?.chunk_size;
        if generated.size != chunk_size {
            return Err(GameError::validation(format!(
                "chunk size {} differs from match chunk size {chunk_size}",
                generated.size
            )));
        }
        if let Some(existing) = self.chunk(match_id, generated.coord) {
            tracing::warn!(
                match_id = %match_id,
                chunk = %generated.coord,
                "Chunk already generated, keeping stored copy"
            );
            return Ok((existing, false));
        }

        let mut kingdom_ids = Vec::with_capacity(generated.kingdoms.len());
        for _ in &generated.kingdoms {
            let id = KingdomId(self.allocate());
            self.kingdoms.insert(
                id,
                Kingdom {
                    id,
                    match_id,
                    name: format!("Kingdom {id}"),
                },
            );
            kingdom_ids.push(id);
        }

        let mut land_ids = Vec::with_capacity(generated.lands.len());
        for land in &generated.lands {
            let id = LandId(self.allocate());
            self.lands.insert(
                id,
                Land {
                    id,
                    match_id,
                    kingdom: Some(kingdom_ids[land.kingdom]),
                    name: format!("Land {id}"),
                },
            );
            land_ids.push(id);
        }

        let mut province_ids = Vec::with_capacity(generated.provinces.len());
        for province in &generated.provinces {
            let id = ProvinceId(self.allocate());
            self.provinces.insert(
                id,
                Province {
                    id,
                    match_id,
                    land: Some(land_ids[province.land]),
                    name: format!("Province {id}"),
                },
            );
            province_ids.push(id);
        }

        let mut town_count = 0u32;
        for (index, province) in generated.provinces.iter().enumerate() {
            if let Some(position) = province.town {
                self.add_town(match_id, province_ids[index], position)?;
                town_count += 1;
            }
        }

        let cells = generated
            .cells
            .iter()
            .map(|cell| TerrainCell {
                hex: cell.hex,
                terrain: cell.terrain,
                province: Some(province_ids[cell.province]),
            })
            .collect();

        let chunk = Arc::new(Chunk {
            match_id,
            coord: generated.coord,
            size: generated.size,
            cells,
            meta: ChunkMeta {
                seed: generated.seed,
                province_count: generated.provinces.len() as u32,
                land_count: generated.lands.len() as u32,
                kingdom_count: generated.kingdoms.len() as u32,
                town_count,
            },
        });
        self.chunks
            .insert((match_id, generated.coord), Arc::clone(&chunk));

        tracing::info!(
            match_id = %match_id,
            chunk = %generated.coord,
            provinces = chunk.meta.province_count,
            lands = chunk.meta.land_count,
            kingdoms = chunk.meta.kingdom_count,
            towns = town_count,
            "Installed generated chunk"
        );

        Ok((chunk, true))
    }

    /// Overwrite the terrain of a generated cell.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if no chunk covers `hex`.
    pub fn paint_terrain(&mut self, match_id: MatchId, hex: Hex, terrain: Terrain) -> Result<()> {
        let coord = hex.chunk(self.match_record(match_id)?.chunk_size);
        let chunk = self
            .chunks
            .get_mut(&(match_id, coord))
            .ok_or_else(|| GameError::not_found(RecordKind::Chunk, coord))?;
        if Arc::make_mut(chunk).set_terrain(hex, terrain) {
            Ok(())
        } else {
            Err(GameError::not_found(RecordKind::Chunk, coord))
        }
    }

    // --- Persistence and verification ---

    /// Serialize the world with a format version header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&WorldFileRef {
            version: WORLD_FORMAT_VERSION,
            world: self,
        })
        .map_err(|e| GameError::Serialization(format!("Failed to serialize world: {e}")))
    }

    /// Deserialize a world written by [`World::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let file: WorldFile = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize world: {e}")))?;
        if file.version != WORLD_FORMAT_VERSION {
            return Err(GameError::Serialization(format!(
                "World version mismatch: expected {WORLD_FORMAT_VERSION}, got {}",
                file.version
            )));
        }
        Ok(file.world)
    }

    /// Hash of the complete world state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match bincode::serialize(self) {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => {
                tracing::warn!(error = %e, "World not serializable, hashing id counter only");
                self.next_id.hash(&mut hasher);
            }
        }
        let hash = hasher.finish();
        tracing::debug!(hash, "Computed world state hash");
        hash
    }

    /// Verify cross-record invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] naming the first violated invariant.
    pub fn check_invariants(&self) -> Result<()> {
        for province in self.provinces.values() {
            if let Some(land) = province.land {
                self.check_land_in(land, province.match_id)?;
            }
        }
        for land in self.lands.values() {
            if let Some(kingdom) = land.kingdom {
                self.check_kingdom_in(kingdom, land.match_id)?;
            }
        }
        for unit in self.units.values() {
            self.check_kingdom_in(unit.owner, unit.match_id)?;
            self.unit_type(unit.unit_type)?;
        }

        let mut seen_indices = BTreeSet::new();
        for turn in self.turns.values() {
            let participant = self.participant(turn.participant_id)?;
            let resolved = turn.status == TurnStatus::Resolved;
            if turn.number <= participant.last_resolved_turn && !resolved {
                return Err(GameError::validation(format!(
                    "turn {} of participant {} is behind the resolved counter but pending",
                    turn.number, participant.id
                )));
            }
            match turn.history_index {
                Some(index) => {
                    if !resolved {
                        return Err(GameError::validation(format!(
                            "unresolved turn {} has history index {index}",
                            turn.id
                        )));
                    }
                    let last = self.match_record(turn.match_id)?.last_history_index;
                    if index == 0 || index > last || !seen_indices.insert((turn.match_id, index)) {
                        return Err(GameError::validation(format!(
                            "history index {index} of turn {} is out of sequence",
                            turn.id
                        )));
                    }
                }
                None if resolved => {
                    return Err(GameError::validation(format!(
                        "resolved turn {} has no history index",
                        turn.id
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}
