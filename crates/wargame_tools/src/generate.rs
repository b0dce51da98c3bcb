//! Region generation over one chunk or a rectangle of chunks.
//!
//! Generation is idempotent: chunks already present in the world are
//! reported and left untouched, so a range can be rerun against a saved
//! world to fill in only the gaps.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wargame_core::prelude::*;

/// Largest number of chunks one range may name.
pub const MAX_RANGE_CHUNKS: usize = 4_096;

/// Chunks to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionSelection {
    /// One chunk.
    Single(ChunkCoord),
    /// Every chunk with `q` in `from_q..=to_q` and `r` in `from_r..=to_r`.
    Range {
        /// First chunk column.
        from_q: i32,
        /// Last chunk column.
        to_q: i32,
        /// First chunk row.
        from_r: i32,
        /// Last chunk row.
        to_r: i32,
    },
}

impl RegionSelection {
    /// Coordinates in generation order: column by column, rows ascending.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a descending range or one naming more
    /// than [`MAX_RANGE_CHUNKS`] chunks.
    pub fn coords(&self) -> Result<Vec<ChunkCoord>> {
        match *self {
            Self::Single(coord) => Ok(vec![coord]),
            Self::Range {
                from_q,
                to_q,
                from_r,
                to_r,
            } => {
                if from_q > to_q || from_r > to_r {
                    return Err(GameError::validation(format!(
                        "range {from_q}..={to_q}, {from_r}..={to_r} must be ascending"
                    )));
                }
                let columns = i64::from(to_q) - i64::from(from_q) + 1;
                let rows = i64::from(to_r) - i64::from(from_r) + 1;
                let count = usize::try_from(columns * rows).unwrap_or(usize::MAX);
                if count > MAX_RANGE_CHUNKS {
                    return Err(GameError::validation(format!(
                        "range names {count} chunks, more than {MAX_RANGE_CHUNKS}"
                    )));
                }
                Ok((from_q..=to_q)
                    .flat_map(|q| (from_r..=to_r).map(move |r| ChunkCoord::new(q, r)))
                    .collect())
            }
        }
    }
}

/// What happened to one requested chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOutcome {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// False if the chunk already existed and was skipped.
    pub created: bool,
    /// Metadata of the stored chunk.
    pub meta: ChunkMeta,
}

/// Generate every selected chunk of `match_id` that does not exist yet.
///
/// # Errors
///
/// Stops at the first chunk that fails to generate; chunks before it stay
/// installed.
pub fn generate_regions<S: WorldStore, C: Clock>(
    engine: &Engine<S, C>,
    match_id: MatchId,
    seed: Option<u64>,
    selection: &RegionSelection,
    generation: &GenerationConfig,
) -> Result<Vec<RegionOutcome>> {
    let coords = selection.coords()?;
    let mut outcomes = Vec::with_capacity(coords.len());
    for coord in coords {
        let existed = engine
            .store()
            .read(|world| Ok(world.chunk(match_id, coord).is_some()))?;
        let chunk = engine.create_world_region(match_id, seed, coord, generation)?;
        if !existed {
            tracing::info!(
                chunk = %coord,
                provinces = chunk.meta.province_count,
                lands = chunk.meta.land_count,
                kingdoms = chunk.meta.kingdom_count,
                "Generated chunk"
            );
        }
        outcomes.push(RegionOutcome {
            coord,
            created: !existed,
            meta: chunk.meta,
        });
    }
    Ok(outcomes)
}

/// Open the world to generate into.
///
/// Loads `path` when it names an existing file and picks `match_id`, or the
/// first match. Otherwise starts an empty world and creates a match from
/// `setup`.
///
/// # Errors
///
/// Fails if the file cannot be loaded, the requested match is missing, or
/// match creation fails.
pub fn open_world(
    path: Option<&Path>,
    match_id: Option<MatchId>,
    setup: &MatchSetup,
) -> Result<(Engine, MatchId)> {
    if let Some(path) = path.filter(|p| p.exists()) {
        let engine = crate::inspect::load_engine(path, EngineConfig::default())?;
        let match_id = engine.store().read(|world| match match_id {
            Some(id) => Ok(world.match_record(id)?.id),
            None => world
                .matches()
                .next()
                .map(|game| game.id)
                .ok_or_else(|| GameError::not_found(RecordKind::Match, "any")),
        })?;
        tracing::info!(path = %path.display(), match_id = %match_id, "Extending world file");
        return Ok((engine, match_id));
    }

    let engine = Engine::in_memory(EngineConfig {
        generation: setup.generation,
        ..EngineConfig::default()
    });
    let summary = engine.create_match(setup)?;
    Ok((engine, summary.match_id))
}
