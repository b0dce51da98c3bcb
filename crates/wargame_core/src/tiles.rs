//! Read-through tile cache over generated chunks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::hex::{ChunkCoord, Hex};
use crate::model::{Chunk, TerrainCell};

/// Anything that can hand out generated chunks of one match.
pub trait ChunkSource {
    /// Load the chunk at `coord`, or `None` if it was never generated.
    fn load_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>>;
}

/// Cell lookup used by the pathfinder.
///
/// An absent cell is impassable and unknown, never an error.
pub trait TileLookup {
    /// Cell at `hex`, if generated.
    fn get_tile(&mut self, hex: Hex) -> Option<TerrainCell>;
}

/// Lazily loads chunks of one match and caches them for its own lifetime.
///
/// Missing chunks are cached too, so each chunk coordinate is loaded at most once.
#[derive(Debug)]
pub struct TileIndex<S> {
    source: S,
    chunk_size: u32,
    cache: HashMap<ChunkCoord, Option<Arc<Chunk>>>,
    loads: usize,
}

impl<S: ChunkSource> TileIndex<S> {
    /// Create an empty index over `source`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    #[must_use]
    pub fn new(source: S, chunk_size: u32) -> Self {
        assert!(chunk_size > 0, "TileIndex chunk_size must be positive");
        Self {
            source,
            chunk_size,
            cache: HashMap::new(),
            loads: 0,
        }
    }

    /// Chunk edge length used to address cells.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunk loads that reached the source.
    #[must_use]
    pub const fn loads(&self) -> usize {
        self.loads
    }

    fn chunk(&mut self, coord: ChunkCoord) -> Option<&Arc<Chunk>> {
        let source = &self.source;
        let loads = &mut self.loads;
        self.cache
            .entry(coord)
            .or_insert_with(|| {
                *loads += 1;
                source.load_chunk(coord)
            })
            .as_ref()
    }
}

impl<S: ChunkSource> TileLookup for TileIndex<S> {
    fn get_tile(&mut self, hex: Hex) -> Option<TerrainCell> {
        let coord = hex.chunk(self.chunk_size);
        self.chunk(coord).and_then(|chunk| chunk.cell(hex).copied())
    }
}

/// Plain map of cells, for hand-built test grids and tools.
impl TileLookup for HashMap<Hex, TerrainCell> {
    fn get_tile(&mut self, hex: Hex) -> Option<TerrainCell> {
        self.get(&hex).copied()
    }
}
