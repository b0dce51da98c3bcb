//! Procedural world generation by three-level region growing.
//!
//! A chunk's cells are partitioned into provinces, provinces are grouped into
//! lands, and lands into kingdoms. Every level uses the same routine: pick a
//! random unassigned node, grow a group breadth-first through adjacency with
//! shuffled neighbor order until a random target size is reached, and repeat
//! until nothing is left. Groups only ever absorb adjacent nodes, so every
//! group is connected.
//!
//! # Determinism
//!
//! All randomness comes from one PRNG seeded by [`chunk_seed`] and consumed in
//! a fixed order: provinces, lands, kingdoms, terrain, towns. Identical inputs
//! always yield an identical [`GeneratedChunk`].

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex::{ChunkCoord, Hex};
use crate::terrain::Terrain;

/// Multiplier mixing the chunk column into the seed.
pub const CHUNK_Q_SEED_FACTOR: i64 = 1_000_003;
/// Multiplier mixing the chunk row into the seed.
pub const CHUNK_R_SEED_FACTOR: i64 = 2_000_003;
/// Largest accepted chunk edge length.
pub const MAX_CHUNK_SIZE: u32 = 256;

/// Inclusive size range for a grouping level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeRange {
    /// Smallest target size.
    pub min: u32,
    /// Largest target size.
    pub max: u32,
}

impl SizeRange {
    /// Create a range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn validate(self, level: &str) -> Result<()> {
        if self.min == 0 {
            return Err(GameError::validation(format!(
                "{level} range minimum must be at least 1"
            )));
        }
        if self.min > self.max {
            return Err(GameError::validation(format!(
                "{level} range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn sample(self, rng: &mut StdRng) -> usize {
        rng.random_range(self.min..=self.max) as usize
    }
}

/// How cell terrain is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainMode {
    /// Every cell gets the same terrain.
    Uniform(Terrain),
    /// Each province draws one terrain from a weighted table.
    ProvinceVaried,
}

impl Default for TerrainMode {
    fn default() -> Self {
        Self::Uniform(Terrain::Plains)
    }
}

/// Weighted terrain table for [`TerrainMode::ProvinceVaried`]. Weights sum to 100.
const PROVINCE_TERRAIN_WEIGHTS: [(Terrain, u32); 6] = [
    (Terrain::Plains, 45),
    (Terrain::Forest, 20),
    (Terrain::Hills, 15),
    (Terrain::Swamp, 10),
    (Terrain::Water, 5),
    (Terrain::Mountain, 5),
];

/// Chunk generation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chunk edge length in cells.
    pub size: u32,
    /// Cells per province.
    pub province_size: SizeRange,
    /// Provinces per land.
    pub land_group: SizeRange,
    /// Lands per kingdom.
    pub kingdom_group: SizeRange,
    /// Place one town per passable province.
    pub place_towns: bool,
    /// Terrain assignment.
    pub terrain: TerrainMode,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            size: 64,
            province_size: SizeRange::new(8, 24),
            land_group: SizeRange::new(8, 24),
            kingdom_group: SizeRange::new(1, 4),
            place_towns: true,
            terrain: TerrainMode::default(),
        }
    }
}

impl GenerationConfig {
    /// Set the chunk edge length.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set the province size range.
    #[must_use]
    pub const fn with_province_range(mut self, min: u32, max: u32) -> Self {
        self.province_size = SizeRange::new(min, max);
        self
    }

    /// Set the provinces-per-land range.
    #[must_use]
    pub const fn with_land_range(mut self, min: u32, max: u32) -> Self {
        self.land_group = SizeRange::new(min, max);
        self
    }

    /// Set the lands-per-kingdom range.
    #[must_use]
    pub const fn with_kingdom_range(mut self, min: u32, max: u32) -> Self {
        self.kingdom_group = SizeRange::new(min, max);
        self
    }

    /// Enable or disable town placement.
    #[must_use]
    pub const fn with_towns(mut self, place_towns: bool) -> Self {
        self.place_towns = place_towns;
        self
    }

    /// Set the terrain mode.
    #[must_use]
    pub const fn with_terrain(mut self, terrain: TerrainMode) -> Self {
        self.terrain = terrain;
        self
    }

    /// Check sizes and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] for a zero or oversized chunk, or a
    /// range with `min == 0` or `min > max`.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.size > MAX_CHUNK_SIZE {
            return Err(GameError::validation(format!(
                "chunk size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
                self.size
            )));
        }
        self.province_size.validate("province")?;
        self.land_group.validate("land")?;
        self.kingdom_group.validate("kingdom")
    }
}

/// A generated cell, referencing its province by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedCell {
    /// Cell coordinate.
    pub hex: Hex,
    /// Terrain tag.
    pub terrain: Terrain,
    /// Index into [`GeneratedChunk::provinces`].
    pub province: usize,
}

/// A generated province.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedProvince {
    /// Member cells, in growth order.
    pub tiles: Vec<Hex>,
    /// Index into [`GeneratedChunk::lands`].
    pub land: usize,
    /// Terrain shared by all member cells.
    pub terrain: Terrain,
    /// Town cell, if one was placed.
    pub town: Option<Hex>,
}

/// A generated land.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedLand {
    /// Member province indices, in growth order.
    pub provinces: Vec<usize>,
    /// Index into [`GeneratedChunk::kingdoms`].
    pub kingdom: usize,
}

/// A generated kingdom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedKingdom {
    /// Member land indices, in growth order.
    pub lands: Vec<usize>,
}

/// Output of [`generate_chunk`], with cross references as indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedChunk {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Edge length.
    pub size: u32,
    /// Chunk-local PRNG seed.
    pub seed: u64,
    /// All cells, column-major from the origin (`dq * size + dr`).
    pub cells: Vec<GeneratedCell>,
    /// Provinces.
    pub provinces: Vec<GeneratedProvince>,
    /// Lands.
    pub lands: Vec<GeneratedLand>,
    /// Kingdoms.
    pub kingdoms: Vec<GeneratedKingdom>,
}

impl GeneratedChunk {
    /// Number of towns placed.
    #[must_use]
    pub fn town_count(&self) -> usize {
        self.provinces.iter().filter(|p| p.town.is_some()).count()
    }

    /// Province adjacency derived from cell adjacency.
    #[must_use]
    pub fn province_adjacency(&self) -> Vec<BTreeSet<usize>> {
        let tile_to_province: HashMap<Hex, usize> =
            self.cells.iter().map(|c| (c.hex, c.province)).collect();
        build_province_adjacency(&tile_to_province, &self.cells, self.provinces.len())
    }

    /// Land adjacency derived from province adjacency.
    #[must_use]
    pub fn land_adjacency(&self) -> Vec<BTreeSet<usize>> {
        let province_land: Vec<usize> = self.provinces.iter().map(|p| p.land).collect();
        collapse_adjacency(&self.province_adjacency(), &province_land, self.lands.len())
    }
}

/// Derive the chunk-local seed from the world seed and chunk coordinate.
#[must_use]
pub fn chunk_seed(world_seed: u64, coord: ChunkCoord) -> u64 {
    let q_mix = i64::from(coord.q).wrapping_mul(CHUNK_Q_SEED_FACTOR) as u64;
    let r_mix = i64::from(coord.r).wrapping_mul(CHUNK_R_SEED_FACTOR) as u64;
    world_seed ^ q_mix ^ r_mix
}

/// Vector-backed set with O(1) removal and deterministic random choice.
struct Pool<N> {
    items: Vec<N>,
    positions: HashMap<N, usize>,
}

impl<N: Copy + Eq + Hash> Pool<N> {
    fn new(nodes: &[N]) -> Self {
        Self {
            items: nodes.to_vec(),
            positions: nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn contains(&self, node: N) -> bool {
        self.positions.contains_key(&node)
    }

    fn remove(&mut self, node: N) -> bool {
        let Some(index) = self.positions.remove(&node) else {
            return false;
        };
        self.items.swap_remove(index);
        if let Some(&moved) = self.items.get(index) {
            self.positions.insert(moved, index);
        }
        true
    }

    fn choose(&self, rng: &mut StdRng) -> Option<N> {
        self.items.choose(rng).copied()
    }
}

/// Grow one connected group from `seed` by breadth-first expansion.
fn grow_group<N, F>(
    seed: N,
    pool: &mut Pool<N>,
    rng: &mut StdRng,
    target_size: usize,
    neighbors: &mut F,
) -> Vec<N>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> Vec<N>,
{
    let mut group = Vec::new();
    let mut queue = VecDeque::from([seed]);
    let mut seen = HashSet::from([seed]);

    while group.len() < target_size {
        let Some(current) = queue.pop_front() else {
            break;
        };
        if !pool.remove(current) {
            continue;
        }
        group.push(current);

        let mut next = neighbors(current);
        next.shuffle(rng);
        for neighbor in next {
            if pool.contains(neighbor) && seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    group
}

/// Partition `nodes` into connected groups with random target sizes.
fn partition<N, F>(nodes: &[N], range: SizeRange, rng: &mut StdRng, mut neighbors: F) -> Vec<Vec<N>>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> Vec<N>,
{
    let mut pool = Pool::new(nodes);
    let mut groups = Vec::new();

    while !pool.is_empty() {
        let Some(seed) = pool.choose(rng) else {
            break;
        };
        let target_size = range.sample(rng);
        let group = grow_group(seed, &mut pool, rng, target_size, &mut neighbors);
        groups.push(group);
    }

    groups
}

fn build_province_adjacency(
    tile_to_province: &HashMap<Hex, usize>,
    cells: &[GeneratedCell],
    province_count: usize,
) -> Vec<BTreeSet<usize>> {
    let mut adjacency = vec![BTreeSet::new(); province_count];
    for cell in cells {
        for neighbor in cell.hex.neighbors() {
            if let Some(&other) = tile_to_province.get(&neighbor) {
                if other != cell.province {
                    adjacency[cell.province].insert(other);
                }
            }
        }
    }
    adjacency
}

/// Collapse node adjacency through a node-to-group mapping.
fn collapse_adjacency(
    adjacency: &[BTreeSet<usize>],
    group_of: &[usize],
    group_count: usize,
) -> Vec<BTreeSet<usize>> {
    let mut collapsed = vec![BTreeSet::new(); group_count];
    for (node, neighbors) in adjacency.iter().enumerate() {
        let group = group_of[node];
        for &neighbor in neighbors {
            let other = group_of[neighbor];
            if other != group {
                collapsed[group].insert(other);
            }
        }
    }
    collapsed
}

fn draw_terrain(rng: &mut StdRng) -> Terrain {
    let mut roll = rng.random_range(0..100u32);
    for (terrain, weight) in PROVINCE_TERRAIN_WEIGHTS {
        if roll < weight {
            return terrain;
        }
        roll -= weight;
    }
    Terrain::Plains
}

/// Generate one chunk.
///
/// # Errors
///
/// Returns [`GameError::Validation`] if `config` is invalid.
pub fn generate_chunk(
    world_seed: u64,
    coord: ChunkCoord,
    config: &GenerationConfig,
) -> Result<GeneratedChunk> {
    config.validate()?;

    let seed = chunk_seed(world_seed, coord);
    let mut rng = StdRng::seed_from_u64(seed);
    let size = config.size as i32;
    let origin = coord.checked_origin(config.size).ok_or_else(|| {
        GameError::validation(format!("chunk {coord} lies outside the addressable field"))
    })?;

    let tiles: Vec<Hex> = (0..size)
        .flat_map(|dq| (0..size).map(move |dr| Hex::new(origin.q + dq, origin.r + dr)))
        .collect();

    // 1. Provinces: connected groups of cells.
    let province_tiles = partition(&tiles, config.province_size, &mut rng, |hex| {
        hex.neighbors().to_vec()
    });
    let mut tile_to_province = HashMap::with_capacity(tiles.len());
    for (index, group) in province_tiles.iter().enumerate() {
        for &hex in group {
            tile_to_province.insert(hex, index);
        }
    }
    let mut cells: Vec<GeneratedCell> = tiles
        .iter()
        .map(|&hex| GeneratedCell {
            hex,
            terrain: Terrain::Plains,
            province: tile_to_province[&hex],
        })
        .collect();

    // 2. Lands: connected groups of provinces.
    let province_adjacency =
        build_province_adjacency(&tile_to_province, &cells, province_tiles.len());
    let province_ids: Vec<usize> = (0..province_tiles.len()).collect();
    let land_groups = partition(&province_ids, config.land_group, &mut rng, |p| {
        province_adjacency[p].iter().copied().collect()
    });
    let mut province_land = vec![0usize; province_tiles.len()];
    for (land, group) in land_groups.iter().enumerate() {
        for &province in group {
            province_land[province] = land;
        }
    }

    // 3. Kingdoms: connected groups of lands.
    let land_adjacency = collapse_adjacency(&province_adjacency, &province_land, land_groups.len());
    let land_ids: Vec<usize> = (0..land_groups.len()).collect();
    let kingdom_groups = partition(&land_ids, config.kingdom_group, &mut rng, |l| {
        land_adjacency[l].iter().copied().collect()
    });
    let mut land_kingdom = vec![0usize; land_groups.len()];
    for (kingdom, group) in kingdom_groups.iter().enumerate() {
        for &land in group {
            land_kingdom[land] = kingdom;
        }
    }

    // 4. Terrain, one draw per province in index order.
    let province_terrain: Vec<Terrain> = match config.terrain {
        TerrainMode::Uniform(terrain) => vec![terrain; province_tiles.len()],
        TerrainMode::ProvinceVaried => province_tiles
            .iter()
            .map(|_| draw_terrain(&mut rng))
            .collect(),
    };
    for cell in &mut cells {
        cell.terrain = province_terrain[cell.province];
    }

    // 5. Towns, one per passable province in index order.
    let provinces: Vec<GeneratedProvince> = province_tiles
        .into_iter()
        .enumerate()
        .map(|(index, tiles)| {
            let terrain = province_terrain[index];
            let town = if config.place_towns && terrain.is_passable() {
                tiles.choose(&mut rng).copied()
            } else {
                None
            };
            GeneratedProvince {
                tiles,
                land: province_land[index],
                terrain,
                town,
            }
        })
        .collect();

    let lands = land_groups
        .into_iter()
        .enumerate()
        .map(|(index, provinces)| GeneratedLand {
            provinces,
            kingdom: land_kingdom[index],
        })
        .collect();

    let kingdoms = kingdom_groups
        .into_iter()
        .map(|lands| GeneratedKingdom { lands })
        .collect();

    let chunk = GeneratedChunk {
        coord,
        size: config.size,
        seed,
        cells,
        provinces,
        lands,
        kingdoms,
    };

    tracing::debug!(
        chunk = %coord,
        seed,
        provinces = chunk.provinces.len(),
        lands = chunk.lands.len(),
        kingdoms = chunk.kingdoms.len(),
        towns = chunk.town_count(),
        "Generated chunk"
    );

    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Whether `members` form one connected component under `adjacent`.
    fn is_connected<N: Copy + Eq + Hash>(members: &[N], adjacent: impl Fn(N, N) -> bool) -> bool {
        let Some(&first) = members.first() else {
            return true;
        };
        let mut reached = HashSet::from([first]);
        let mut queue = VecDeque::from([first]);
        while let Some(current) = queue.pop_front() {
            for &other in members {
                if !reached.contains(&other) && adjacent(current, other) {
                    reached.insert(other);
                    queue.push_back(other);
                }
            }
        }
        reached.len() == members.len()
    }

    fn small_config() -> GenerationConfig {
        GenerationConfig::default()
            .with_size(16)
            .with_province_range(4, 8)
            .with_land_range(2, 4)
            .with_kingdom_range(1, 3)
    }

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.size, 64);
        assert_eq!(config.province_size, SizeRange::new(8, 24));
        assert_eq!(config.land_group, SizeRange::new(8, 24));
        assert_eq!(config.kingdom_group, SizeRange::new(1, 4));
        assert_eq!(config.terrain, TerrainMode::Uniform(Terrain::Plains));
    }

    #[test]
    fn test_size_four_seed_42_covers_sixteen_tiles() {
        let config = GenerationConfig::default().with_size(4);
        let chunk = generate_chunk(42, ChunkCoord::new(0, 0), &config).unwrap();

        assert!(!chunk.provinces.is_empty());
        assert_eq!(chunk.cells.len(), 16);
        let covered: usize = chunk.provinces.iter().map(|p| p.tiles.len()).sum();
        assert_eq!(covered, 16);
    }

    #[test]
    fn test_determinism() {
        let config = small_config().with_terrain(TerrainMode::ProvinceVaried);
        let chunk1 = generate_chunk(42, ChunkCoord::new(3, -2), &config).unwrap();
        let chunk2 = generate_chunk(42, ChunkCoord::new(3, -2), &config).unwrap();

        assert_eq!(chunk1, chunk2);
        assert_eq!(
            bincode::serialize(&chunk1).unwrap(),
            bincode::serialize(&chunk2).unwrap()
        );
    }

    #[test]
    fn test_different_coordinates_differ() {
        let config = small_config();
        let a = generate_chunk(42, ChunkCoord::new(0, 0), &config).unwrap();
        let b = generate_chunk(42, ChunkCoord::new(1, 0), &config).unwrap();

        assert_ne!(a.seed, b.seed);
        assert_eq!(b.cells[0].hex, Hex::new(16, 0));
    }

    #[test]
    fn test_every_cell_in_exactly_one_province() {
        let chunk = generate_chunk(7, ChunkCoord::new(-1, 1), &small_config()).unwrap();

        let mut seen = HashSet::new();
        for (index, province) in chunk.provinces.iter().enumerate() {
            assert!(!province.tiles.is_empty());
            for hex in &province.tiles {
                assert!(seen.insert(*hex), "Cell {hex} assigned twice");
                let cell = chunk.cells.iter().find(|c| c.hex == *hex).unwrap();
                assert_eq!(cell.province, index);
            }
        }
        assert_eq!(seen.len(), 16 * 16);
    }

    #[test]
    fn test_group_sizes_within_ranges() {
        let config = small_config();
        let chunk = generate_chunk(99, ChunkCoord::new(0, 0), &config).unwrap();

        for province in &chunk.provinces {
            assert!(province.tiles.len() <= config.province_size.max as usize);
        }
        for land in &chunk.lands {
            assert!(!land.provinces.is_empty());
            assert!(land.provinces.len() <= config.land_group.max as usize);
        }
        for kingdom in &chunk.kingdoms {
            assert!(!kingdom.lands.is_empty());
            assert!(kingdom.lands.len() <= config.kingdom_group.max as usize);
        }
    }

    #[test]
    fn test_all_groups_connected() {
        let chunk = generate_chunk(1234, ChunkCoord::new(0, 0), &small_config()).unwrap();

        for province in &chunk.provinces {
            assert!(is_connected(&province.tiles, |a, b| a.is_adjacent(b)));
        }

        let province_adjacency = chunk.province_adjacency();
        for land in &chunk.lands {
            assert!(is_connected(&land.provinces, |a, b| province_adjacency[a]
                .contains(&b)));
        }

        let land_adjacency = chunk.land_adjacency();
        for kingdom in &chunk.kingdoms {
            assert!(is_connected(&kingdom.lands, |a, b| land_adjacency[a].contains(&b)));
        }
    }

    #[test]
    fn test_hierarchy_indices_consistent() {
        let chunk = generate_chunk(5, ChunkCoord::new(2, 2), &small_config()).unwrap();

        for (index, land) in chunk.lands.iter().enumerate() {
            for &province in &land.provinces {
                assert_eq!(chunk.provinces[province].land, index);
            }
        }
        for (index, kingdom) in chunk.kingdoms.iter().enumerate() {
            for &land in &kingdom.lands {
                assert_eq!(chunk.lands[land].kingdom, index);
            }
        }
        let assigned: usize = chunk.lands.iter().map(|l| l.provinces.len()).sum();
        assert_eq!(assigned, chunk.provinces.len());
    }

    #[test]
    fn test_towns_inside_their_province() {
        let chunk = generate_chunk(11, ChunkCoord::new(0, 0), &small_config()).unwrap();

        assert_eq!(chunk.town_count(), chunk.provinces.len());
        for province in &chunk.provinces {
            let town = province.town.unwrap();
            assert!(province.tiles.contains(&town));
        }
    }

    #[test]
    fn test_towns_disabled() {
        let config = small_config().with_towns(false);
        let chunk = generate_chunk(11, ChunkCoord::new(0, 0), &config).unwrap();
        assert_eq!(chunk.town_count(), 0);
    }

    #[test]
    fn test_varied_terrain_is_uniform_within_province() {
        let config = small_config().with_terrain(TerrainMode::ProvinceVaried);
        let chunk = generate_chunk(8, ChunkCoord::new(0, 0), &config).unwrap();

        for cell in &chunk.cells {
            assert_eq!(cell.terrain, chunk.provinces[cell.province].terrain);
        }
        for province in &chunk.provinces {
            if !province.terrain.is_passable() {
                assert!(province.town.is_none());
            }
        }
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let origin = ChunkCoord::new(0, 0);
        for config in [
            GenerationConfig::default().with_size(0),
            GenerationConfig::default().with_size(MAX_CHUNK_SIZE + 1),
            GenerationConfig::default().with_province_range(0, 4),
            GenerationConfig::default().with_land_range(5, 4),
            GenerationConfig::default().with_kingdom_range(3, 1),
        ] {
            assert!(matches!(
                generate_chunk(1, origin, &config),
                Err(GameError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_chunk_seed_mixes_coordinates() {
        assert_eq!(chunk_seed(42, ChunkCoord::new(0, 0)), 42);
        assert_eq!(
            chunk_seed(42, ChunkCoord::new(1, 0)),
            42 ^ CHUNK_Q_SEED_FACTOR as u64
        );
        assert_ne!(
            chunk_seed(42, ChunkCoord::new(1, 2)),
            chunk_seed(42, ChunkCoord::new(2, 1))
        );
    }

    #[test]
    fn test_pool_remove_and_choose() {
        let mut pool = Pool::new(&[1, 2, 3, 4]);
        assert!(pool.remove(2));
        assert!(!pool.remove(2));
        assert!(pool.contains(4));
        assert!(!pool.contains(2));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert_ne!(pool.choose(&mut rng), Some(2));
        }
    }
}
