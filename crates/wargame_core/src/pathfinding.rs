//! Hex-grid pathfinding using the A* algorithm.
//!
//! Edge cost is the terrain movement cost of the cell being entered. The hex
//! distance heuristic is admissible because the cheapest step costs 1.
//! Equal-priority nodes are expanded in insertion order, so results are
//! identical across runs and platforms.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::hex::Hex;
use crate::tiles::TileLookup;

/// Default cap on node expansions per search.
pub const DEFAULT_MAX_EXPANSIONS: usize = 20_000;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    hex: Hex,
    /// Cost from the start when this entry was pushed.
    g_score: u32,
    /// f_score = g_score + heuristic
    f_score: u32,
    /// Insertion counter; earlier entries win ties.
    sequence: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Movement cost of entering `hex`, or `None` if absent or impassable.
fn step_cost<T: TileLookup>(tiles: &mut T, hex: Hex) -> Option<u32> {
    tiles.get_tile(hex).and_then(|cell| cell.movement_cost())
}

/// Find a minimum-cost path from `start` to `goal`.
///
/// Returns the cells from `start` to `goal` inclusive, or `None` when:
/// - `start` or `goal` is in `blocked`
/// - `start` or `goal` is absent or impassable
/// - no path exists
/// - more than `max_expansions` nodes were expanded
///
/// A search from a cell to itself returns the single-cell path.
#[must_use]
pub fn find_path<T: TileLookup>(
    tiles: &mut T,
    start: Hex,
    goal: Hex,
    blocked: &HashSet<Hex>,
    max_expansions: usize,
) -> Option<Vec<Hex>> {
    if start == goal {
        return Some(vec![start]);
    }

    if blocked.contains(&start) || blocked.contains(&goal) {
        return None;
    }

    if step_cost(tiles, start).is_none() || step_cost(tiles, goal).is_none() {
        return None;
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<Hex, Hex> = HashMap::new();
    let mut g_score: HashMap<Hex, u32> = HashMap::new();
    let mut sequence = 0u64;
    let mut expanded = 0usize;

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        hex: start,
        g_score: 0,
        f_score: start.distance(goal),
        sequence,
    });

    while let Some(current) = open_set.pop() {
        if current.hex == goal {
            let path = reconstruct_path(&came_from, goal);
            tracing::debug!(
                %start,
                %goal,
                expanded,
                length = path.len(),
                "Path found"
            );
            return Some(path);
        }

        // Skip stale entries superseded by a cheaper push.
        if g_score.get(&current.hex).is_some_and(|&g| g < current.g_score) {
            continue;
        }

        expanded += 1;
        if expanded > max_expansions {
            tracing::debug!(%start, %goal, max_expansions, "Path search hit expansion cap");
            return None;
        }

        for neighbor in current.hex.neighbors() {
            if blocked.contains(&neighbor) {
                continue;
            }

            let Some(cost) = step_cost(tiles, neighbor) else {
                continue;
            };

            let tentative_g = current.g_score + cost;
            let neighbor_g = g_score.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.hex);
                g_score.insert(neighbor, tentative_g);
                sequence += 1;
                open_set.push(AStarNode {
                    hex: neighbor,
                    g_score: tentative_g,
                    f_score: tentative_g + neighbor.distance(goal),
                    sequence,
                });
            }
        }
    }

    tracing::debug!(%start, %goal, expanded, "No path");
    None
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<Hex, Hex>, goal: Hex) -> Vec<Hex> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

/// Total cost of walking `path`, excluding the starting cell.
///
/// Returns `None` if any entered cell is absent or impassable.
#[must_use]
pub fn path_cost<T: TileLookup>(tiles: &mut T, path: &[Hex]) -> Option<u32> {
    path.iter()
        .skip(1)
        .try_fold(0u32, |total, &hex| Some(total + step_cost(tiles, hex)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TerrainCell;
    use crate::terrain::Terrain;

    /// Rectangular grid of plains with q in 0..width and r in 0..height.
    fn grid(width: i32, height: i32) -> HashMap<Hex, TerrainCell> {
        let mut cells = HashMap::new();
        for q in 0..width {
            for r in 0..height {
                let hex = Hex::new(q, r);
                cells.insert(
                    hex,
                    TerrainCell {
                        hex,
                        terrain: Terrain::Plains,
                        province: None,
                    },
                );
            }
        }
        cells
    }

    fn paint(cells: &mut HashMap<Hex, TerrainCell>, hex: Hex, terrain: Terrain) {
        if let Some(cell) = cells.get_mut(&hex) {
            cell.terrain = terrain;
        }
    }

    fn search(cells: &mut HashMap<Hex, TerrainCell>, start: Hex, goal: Hex) -> Option<Vec<Hex>> {
        find_path(cells, start, goal, &HashSet::new(), DEFAULT_MAX_EXPANSIONS)
    }

    fn assert_contiguous(path: &[Hex]) {
        for pair in path.windows(2) {
            assert!(
                pair[0].is_adjacent(pair[1]),
                "Path jumps from {} to {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_straight_path_on_plains() {
        let mut cells = grid(10, 10);
        let path = search(&mut cells, Hex::new(5, 5), Hex::new(8, 5)).unwrap();

        assert_eq!(
            path,
            vec![
                Hex::new(5, 5),
                Hex::new(6, 5),
                Hex::new(7, 5),
                Hex::new(8, 5)
            ]
        );
        assert_eq!(path_cost(&mut cells, &path), Some(3));
    }

    #[test]
    fn test_path_to_same_cell() {
        let mut cells = grid(10, 10);
        let path = search(&mut cells, Hex::new(5, 5), Hex::new(5, 5)).unwrap();
        assert_eq!(path, vec![Hex::new(5, 5)]);
    }

    #[test]
    fn test_path_around_water() {
        let mut cells = grid(10, 10);
        // Wall of water along q = 5, with a gap at r = 9.
        for r in 0..9 {
            paint(&mut cells, Hex::new(5, r), Terrain::Water);
        }

        let path = search(&mut cells, Hex::new(2, 4), Hex::new(8, 4)).unwrap();

        assert_contiguous(&path);
        for hex in &path {
            assert_ne!(cells[hex].terrain, Terrain::Water, "Path crosses water at {hex}");
        }
        assert!(path.contains(&Hex::new(5, 9)));
    }

    #[test]
    fn test_no_path_exists() {
        let mut cells = grid(10, 10);
        for r in 0..10 {
            paint(&mut cells, Hex::new(5, r), Terrain::Mountain);
        }

        assert!(search(&mut cells, Hex::new(2, 5), Hex::new(8, 5)).is_none());
    }

    #[test]
    fn test_impassable_goal() {
        let mut cells = grid(10, 10);
        paint(&mut cells, Hex::new(8, 5), Terrain::Water);

        assert!(search(&mut cells, Hex::new(5, 5), Hex::new(8, 5)).is_none());
    }

    #[test]
    fn test_absent_goal() {
        let mut cells = grid(10, 10);
        assert!(search(&mut cells, Hex::new(5, 5), Hex::new(50, 5)).is_none());
    }

    #[test]
    fn test_blocked_start_or_goal() {
        let mut cells = grid(10, 10);
        let blocked: HashSet<Hex> = [Hex::new(8, 5)].into_iter().collect();

        assert!(find_path(
            &mut cells,
            Hex::new(5, 5),
            Hex::new(8, 5),
            &blocked,
            DEFAULT_MAX_EXPANSIONS
        )
        .is_none());
        assert!(find_path(
            &mut cells,
            Hex::new(8, 5),
            Hex::new(5, 5),
            &blocked,
            DEFAULT_MAX_EXPANSIONS
        )
        .is_none());
    }

    #[test]
    fn test_routes_around_blocked_cells() {
        let mut cells = grid(10, 10);
        let blocked: HashSet<Hex> = [Hex::new(6, 5)].into_iter().collect();

        let path = find_path(
            &mut cells,
            Hex::new(5, 5),
            Hex::new(8, 5),
            &blocked,
            DEFAULT_MAX_EXPANSIONS,
        )
        .unwrap();

        assert_contiguous(&path);
        assert!(!path.contains(&Hex::new(6, 5)));
        assert_eq!(path_cost(&mut cells, &path), Some(4));
    }

    #[test]
    fn test_prefers_cheaper_terrain() {
        let mut cells = grid(10, 10);
        paint(&mut cells, Hex::new(6, 5), Terrain::Swamp);
        paint(&mut cells, Hex::new(7, 5), Terrain::Swamp);

        let path = search(&mut cells, Hex::new(5, 5), Hex::new(8, 5)).unwrap();

        assert_contiguous(&path);
        // Straight through the swamp costs 7; a detour costs 4.
        assert_eq!(path_cost(&mut cells, &path), Some(4));
    }

    #[test]
    fn test_expansion_cap() {
        let mut cells = grid(30, 30);
        let start = Hex::new(0, 0);
        let goal = Hex::new(29, 29);

        assert!(find_path(&mut cells, start, goal, &HashSet::new(), 5).is_none());
        let unbounded = find_path(&mut cells, start, goal, &HashSet::new(), DEFAULT_MAX_EXPANSIONS);
        assert!(unbounded.is_some());
    }

    #[test]
    fn test_determinism() {
        let mut cells = grid(20, 20);
        for r in 5..15 {
            paint(&mut cells, Hex::new(10, r), Terrain::Water);
        }

        let path1 = search(&mut cells, Hex::new(5, 10), Hex::new(15, 10)).unwrap();
        let path2 = search(&mut cells, Hex::new(5, 10), Hex::new(15, 10)).unwrap();
        let path3 = search(&mut cells, Hex::new(5, 10), Hex::new(15, 10)).unwrap();

        assert_eq!(path1, path2);
        assert_eq!(path2, path3);
    }

    #[test]
    fn test_path_cost_rejects_impassable() {
        let mut cells = grid(5, 5);
        paint(&mut cells, Hex::new(2, 0), Terrain::Water);
        let path = [Hex::new(0, 0), Hex::new(1, 0), Hex::new(2, 0)];
        assert_eq!(path_cost(&mut cells, &path), None);
    }
}
