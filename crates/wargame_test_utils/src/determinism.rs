//! Determinism testing utilities.
//!
//! Provides a harness for verifying that world generation and turn
//! resolution produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two servers replaying the same orders against the same seed must end in
//! byte-identical worlds. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The world keeps every record in `BTreeMap`s and generation walks
//!   frontiers in sorted order.
//!
//! - **System randomness**: Generation draws only from a `StdRng` seeded
//!   per chunk; nothing reads the thread RNG.
//!
//! - **Wall-clock time**: The engine reads time only through its clock, so
//!   fixtures drive it with a [`wargame_core::engine::FixedClock`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual generation and resolution steps
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Scripted matches are reproducible
//! 4. **Parallel tests**: Running N scripts in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use serde::{Deserialize, Serialize};
use wargame_core::hex::ChunkCoord;
use wargame_core::map_generation::{generate_chunk, GenerationConfig};
use wargame_core::orders::OrderPayload;
use wargame_core::world::World;

use crate::fixtures::TestMatch;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Runs are non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for index in 0..steps {
            step(&mut state, index);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Generate the same chunk twice and compare the results.
#[must_use]
pub fn verify_generation_determinism(
    seed: u64,
    coord: ChunkCoord,
    config: &GenerationConfig,
) -> bool {
    let first = generate_chunk(seed, coord, config);
    let second = generate_chunk(seed, coord, config);
    match (first, second) {
        (Ok(a), Ok(b)) => compute_hash(&a) == compute_hash(&b) && a == b,
        (Err(a), Err(b)) => a.to_string() == b.to_string(),
        _ => false,
    }
}

/// One step of a scripted match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Move the clock forward by whole turns.
    Advance(u32),
    /// Submit an order for a seat. Rejections are part of the outcome.
    Submit {
        /// Seat index (0-based).
        seat: usize,
        /// Order.
        order: OrderPayload,
    },
    /// Queue orders for a seat.
    Queue {
        /// Seat index (0-based).
        seat: usize,
        /// Orders.
        orders: Vec<OrderPayload>,
    },
    /// Resolve every unlocked turn of a seat.
    ResolveAll {
        /// Seat index (0-based).
        seat: usize,
    },
}

/// Apply one script step. A rejected operation leaves the world unchanged
/// and is only logged.
pub fn apply_step(fixture: &TestMatch, step: &ScriptStep) {
    let match_id = fixture.match_id;
    let outcome = match step {
        ScriptStep::Advance(turns) => {
            fixture.advance_turns(*turns);
            Ok(())
        }
        ScriptStep::Submit { seat, order } => fixture
            .engine
            .submit_order(match_id, fixture.participant(*seat), order.clone())
            .map(|_| ()),
        ScriptStep::Queue { seat, orders } => fixture
            .engine
            .queue_orders(match_id, fixture.participant(*seat), orders)
            .map(|_| ()),
        ScriptStep::ResolveAll { seat } => fixture
            .engine
            .resolve_until_max(match_id, fixture.participant(*seat))
            .map(|_| ()),
    };
    if let Err(e) = outcome {
        tracing::debug!(step = ?step, error = %e, "Script step rejected");
    }
}

/// Replay a script on a fresh plains fixture and return the final hash.
pub fn replay_script(size: u32, players: u8, script: &[ScriptStep]) -> u64 {
    let fixture = TestMatch::plains(size, players);
    for step in script {
        apply_step(&fixture, step);
    }
    fixture.state_hash()
}

/// Replay a script `runs` times and compare the final hashes.
#[must_use]
pub fn verify_script_determinism(
    runs: usize,
    size: u32,
    players: u8,
    script: &[ScriptStep],
) -> DeterminismResult {
    let hashes: Vec<u64> = (0..runs)
        .map(|_| replay_script(size, players, script))
        .collect();
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: script.len() as u64,
    }
}

/// Replay a script on N threads at once and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn run_parallel_scripts(
    size: u32,
    players: u8,
    script: &[ScriptStep],
    num_runs: usize,
) -> DeterminismResult {
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| scope.spawn(|| replay_script(size, players, script)))
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<u64>>()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: script.len() as u64,
    }
}

/// Replay a script twice in lockstep, finding the first step after which
/// the worlds differ.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(step)` if they diverge after
/// that step (0 means the fixtures already differed).
#[must_use]
pub fn find_first_divergence(size: u32, players: u8, script: &[ScriptStep]) -> Option<usize> {
    let first = TestMatch::plains(size, players);
    let second = TestMatch::plains(size, players);

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for (index, step) in script.iter().enumerate() {
        apply_step(&first, step);
        apply_step(&second, step);

        if first.state_hash() != second.state_hash() {
            return Some(index + 1);
        }
    }

    None
}

/// Verify that a save/load round trip preserves the world exactly.
#[must_use]
pub fn verify_serialization_determinism(world: &World) -> bool {
    let hash_before = world.state_hash();

    let Ok(bytes) = world.to_bytes() else {
        return false;
    };

    let Ok(restored) = World::from_bytes(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of generation and resolution.
pub mod strategies {
    use proptest::prelude::*;
    use wargame_core::hex::{ChunkCoord, Hex};
    use wargame_core::ids::UnitId;
    use wargame_core::map_generation::{GenerationConfig, TerrainMode};
    use wargame_core::orders::OrderPayload;
    use wargame_core::terrain::Terrain;

    use super::ScriptStep;

    /// Generate a hex inside a `size` x `size` chunk at the origin.
    pub fn arb_hex_in(size: u32) -> impl Strategy<Value = Hex> {
        let size = size as i32;
        (0..size, 0..size).prop_map(|(q, r)| Hex::new(q, r))
    }

    /// Generate a chunk coordinate near the origin.
    pub fn arb_chunk_coord() -> impl Strategy<Value = ChunkCoord> {
        (-8i32..8, -8i32..8).prop_map(|(q, r)| ChunkCoord::new(q, r))
    }

    /// Generate a small chunk size (2-16).
    pub fn arb_chunk_size() -> impl Strategy<Value = u32> {
        2u32..=16
    }

    /// Generate an inclusive range with `1 <= min <= max <= limit`.
    pub fn arb_range(limit: u32) -> impl Strategy<Value = (u32, u32)> {
        (1u32..=limit).prop_flat_map(move |min| (Just(min), min..=limit))
    }

    /// Generate any terrain tag the generator can draw.
    pub fn arb_terrain() -> impl Strategy<Value = Terrain> {
        prop_oneof![
            Just(Terrain::Plains),
            Just(Terrain::Forest),
            Just(Terrain::Hills),
            Just(Terrain::Swamp),
            Just(Terrain::Water),
            Just(Terrain::Mountain),
        ]
    }

    /// Generate a valid generation config for a small chunk.
    pub fn arb_generation_config() -> impl Strategy<Value = GenerationConfig> {
        (
            arb_chunk_size(),
            arb_range(12),
            arb_range(6),
            arb_range(4),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(size, province, land, kingdom, towns, varied)| {
                let terrain = if varied {
                    TerrainMode::ProvinceVaried
                } else {
                    TerrainMode::Uniform(Terrain::Plains)
                };
                GenerationConfig::default()
                    .with_size(size)
                    .with_province_range(province.0, province.1)
                    .with_land_range(land.0, land.1)
                    .with_kingdom_range(kingdom.0, kingdom.1)
                    .with_towns(towns)
                    .with_terrain(terrain)
            })
    }

    /// Generate a pass or a move of one of `units` inside a `size` chunk.
    pub fn arb_order(units: Vec<UnitId>, size: u32) -> impl Strategy<Value = OrderPayload> {
        let moves = (proptest::sample::select(units), arb_hex_in(size))
            .prop_map(|(unit, to)| OrderPayload::move_unit(unit, to));
        prop_oneof![1 => Just(OrderPayload::pass()), 3 => moves]
    }

    /// Generate a script of pass orders, clock advances and catch-ups.
    pub fn arb_pass_script(
        players: usize,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<ScriptStep>> {
        let step = prop_oneof![
            (1u32..3).prop_map(ScriptStep::Advance),
            (0..players).prop_map(|seat| ScriptStep::Submit {
                seat,
                order: OrderPayload::pass(),
            }),
            (0..players).prop_map(|seat| ScriptStep::ResolveAll { seat }),
        ];
        proptest::collection::vec(step, 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use proptest::prelude::*;
    use wargame_core::hex::Hex;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = GenerationConfig::default().with_size(16);
        assert!(verify_generation_determinism(7, ChunkCoord::new(0, 0), &config));
        assert!(verify_generation_determinism(7, ChunkCoord::new(-2, 5), &config));
    }

    fn sample_script() -> Vec<ScriptStep> {
        vec![
            ScriptStep::Submit {
                seat: 0,
                order: OrderPayload::pass(),
            },
            ScriptStep::Advance(2),
            ScriptStep::Queue {
                seat: 1,
                orders: vec![OrderPayload::pass(), OrderPayload::pass()],
            },
            ScriptStep::ResolveAll { seat: 1 },
            ScriptStep::ResolveAll { seat: 0 },
            ScriptStep::Submit {
                seat: 0,
                order: OrderPayload::move_unit(wargame_core::ids::UnitId(999), Hex::new(1, 1)),
            },
        ]
    }

    #[test]
    fn test_script_replays_identically() {
        verify_script_determinism(3, 8, 2, &sample_script()).assert_deterministic();
    }

    #[test]
    fn test_parallel_scripts_match() {
        run_parallel_scripts(8, 2, &sample_script(), 4).assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert!(find_first_divergence(8, 2, &sample_script()).is_none());
    }

    #[test]
    fn test_serialization_preserves_world() {
        let fixture = TestMatch::plains(8, 2);
        for step in &sample_script() {
            apply_step(&fixture, step);
        }
        let world = fixture.engine.store().snapshot().unwrap();
        assert!(verify_serialization_determinism(&world));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_generation_deterministic(
            seed in any::<u64>(),
            coord in arb_chunk_coord(),
            config in arb_generation_config(),
        ) {
            prop_assert!(verify_generation_determinism(seed, coord, &config));
        }

        #[test]
        fn prop_pass_scripts_deterministic(script in arb_pass_script(2, 12)) {
            let first = replay_script(6, 2, &script);
            let second = replay_script(6, 2, &script);
            prop_assert_eq!(first, second);
        }
    }
}
