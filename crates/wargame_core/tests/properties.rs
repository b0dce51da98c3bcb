//! Property tests for generation, movement and turn history.

use std::collections::{BTreeSet, HashSet, VecDeque};

use proptest::prelude::*;
use wargame_core::map_generation::{generate_chunk, GeneratedChunk};
use wargame_core::prelude::*;
use wargame_test_utils::determinism::strategies::{
    arb_chunk_coord, arb_generation_config, arb_hex_in, arb_pass_script, arb_terrain,
};
use wargame_test_utils::determinism::apply_step;
use wargame_test_utils::fixtures::TestMatch;

/// Returns true if `members` forms one connected group under `adjacent`.
fn connected(members: &BTreeSet<usize>, adjacent: impl Fn(usize) -> Vec<usize>) -> bool {
    let Some(&first) = members.iter().next() else {
        return true;
    };
    let mut seen = BTreeSet::from([first]);
    let mut queue = VecDeque::from([first]);
    while let Some(node) = queue.pop_front() {
        for next in adjacent(node) {
            if members.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.len() == members.len()
}

fn assert_partition(chunk: &GeneratedChunk) -> std::result::Result<(), TestCaseError> {
    let size = chunk.size as usize;
    prop_assert_eq!(chunk.cells.len(), size * size);

    let tiles: usize = chunk.provinces.iter().map(|p| p.tiles.len()).sum();
    prop_assert_eq!(tiles, size * size);
    let distinct: HashSet<Hex> = chunk.provinces.iter().flat_map(|p| p.tiles.clone()).collect();
    prop_assert_eq!(distinct.len(), size * size);

    for (index, province) in chunk.provinces.iter().enumerate() {
        prop_assert!(!province.tiles.is_empty());
        prop_assert!(chunk.lands[province.land].provinces.contains(&index));
        let cells: HashSet<Hex> = province.tiles.iter().copied().collect();
        let members: BTreeSet<usize> = (0..province.tiles.len()).collect();
        let ok = connected(&members, |i| {
            province.tiles[i]
                .neighbors()
                .iter()
                .filter(|n| cells.contains(*n))
                .filter_map(|n| province.tiles.iter().position(|t| t == n))
                .collect()
        });
        prop_assert!(ok, "province {} is not connected", index);
    }

    let province_adjacency = chunk.province_adjacency();
    for (index, land) in chunk.lands.iter().enumerate() {
        prop_assert!(chunk.kingdoms[land.kingdom].lands.contains(&index));
        let members: BTreeSet<usize> = land.provinces.iter().copied().collect();
        let ok = connected(&members, |p| province_adjacency[p].iter().copied().collect());
        prop_assert!(ok, "land {} is not connected", index);
    }

    let land_adjacency = chunk.land_adjacency();
    for (index, kingdom) in chunk.kingdoms.iter().enumerate() {
        let members: BTreeSet<usize> = kingdom.lands.iter().copied().collect();
        let ok = connected(&members, |l| land_adjacency[l].iter().copied().collect());
        prop_assert!(ok, "kingdom {} is not connected", index);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_generation_partitions_the_chunk(
        seed in any::<u64>(),
        coord in arb_chunk_coord(),
        config in arb_generation_config(),
    ) {
        let chunk = generate_chunk(seed, coord, &config).unwrap();
        assert_partition(&chunk)?;
        for cell in &chunk.cells {
            prop_assert!(chunk.provinces[cell.province].tiles.contains(&cell.hex));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_movement_within_budget(
        start in arb_hex_in(12),
        destination in arb_hex_in(12),
        move_points in 1u32..6,
        painted in proptest::collection::vec((arb_hex_in(12), arb_terrain()), 0..20),
        others in proptest::collection::vec(arb_hex_in(12), 0..4),
    ) {
        let fixture = TestMatch::plains(12, 2).without_starter_units();
        for (hex, terrain) in &painted {
            if *hex != start {
                fixture.paint(*hex, *terrain);
            }
        }
        let blocked: HashSet<Hex> = others.iter().copied().filter(|h| *h != start).collect();
        for hex in &blocked {
            fixture.place_unit(fixture.kingdom(1), *hex, 1);
        }
        let unit = fixture.place_unit(fixture.kingdom(0), start, move_points);

        let resolved = fixture.submit(0, OrderPayload::move_unit(unit, destination));
        let end = fixture.unit_position(unit);

        match resolved.result.outcome {
            MoveOutcome::Moved { from, to, spent, .. } => {
                prop_assert_eq!(from, start);
                prop_assert_eq!(to, end);
                prop_assert!(spent >= 1 && spent <= move_points);
            }
            MoveOutcome::Stayed { spent, at, .. } => {
                prop_assert_eq!(spent, 0);
                prop_assert_eq!(at, start);
                prop_assert_eq!(end, start);
            }
            MoveOutcome::Blocked { .. } => prop_assert_eq!(end, start),
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
        prop_assert!(!blocked.contains(&end));
    }

    #[test]
    fn prop_history_is_dense_and_increasing(script in arb_pass_script(2, 16)) {
        let fixture = TestMatch::plains(6, 2);
        let mut last_resolved = [0u32; 2];
        for step in &script {
            apply_step(&fixture, step);
            let state = fixture.engine.match_state(fixture.match_id).unwrap();
            for (seat, participant) in state.participants.iter().enumerate() {
                prop_assert!(participant.last_resolved_turn >= last_resolved[seat]);
                last_resolved[seat] = participant.last_resolved_turn;
            }
        }

        let match_id = fixture.match_id;
        let (mut indices, last) = fixture.read(|world| {
            let indices: Vec<u64> = world
                .participants_in(match_id)
                .flat_map(|p| world.turns_of(p.id))
                .filter_map(|t| t.history_index)
                .collect();
            Ok((indices, world.match_record(match_id)?.last_history_index))
        });
        indices.sort_unstable();
        let expected: Vec<u64> = (1..=last).collect();
        prop_assert_eq!(indices, expected);
    }
}
