//! End-to-end flows through the engine API.

use chrono::Duration;
use wargame_core::prelude::*;
use wargame_test_utils::fixtures::{
    epoch, plains_generation, TestMatch, TEST_TURN_LENGTH_SECONDS,
};

const SIZE: u32 = 16;

fn field() -> TestMatch {
    TestMatch::plains(SIZE, 2).without_starter_units()
}

#[test]
fn test_small_chunk_covers_every_tile() {
    let fixture = field();
    let generation = GenerationConfig::default()
        .with_size(4)
        .with_province_range(1, 4)
        .with_land_range(1, 2)
        .with_kingdom_range(1, 2);
    let setup = MatchSetup {
        world_seed: 42,
        seats: vec![SeatSetup::default()],
        initial_chunk: None,
        generation,
        ..MatchSetup::default()
    };
    let summary = fixture.engine.create_match(&setup).unwrap();

    let chunk = fixture
        .engine
        .create_world_region(summary.match_id, None, ChunkCoord::new(0, 0), &generation)
        .unwrap();

    assert_eq!(chunk.cells.len(), 16);
    assert!(chunk.meta.province_count >= 1);
    assert!(chunk.cells.iter().all(|cell| cell.province.is_some()));
}

#[test]
fn test_unit_walks_three_plains_cells() {
    let fixture = field();
    let unit = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 3);

    let resolved = fixture.submit(0, OrderPayload::move_unit(unit, Hex::new(8, 5)));

    assert_eq!(
        resolved.result.outcome,
        MoveOutcome::Moved {
            unit_id: unit,
            from: Hex::new(5, 5),
            to: Hex::new(8, 5),
            spent: 3,
        }
    );
    assert_eq!(fixture.unit_position(unit), Hex::new(8, 5));
}

#[test]
fn test_water_destination_is_blocked() {
    let fixture = field();
    let unit = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 3);
    fixture.paint(Hex::new(8, 5), Terrain::Water);

    let resolved = fixture.submit(0, OrderPayload::move_unit(unit, Hex::new(8, 5)));

    assert!(matches!(
        resolved.result.outcome,
        MoveOutcome::Blocked { unit_id, .. } if unit_id == unit
    ));
    assert_eq!(fixture.unit_position(unit), Hex::new(5, 5));
    // The turn still resolved.
    let state = fixture.engine.match_state(fixture.match_id).unwrap();
    assert_eq!(state.participants[0].last_resolved_turn, 1);
}

#[test]
fn test_unstarted_match_unlocks_turn_one() {
    let fixture = field();
    let setup = MatchSetup {
        turn_length_seconds: 10_800,
        start_now: false,
        generation: plains_generation(8),
        ..MatchSetup::default()
    };
    let summary = fixture.engine.create_match(&setup).unwrap();
    fixture.clock.advance(Duration::days(30));

    let state = fixture.engine.match_state(summary.match_id).unwrap();
    assert_eq!(state.game.start_time, None);
    assert_eq!(state.max_turn, 1);
    for participant in &state.participants {
        assert_eq!(participant.last_resolved_turn, 0);
        assert_eq!(participant.max_turn, 1);
        assert_eq!(participant.next_turn, 1);
    }
}

#[test]
fn test_second_queued_order_beyond_max_turn() {
    let fixture = field();
    let orders = [OrderPayload::pass(), OrderPayload::pass()];

    let report = fixture
        .engine
        .queue_orders(fixture.match_id, fixture.participant(0), &orders)
        .unwrap();

    assert_eq!(report.max_turn, 1);
    assert_eq!(report.queued.len(), 1);
    assert_eq!(report.queued[0].turn, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].turn, 2);
    assert_eq!(report.skipped[0].reason, "beyond max_turn");
}

#[test]
fn test_insufficient_movement_stays() {
    let fixture = field();
    let unit = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 1);
    fixture.paint(Hex::new(6, 5), Terrain::Swamp);
    fixture.paint(Hex::new(6, 4), Terrain::Water);
    fixture.paint(Hex::new(5, 6), Terrain::Water);
    fixture.paint(Hex::new(4, 6), Terrain::Water);
    fixture.paint(Hex::new(4, 5), Terrain::Water);
    fixture.paint(Hex::new(5, 4), Terrain::Water);

    let resolved = fixture.submit(0, OrderPayload::move_unit(unit, Hex::new(8, 5)));

    assert_eq!(
        resolved.result.outcome,
        MoveOutcome::Stayed {
            unit_id: unit,
            at: Hex::new(5, 5),
            spent: 0,
            reason: "insufficient movement points".to_string(),
        }
    );
}

#[test]
fn test_unknown_unit_resolves_as_invalid() {
    let fixture = field();
    let resolved = fixture.submit(0, OrderPayload::move_unit(UnitId(9_999), Hex::new(1, 1)));

    assert_eq!(
        resolved.result.outcome,
        MoveOutcome::Invalid {
            reason: "unit not found".to_string(),
        }
    );
    assert_eq!(resolved.turn, 1);
}

#[test]
fn test_other_units_block_the_path() {
    let fixture = field();
    let mover = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 3);
    let sentry = fixture.place_unit(fixture.kingdom(1), Hex::new(8, 5), 3);

    let resolved = fixture.submit(0, OrderPayload::move_unit(mover, Hex::new(8, 5)));

    assert!(matches!(resolved.result.outcome, MoveOutcome::Blocked { .. }));
    assert_eq!(fixture.unit_position(sentry), Hex::new(8, 5));
    assert_eq!(fixture.unit_position(mover), Hex::new(5, 5));
}

#[test]
fn test_capture_then_already_owned() {
    let fixture = field();
    let town = Hex::new(8, 5);
    fixture.place_town(town);
    let province = fixture.province_at(town);
    let unit = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 3);

    let first = fixture.submit(0, OrderPayload::move_unit(unit, town));
    let CaptureOutcome::Captured {
        province: captured,
        kingdom,
        ..
    } = first.result.capture
    else {
        panic!("expected a capture, got {:?}", first.result.capture);
    };
    assert_eq!(captured, province);
    assert_eq!(kingdom, fixture.kingdom(0));

    fixture.advance_turns(2);
    let away = fixture.submit(0, OrderPayload::move_unit(unit, Hex::new(7, 5)));
    assert_eq!(away.result.capture, CaptureOutcome::None);
    let back = fixture.submit(0, OrderPayload::move_unit(unit, town));
    assert_eq!(
        back.result.capture,
        CaptureOutcome::AlreadyOwned {
            province,
            kingdom: fixture.kingdom(0),
        }
    );
}

#[test]
fn test_enemy_capture_reuses_existing_land() {
    let fixture = TestMatch::plains(SIZE, 2);
    let town = Hex::new(8, 5);
    fixture.place_town(town);
    let province = fixture.province_at(town);
    let red = fixture.place_unit(fixture.kingdom(0), Hex::new(5, 5), 3);
    let blue = fixture.place_unit(fixture.kingdom(1), Hex::new(11, 5), 3);
    let blue_heartland = fixture.read(|world| {
        Ok(world
            .lands_of(fixture.kingdom(1))
            .map(|land| land.id)
            .next())
    });
    let blue_lands_before = fixture.read(|world| Ok(world.lands_of(fixture.kingdom(1)).count()));

    fixture.submit(0, OrderPayload::move_unit(red, town));
    fixture.advance_turns(1);
    fixture.submit(0, OrderPayload::move_unit(red, Hex::new(5, 5)));

    let resolved = fixture.submit(1, OrderPayload::move_unit(blue, town));
    assert!(resolved.result.capture.is_captured());
    let CaptureOutcome::Captured {
        kingdom,
        land,
        previous_land,
        ..
    } = resolved.result.capture
    else {
        unreachable!();
    };
    assert_eq!(kingdom, fixture.kingdom(1));
    assert_eq!(Some(land), blue_heartland);
    assert!(previous_land.is_some());

    let owner = fixture.read(|world| Ok(world.province_kingdom(province)));
    assert_eq!(owner, Some(fixture.kingdom(1)));
    let blue_lands_after = fixture.read(|world| Ok(world.lands_of(fixture.kingdom(1)).count()));
    assert_eq!(blue_lands_after, blue_lands_before);
}

#[test]
fn test_capture_without_land_creates_holdings() {
    let fixture = field();
    let town = Hex::new(8, 5);
    fixture.place_town(town);
    let kingdom = fixture.kingdom(0);
    fixture.with_world(|world| {
        let lands: Vec<LandId> = world.lands_of(kingdom).map(|land| land.id).collect();
        for land in lands {
            world.set_land_kingdom(land, None)?;
        }
        Ok(())
    });
    let unit = fixture.place_unit(kingdom, Hex::new(5, 5), 3);

    let resolved = fixture.submit(0, OrderPayload::move_unit(unit, town));

    assert!(resolved.result.capture.is_captured());
    let names: Vec<String> =
        fixture.read(|world| Ok(world.lands_of(kingdom).map(|l| l.name.clone()).collect()));
    assert_eq!(names, vec!["Kingdom 1 holdings".to_string()]);
}

#[test]
fn test_move_across_chunk_boundary() {
    let fixture = field();
    fixture
        .engine
        .create_world_region(
            fixture.match_id,
            None,
            ChunkCoord::new(1, 0),
            &plains_generation(SIZE),
        )
        .unwrap();
    let unit = fixture.place_unit(fixture.kingdom(0), Hex::new(14, 3), 3);

    let resolved = fixture.submit(0, OrderPayload::move_unit(unit, Hex::new(17, 3)));

    assert!(matches!(
        resolved.result.outcome,
        MoveOutcome::Moved { spent: 3, .. }
    ));
    assert_eq!(fixture.unit_position(unit), Hex::new(17, 3));
}

#[test]
fn test_unstarted_match_records_start_on_first_order() {
    let fixture = field();
    let setup = MatchSetup {
        start_now: false,
        generation: plains_generation(8),
        ..MatchSetup::default()
    };
    let summary = fixture.engine.create_match(&setup).unwrap();
    fixture.clock.set(epoch() + Duration::hours(5));

    fixture
        .engine
        .submit_order(
            summary.match_id,
            summary.seats[0].participant_id,
            OrderPayload::pass(),
        )
        .unwrap();

    let state = fixture.engine.match_state(summary.match_id).unwrap();
    assert_eq!(state.game.start_time, Some(epoch() + Duration::hours(5)));
}

#[test]
fn test_auto_orders_march_starter_units_on_towns() {
    let setup = MatchSetup {
        turn_length_seconds: TEST_TURN_LENGTH_SECONDS,
        world_seed: 11,
        start_now: true,
        max_turn_override: Some(8),
        seats: vec![SeatSetup::default(); 2],
        generation: plains_generation(8).with_towns(true),
        auto_orders: true,
        ..MatchSetup::default()
    };
    let fixture = TestMatch::with_setup(&setup);
    let first = &fixture.seats[0];
    let unit = first.starter_unit.unwrap();

    let (orders, target_province) = fixture.read(|world| {
        let orders: Vec<Option<OrderPayload>> = (1..=8)
            .map(|turn| world.turn(first.participant_id, turn).and_then(|t| t.order.clone()))
            .collect();
        let target = orders[0].as_ref().and_then(|o| o.destination).unwrap();
        let town = world.town_at(fixture.match_id, target).unwrap();
        assert_ne!(world.province_kingdom(town.province), Some(first.kingdom));
        Ok((orders, town.province))
    });
    for order in &orders {
        let order = order.as_ref().unwrap();
        assert_eq!(order.kind, OrderKind::Move);
        assert_eq!(order.unit_id, Some(unit));
    }

    let report = fixture
        .engine
        .resolve_until_max(fixture.match_id, first.participant_id)
        .unwrap();

    assert_eq!(report.resolved_count(), 8);
    assert!(matches!(
        report.resolved[0].result.outcome,
        MoveOutcome::Moved { unit_id, .. } if unit_id == unit
    ));
    assert!(report.resolved.iter().any(|r| matches!(
        r.result.capture,
        CaptureOutcome::Captured { province, .. } if province == target_province
    )));
    let holder = fixture.read(|world| Ok(world.province_kingdom(target_province)));
    assert_eq!(holder, Some(first.kingdom));
}

#[test]
fn test_without_auto_orders_no_turns_are_queued() {
    let setup = MatchSetup {
        start_now: true,
        max_turn_override: Some(4),
        generation: plains_generation(8).with_towns(true),
        ..MatchSetup::default()
    };
    let fixture = TestMatch::with_setup(&setup);

    let turns = fixture.read(|world| {
        Ok(fixture
            .seats
            .iter()
            .filter(|seat| world.turn(seat.participant_id, 1).is_some())
            .count())
    });
    assert_eq!(turns, 0);
}
