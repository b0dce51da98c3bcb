//! Real-time turn gating.
//!
//! A match unlocks one turn per `turn_length_seconds` of elapsed time since
//! its start instant. Overrides can only extend the match-wide horizon; a
//! participant override then caps that participant's horizon.

use chrono::{DateTime, Utc};

use crate::model::{Match, Participant};

/// Highest turn unlockable match-wide at `now`.
///
/// Without a start instant, or with a start in the future, only turn 1 is
/// available. The match override raises the result, never lowers it.
#[must_use]
pub fn match_max_turn(game: &Match, now: DateTime<Utc>) -> u32 {
    let computed = match game.start_time {
        None => 1,
        Some(start) => {
            let elapsed = (now - start).num_seconds();
            if elapsed < 0 {
                1
            } else {
                let length = i64::from(game.turn_length_seconds.max(1));
                let turns = elapsed / length + 1;
                u32::try_from(turns).unwrap_or(u32::MAX)
            }
        }
    };

    match game.max_turn_override {
        Some(value) => computed.max(value),
        None => computed,
    }
}

/// Highest turn `participant` may act on at `now`.
#[must_use]
pub fn participant_max_turn(game: &Match, participant: &Participant, now: DateTime<Utc>) -> u32 {
    let match_max = match_max_turn(game, now);
    match participant.max_turn_override {
        Some(cap) => match_max.min(cap).max(1),
        None => match_max,
    }
}

/// Record `now` as the start instant if none is set.
///
/// Returns `true` if the match was changed.
pub fn observe_start(game: &mut Match, now: DateTime<Utc>) -> bool {
    if game.start_time.is_some() {
        return false;
    }
    game.start_time = Some(now);
    tracing::info!(match_id = %game.id, start = %now, "Match clock started");
    true
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::ids::{MatchId, ParticipantId};

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn game(start: Option<DateTime<Utc>>) -> Match {
        Match {
            id: MatchId(1),
            name: "gate".to_string(),
            max_players: 2,
            turn_length_seconds: 10_800,
            start_time: start,
            max_turn_override: None,
            world_seed: 0,
            chunk_size: 64,
            last_history_index: 0,
            created_at: epoch(),
        }
    }

    fn seat(cap: Option<u32>) -> Participant {
        Participant {
            id: ParticipantId(2),
            match_id: MatchId(1),
            seat_order: 1,
            kingdom: None,
            is_active: true,
            last_resolved_turn: 0,
            max_turn_override: cap,
        }
    }

    #[test]
    fn test_no_start_time_unlocks_turn_one() {
        let game = game(None);
        assert_eq!(match_max_turn(&game, epoch()), 1);
        assert_eq!(participant_max_turn(&game, &seat(None), epoch()), 1);
    }

    #[test]
    fn test_elapsed_time_unlocks_turns() {
        let game = game(Some(epoch()));
        assert_eq!(match_max_turn(&game, epoch()), 1);
        assert_eq!(match_max_turn(&game, epoch() + Duration::seconds(10_799)), 1);
        assert_eq!(match_max_turn(&game, epoch() + Duration::seconds(10_800)), 2);
        assert_eq!(match_max_turn(&game, epoch() + Duration::hours(30)), 11);
    }

    #[test]
    fn test_future_start_unlocks_turn_one() {
        let game = game(Some(epoch() + Duration::hours(5)));
        assert_eq!(match_max_turn(&game, epoch()), 1);
    }

    #[test]
    fn test_match_override_only_extends() {
        let mut game = game(Some(epoch()));
        game.max_turn_override = Some(5);
        assert_eq!(match_max_turn(&game, epoch()), 5);
        assert_eq!(match_max_turn(&game, epoch() + Duration::hours(30)), 11);
    }

    #[test]
    fn test_participant_override_caps() {
        let mut game = game(Some(epoch()));
        game.max_turn_override = Some(8);
        assert_eq!(participant_max_turn(&game, &seat(Some(3)), epoch()), 3);
        assert_eq!(participant_max_turn(&game, &seat(Some(20)), epoch()), 8);
    }

    #[test]
    fn test_observe_start_sets_once() {
        let mut game = game(None);
        assert!(observe_start(&mut game, epoch()));
        assert!(!observe_start(&mut game, epoch() + Duration::hours(1)));
        assert_eq!(game.start_time, Some(epoch()));
    }
}
