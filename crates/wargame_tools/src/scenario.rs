//! Scripted scenarios.
//!
//! A scenario is a match setup plus a list of steps run against an in-memory
//! engine on a manually driven clock. Every step produces a [`StepOutcome`];
//! engine errors are recorded as [`StepOutcome::Rejected`] rather than
//! aborting the run, so a script can assert on refusals as well as results.
//!
//! ```ron
//! (
//!     name: "Border march",
//!     description: "Seat 1 walks east, seat 2 passes",
//!     setup: (world_seed: 7, start_now: true, generation: (size: 16)),
//!     steps: [
//!         Submit(seat: 0, order: MoveStarter(to: (q: 6, r: 2))),
//!         Advance(turns: 2),
//!         Queue(seat: 1, orders: [Pass, Pass]),
//!         ResolveAll(seat: 1),
//!     ],
//! )
//! ```

use std::path::Path;
use std::result::Result;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wargame_core::error::Result as GameResult;
use wargame_core::prelude::*;

/// Engine type scenarios run on.
pub type ScenarioEngine = Engine<MemoryStore, Arc<FixedClock>>;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Match setup or a final query failed.
    #[error("Engine error: {0}")]
    Game(#[from] GameError),
}

/// An order as written in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioOrder {
    /// Do nothing.
    Pass,
    /// Move the seat's starter unit.
    MoveStarter {
        /// Destination.
        to: Hex,
    },
    /// Move a unit by id.
    Move {
        /// Unit id.
        unit: u64,
        /// Destination.
        to: Hex,
    },
}

/// One scripted action. Seats are zero-based indices into the setup's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Move the clock forward by whole turns.
    Advance {
        /// Turn lengths to wait.
        turns: u32,
    },
    /// Move the clock forward by seconds.
    Wait {
        /// Seconds to wait.
        seconds: i64,
    },
    /// Submit and resolve one order.
    Submit {
        /// Seat index.
        seat: usize,
        /// Order.
        order: ScenarioOrder,
    },
    /// Queue orders on upcoming turns.
    Queue {
        /// Seat index.
        seat: usize,
        /// Orders in turn order.
        orders: Vec<ScenarioOrder>,
    },
    /// Resolve every unlocked turn of a seat.
    ResolveAll {
        /// Seat index.
        seat: usize,
    },
    /// Generate a chunk with the setup's generation settings.
    Region {
        /// Chunk column.
        q: i32,
        /// Chunk row.
        r: i32,
    },
    /// Set or clear a max-turn override for the match or one seat.
    Override {
        /// Seat index; the whole match when `None`.
        seat: Option<usize>,
        /// New override; clears it when `None`.
        value: Option<u32>,
    },
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Instant the scripted clock starts at; the Unix epoch when unset.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Match to create.
    #[serde(default)]
    pub setup: MatchSetup,
    /// Steps in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The clock moved.
    Advanced {
        /// Clock after the step.
        now: DateTime<Utc>,
    },
    /// A submitted order resolved.
    Resolved(ResolvedTurn),
    /// Orders were queued.
    Queued(QueueReport),
    /// A seat caught up to its horizon.
    Caught(ResolveReport),
    /// A chunk exists at the coordinate.
    Region {
        /// Chunk coordinate.
        coord: ChunkCoord,
        /// Provinces in the chunk.
        provinces: u32,
    },
    /// An override was applied.
    Override {
        /// Resulting horizon.
        max_turn: u32,
    },
    /// The engine refused the step.
    Rejected {
        /// Error message.
        error: String,
    },
}

impl StepOutcome {
    /// True if the engine refused the step.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Results of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Match created for the run.
    pub match_id: MatchId,
    /// One outcome per step.
    pub outcomes: Vec<StepOutcome>,
    /// Final match state.
    pub state: MatchState,
    /// Hash of the final world.
    pub state_hash: u64,
}

impl ScenarioReport {
    /// Number of refused steps.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_rejected()).count()
    }
}

/// A scenario in progress.
pub struct ScenarioRunner {
    engine: ScenarioEngine,
    clock: Arc<FixedClock>,
    summary: MatchSummary,
    generation: GenerationConfig,
}

impl ScenarioRunner {
    /// Create the scenario's match on a fresh engine.
    pub fn new(scenario: &Scenario, config: EngineConfig) -> Result<Self, ScenarioError> {
        let start = scenario.start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let clock = Arc::new(FixedClock::new(start));
        let engine = Engine::new(MemoryStore::default(), Arc::clone(&clock), config);
        let summary = engine.create_match(&scenario.setup)?;
        tracing::info!(
            scenario = %scenario.name,
            match_id = %summary.match_id,
            seats = summary.seats.len(),
            "Scenario match created"
        );
        Ok(Self {
            engine,
            clock,
            summary,
            generation: scenario.setup.generation,
        })
    }

    /// The engine the scenario runs on.
    #[must_use]
    pub const fn engine(&self) -> &ScenarioEngine {
        &self.engine
    }

    /// The created match.
    #[must_use]
    pub const fn summary(&self) -> &MatchSummary {
        &self.summary
    }

    /// Run one step.
    pub fn apply(&self, step: &Step) -> StepOutcome {
        match self.try_apply(step) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(step = ?step, %error, "Step rejected");
                StepOutcome::Rejected {
                    error: error.to_string(),
                }
            }
        }
    }

    fn try_apply(&self, step: &Step) -> GameResult<StepOutcome> {
        let match_id = self.summary.match_id;
        match step {
            Step::Advance { turns } => {
                let turn_length = self.engine.match_state(match_id)?.game.turn_length_seconds;
                self.clock
                    .advance(Duration::seconds(i64::from(turn_length) * i64::from(*turns)));
                Ok(StepOutcome::Advanced {
                    now: self.engine.clock().now(),
                })
            }
            Step::Wait { seconds } => {
                if *seconds < 0 {
                    return Err(GameError::validation("cannot wait a negative duration"));
                }
                self.clock.advance(Duration::seconds(*seconds));
                Ok(StepOutcome::Advanced {
                    now: self.engine.clock().now(),
                })
            }
            Step::Submit { seat, order } => {
                let seat = self.seat(*seat)?;
                let payload = self.payload(seat, order)?;
                let resolved = self.engine.submit_order(match_id, seat.participant_id, payload)?;
                Ok(StepOutcome::Resolved(resolved))
            }
            Step::Queue { seat, orders } => {
                let seat = self.seat(*seat)?;
                let payloads = orders
                    .iter()
                    .map(|order| self.payload(seat, order))
                    .collect::<GameResult<Vec<_>>>()?;
                let report = self
                    .engine
                    .queue_orders(match_id, seat.participant_id, &payloads)?;
                Ok(StepOutcome::Queued(report))
            }
            Step::ResolveAll { seat } => {
                let seat = self.seat(*seat)?;
                let report = self.engine.resolve_until_max(match_id, seat.participant_id)?;
                Ok(StepOutcome::Caught(report))
            }
            Step::Region { q, r } => {
                let coord = ChunkCoord::new(*q, *r);
                let chunk =
                    self.engine
                        .create_world_region(match_id, None, coord, &self.generation)?;
                Ok(StepOutcome::Region {
                    coord,
                    provinces: chunk.meta.province_count,
                })
            }
            Step::Override { seat, value } => {
                let target = match seat {
                    Some(index) => OverrideTarget::Participant(self.seat(*index)?.participant_id),
                    None => OverrideTarget::Match,
                };
                let max_turn = self.engine.set_max_turn_override(match_id, target, *value)?;
                Ok(StepOutcome::Override { max_turn })
            }
        }
    }

    fn seat(&self, index: usize) -> GameResult<&SeatSummary> {
        self.summary
            .seats
            .get(index)
            .ok_or_else(|| GameError::validation(format!("no seat {index} in scenario")))
    }

    fn payload(&self, seat: &SeatSummary, order: &ScenarioOrder) -> GameResult<OrderPayload> {
        match order {
            ScenarioOrder::Pass => Ok(OrderPayload::pass()),
            ScenarioOrder::Move { unit, to } => Ok(OrderPayload::move_unit(UnitId(*unit), *to)),
            ScenarioOrder::MoveStarter { to } => {
                let unit = seat.starter_unit.ok_or_else(|| {
                    GameError::validation(format!("seat {} has no starter unit", seat.seat_order))
                })?;
                Ok(OrderPayload::move_unit(unit, *to))
            }
        }
    }

    /// Final state of the run.
    pub fn report(&self, name: &str, outcomes: Vec<StepOutcome>) -> GameResult<ScenarioReport> {
        let match_id = self.summary.match_id;
        let state = self.engine.match_state(match_id)?;
        let state_hash = self.engine.store().read(|world| Ok(world.state_hash()))?;
        Ok(ScenarioReport {
            name: name.to_string(),
            match_id,
            outcomes,
            state,
            state_hash,
        })
    }
}

/// Run every step of a scenario.
///
/// Returns the runner too, so the caller can inspect or save the world.
pub fn run(
    scenario: &Scenario,
    config: EngineConfig,
) -> Result<(ScenarioReport, ScenarioRunner), ScenarioError> {
    let runner = ScenarioRunner::new(scenario, config)?;
    let outcomes: Vec<StepOutcome> = scenario.steps.iter().map(|step| runner.apply(step)).collect();
    let report = runner.report(&scenario.name, outcomes)?;
    tracing::info!(
        scenario = %scenario.name,
        steps = report.outcomes.len(),
        rejected = report.rejected_count(),
        state_hash = report.state_hash,
        "Scenario complete"
    );
    Ok((report, runner))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARCH: &str = r#"(
        name: "March",
        description: "Two seats pass through three turns",
        setup: (
            world_seed: 7,
            start_now: true,
            generation: (
                size: 12,
                province_size: (min: 2, max: 4),
                land_group: (min: 1, max: 2),
                kingdom_group: (min: 1, max: 2),
                place_towns: false,
                terrain: Uniform(plains),
            ),
        ),
        steps: [
            Submit(seat: 0, order: Pass),
            Submit(seat: 0, order: Pass),
            Advance(turns: 2),
            Queue(seat: 1, orders: [Pass, Pass, Pass, Pass]),
            ResolveAll(seat: 1),
            Override(seat: None, value: Some(10)),
            Region(q: 1, r: 0),
            Submit(seat: 5, order: Pass),
        ],
    )"#;

    fn config() -> EngineConfig {
        EngineConfig {
            generation: GenerationConfig::default().with_size(12),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_scenario_parses() {
        let scenario = Scenario::from_ron_str(MARCH).unwrap();
        assert_eq!(scenario.name, "March");
        assert_eq!(scenario.setup.generation.size, 12);
        assert_eq!(scenario.steps.len(), 8);
        assert_eq!(scenario.steps[2], Step::Advance { turns: 2 });
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_run_records_every_step() {
        let scenario = Scenario::from_ron_str(MARCH).unwrap();
        let (report, runner) = run(&scenario, config()).unwrap();

        assert_eq!(report.outcomes.len(), scenario.steps.len());
        assert!(matches!(report.outcomes[0], StepOutcome::Resolved(ref r) if r.turn == 1));
        // Turn 2 is not unlocked until the clock moves.
        assert!(report.outcomes[1].is_rejected());
        assert!(matches!(report.outcomes[2], StepOutcome::Advanced { .. }));

        let StepOutcome::Queued(queued) = &report.outcomes[3] else {
            panic!("expected a queue report, got {:?}", report.outcomes[3]);
        };
        assert_eq!(queued.max_turn, 3);
        assert_eq!(queued.queued.len(), 3);
        assert_eq!(queued.skipped.len(), 1);

        let StepOutcome::Caught(caught) = &report.outcomes[4] else {
            panic!("expected a resolve report, got {:?}", report.outcomes[4]);
        };
        assert_eq!(caught.resolved_count(), 3);

        assert_eq!(report.outcomes[5], StepOutcome::Override { max_turn: 10 });
        assert!(matches!(
            report.outcomes[6],
            StepOutcome::Region { provinces, .. } if provinces >= 2
        ));
        assert!(report.outcomes[7].is_rejected());
        assert_eq!(report.rejected_count(), 2);

        assert_eq!(report.state.participants[1].last_resolved_turn, 3);
        let chunks = runner
            .engine()
            .store()
            .read(|world| Ok(world.chunks_in(report.match_id).count()))
            .unwrap();
        assert_eq!(chunks, 2);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let scenario = Scenario::from_ron_str(MARCH).unwrap();
        let (first, _) = run(&scenario, config()).unwrap();
        let (second, _) = run(&scenario, config()).unwrap();
        assert_eq!(first.state_hash, second.state_hash);
        assert_eq!(first.outcomes, second.outcomes);
    }

    #[test]
    fn test_bundled_scenario_runs_clean() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/border_march.ron");
        let scenario = Scenario::load(path).unwrap();
        let config = EngineConfig {
            generation: scenario.setup.generation,
            ..EngineConfig::default()
        };

        let (report, _) = run(&scenario, config).unwrap();

        assert_eq!(report.rejected_count(), 0, "{:?}", report.outcomes);
        assert_eq!(report.state.max_turn, 6);
        assert_eq!(report.state.participants[0].last_resolved_turn, 2);
        assert_eq!(report.state.participants[1].last_resolved_turn, 3);
        assert_eq!(report.state.participants[1].max_turn, 4);
    }

    #[test]
    fn test_move_starter_without_starter_unit_is_rejected() {
        let scenario = Scenario {
            name: "No region".to_string(),
            description: String::new(),
            start: None,
            setup: MatchSetup {
                initial_chunk: None,
                start_now: true,
                ..MatchSetup::default()
            },
            steps: vec![Step::Submit {
                seat: 0,
                order: ScenarioOrder::MoveStarter { to: Hex::new(1, 0) },
            }],
        };
        let (report, _) = run(&scenario, EngineConfig::default()).unwrap();
        let StepOutcome::Rejected { error } = &report.outcomes[0] else {
            panic!("expected a rejection");
        };
        assert!(error.contains("no starter unit"));
    }
}
