//! Hex Wargame - Development Tools

use std::path::{Path, PathBuf};
use std::result::Result;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wargame_core::prelude::*;
use wargame_tools::generate::{generate_regions, open_world, RegionSelection};
use wargame_tools::inspect::{inspect_world, load_engine};
use wargame_tools::render::{render_chunk, RenderConfig};
use wargame_tools::scenario::{self, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "wargame-tools")]
#[command(about = "Development tools for the hex wargame engine")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one world region, or a range of regions, and print it
    Generate {
        /// World seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Chunk coordinate as q,r (defaults to 0,0 without a range)
        #[arg(
            long,
            value_parser = parse_coord,
            conflicts_with_all = ["from_q", "to_q", "from_r", "to_r"]
        )]
        chunk: Option<ChunkCoord>,

        /// First chunk column of a range
        #[arg(long, requires_all = ["to_q", "from_r", "to_r"])]
        from_q: Option<i32>,

        /// Last chunk column of a range
        #[arg(long, requires = "from_q")]
        to_q: Option<i32>,

        /// First chunk row of a range
        #[arg(long, requires = "from_q")]
        from_r: Option<i32>,

        /// Last chunk row of a range
        #[arg(long, requires = "from_q")]
        to_r: Option<i32>,

        /// Chunk edge length in cells
        #[arg(long, default_value = "32")]
        size: u32,

        /// Smallest province, in cells
        #[arg(long)]
        province_min: Option<u32>,

        /// Largest province, in cells
        #[arg(long)]
        province_max: Option<u32>,

        /// Fewest provinces per land
        #[arg(long)]
        land_min: Option<u32>,

        /// Most provinces per land
        #[arg(long)]
        land_max: Option<u32>,

        /// Fewest lands per kingdom
        #[arg(long)]
        kingdom_min: Option<u32>,

        /// Most lands per kingdom
        #[arg(long)]
        kingdom_max: Option<u32>,

        /// World file to extend; created when missing and written back
        #[arg(long)]
        world: Option<PathBuf>,

        /// Match inside the world file; the first match when unset
        #[arg(long)]
        match_id: Option<u64>,

        /// Draw one terrain per province instead of uniform plains
        #[arg(long)]
        varied: bool,

        /// Skip town placement
        #[arg(long)]
        no_towns: bool,

        /// Print the chunk as JSON instead of a map
        #[arg(long)]
        json: bool,

        /// Colored map output
        #[arg(long)]
        color: bool,
    },

    /// Run a RON scenario through the engine
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Engine config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the final world to this file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a saved world file
    Inspect {
        /// World file written by `simulate --save`
        file: PathBuf,

        /// Render this chunk as q,r
        #[arg(long, value_parser = parse_coord)]
        chunk: Option<ChunkCoord>,

        /// Match to render; the first match when unset
        #[arg(long)]
        match_id: Option<u64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Colored map output
        #[arg(long)]
        color: bool,
    },
}

/// Error type for tool commands.
#[derive(Error, Debug)]
enum ToolError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

fn parse_coord(value: &str) -> Result<ChunkCoord, String> {
    let (q, r) = value
        .split_once(',')
        .ok_or_else(|| format!("expected q,r but got '{value}'"))?;
    let q = q.trim().parse::<i32>().map_err(|e| format!("bad q: {e}"))?;
    let r = r.trim().parse::<i32>().map_err(|e| format!("bad r: {e}"))?;
    Ok(ChunkCoord::new(q, r))
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries maps and JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Generate {
            seed,
            chunk,
            from_q,
            to_q,
            from_r,
            to_r,
            size,
            province_min,
            province_max,
            land_min,
            land_max,
            kingdom_min,
            kingdom_max,
            world,
            match_id,
            varied,
            no_towns,
            json,
            color,
        } => {
            let defaults = GenerationConfig::default();
            let mut generation = defaults
                .with_size(size)
                .with_province_range(
                    province_min.unwrap_or(defaults.province_size.min),
                    province_max.unwrap_or(defaults.province_size.max),
                )
                .with_land_range(
                    land_min.unwrap_or(defaults.land_group.min),
                    land_max.unwrap_or(defaults.land_group.max),
                )
                .with_kingdom_range(
                    kingdom_min.unwrap_or(defaults.kingdom_group.min),
                    kingdom_max.unwrap_or(defaults.kingdom_group.max),
                )
                .with_towns(!no_towns);
            if varied {
                generation = generation.with_terrain(TerrainMode::ProvinceVaried);
            }
            let selection = match (from_q, to_q, from_r, to_r) {
                (Some(from_q), Some(to_q), Some(from_r), Some(to_r)) => RegionSelection::Range {
                    from_q,
                    to_q,
                    from_r,
                    to_r,
                },
                _ => RegionSelection::Single(chunk.unwrap_or_default()),
            };
            let output = GenerateOutput { json, color };
            cmd_generate(
                seed,
                &selection,
                generation,
                world.as_deref(),
                match_id.map(MatchId),
                output,
            )
        }
        Commands::Simulate {
            scenario,
            config,
            save,
            json,
        } => cmd_simulate(&scenario, config.as_ref(), save.as_ref(), json),
        Commands::Inspect {
            file,
            chunk,
            match_id,
            json,
            color,
        } => cmd_inspect(&file, chunk, match_id.map(MatchId), json, color),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Output switches of `generate`.
#[derive(Clone, Copy)]
struct GenerateOutput {
    json: bool,
    color: bool,
}

fn cmd_generate(
    seed: u64,
    selection: &RegionSelection,
    generation: GenerationConfig,
    world: Option<&Path>,
    match_id: Option<MatchId>,
    output: GenerateOutput,
) -> Result<(), ToolError> {
    tracing::info!(seed, ?selection, size = generation.size, "Generating regions");
    let setup = MatchSetup {
        name: "Region preview".to_string(),
        world_seed: seed,
        seats: vec![SeatSetup::default()],
        initial_chunk: None,
        generation,
        ..MatchSetup::default()
    };
    let (engine, match_id) = open_world(world, match_id, &setup)?;
    let outcomes = generate_regions(&engine, match_id, None, selection, &generation)?;

    if let Some(path) = world {
        engine.store().save(path)?;
    }

    match selection {
        RegionSelection::Single(coord) => {
            let view = engine.get_chunk(match_id, *coord, None)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                let config = RenderConfig {
                    use_color: output.color,
                    ..RenderConfig::default()
                };
                print!("{}", render_chunk(&view, &[], &config));
            }
        }
        RegionSelection::Range { .. } if output.json => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        RegionSelection::Range { .. } => {
            for outcome in &outcomes {
                let meta = &outcome.meta;
                if outcome.created {
                    println!(
                        "chunk {}: {} provinces, {} lands, {} kingdoms, {} towns",
                        outcome.coord,
                        meta.province_count,
                        meta.land_count,
                        meta.kingdom_count,
                        meta.town_count
                    );
                } else {
                    println!("chunk {}: already present", outcome.coord);
                }
            }
        }
    }
    Ok(())
}

fn cmd_simulate(
    path: &Path,
    config: Option<&PathBuf>,
    save: Option<&PathBuf>,
    json: bool,
) -> Result<(), ToolError> {
    let scenario = Scenario::load(path)?;
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");

    let (report, runner) = scenario::run(&scenario, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Scenario: {}", report.name);
        for (index, outcome) in report.outcomes.iter().enumerate() {
            println!("  {:>3}: {}", index + 1, serde_json::to_string(outcome)?);
        }
        for seat in &report.state.participants {
            println!(
                "  seat {}: resolved {}/{}",
                seat.seat_order, seat.last_resolved_turn, seat.max_turn
            );
        }
        println!("  rejected steps: {}", report.rejected_count());
        println!("  state hash: {:016x}", report.state_hash);
    }

    if let Some(path) = save {
        runner.engine().store().save(path)?;
    }
    Ok(())
}

fn cmd_inspect(
    file: &Path,
    chunk: Option<ChunkCoord>,
    match_id: Option<MatchId>,
    json: bool,
    color: bool,
) -> Result<(), ToolError> {
    let engine = load_engine(file, EngineConfig::default())?;
    let now = engine.clock().now();
    let report = engine.store().read(|world| Ok(inspect_world(world, now)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    if !report.is_consistent() {
        tracing::warn!("World file violates invariants");
    }

    let Some(coord) = chunk else {
        return Ok(());
    };
    let match_id = match match_id {
        Some(id) => id,
        None => report
            .matches
            .first()
            .map(|m| m.match_id)
            .ok_or_else(|| ToolError::Usage("world file holds no matches".to_string()))?,
    };
    let view = engine.get_chunk(match_id, coord, None)?;
    let units: Vec<Unit> = engine
        .store()
        .read(|world| Ok(world.units_in(match_id).cloned().collect()))?;
    let config = RenderConfig {
        use_color: color,
        ..RenderConfig::default()
    };
    println!();
    print!("{}", render_chunk(&view, &units, &config));
    Ok(())
}
