//! ASCII chunk renderer for terminal review.
//!
//! Rows are drawn top to bottom by `r`, each indented by one space per row
//! so the axial skew of the hex grid stays visible.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use wargame_core::engine::ChunkView;
use wargame_core::hex::Hex;
use wargame_core::ids::KingdomId;
use wargame_core::model::Unit;
use wargame_core::terrain::Terrain;

/// Rendering options.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Show the legend and counts under the map.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const BLUE: &str = "\x1b[34m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    /// Colors cycled through by kingdom.
    pub const KINGDOM: [&str; 4] = [BLUE, YELLOW, RED, CYAN];
}

/// Character for a terrain tag.
#[must_use]
pub const fn terrain_char(terrain: Terrain) -> char {
    match terrain {
        Terrain::Plains => '.',
        Terrain::Forest => 'f',
        Terrain::Hills => 'n',
        Terrain::Swamp => ',',
        Terrain::Water => '~',
        Terrain::Mountain => '^',
        Terrain::Unknown => '?',
    }
}

const fn terrain_color(terrain: Terrain) -> &'static str {
    match terrain {
        Terrain::Forest | Terrain::Swamp => colors::GREEN,
        Terrain::Water => colors::BLUE,
        _ => colors::GRAY,
    }
}

/// Render a chunk with its towns and the given units.
///
/// Towns are drawn as `#`, or as the owning kingdom's letter (`A`, `B`, ...
/// in kingdom id order) when held. Units are drawn as the lowercase letter of
/// their kingdom and take precedence over towns.
#[must_use]
pub fn render_chunk(view: &ChunkView, units: &[Unit], config: &RenderConfig) -> String {
    let chunk = &view.chunk;
    let origin = chunk.coord.origin(chunk.size);
    let size = i32::try_from(chunk.size).unwrap_or(i32::MAX);

    let mut kingdoms: Vec<KingdomId> = units
        .iter()
        .map(|u| u.owner)
        .chain(view.towns.iter().filter_map(|t| t.kingdom))
        .collect();
    kingdoms.sort_unstable();
    kingdoms.dedup();
    let letter = |kingdom: KingdomId| -> (usize, char) {
        let index = kingdoms.iter().position(|k| *k == kingdom).unwrap_or(0);
        let offset = u8::try_from(index % 26).unwrap_or(0);
        (index, char::from(b'A' + offset))
    };

    let mut marks: HashMap<Hex, (char, &'static str)> = HashMap::new();
    for town in &view.towns {
        let mark = match town.kingdom {
            Some(kingdom) => {
                let (index, ch) = letter(kingdom);
                (ch, colors::KINGDOM[index % colors::KINGDOM.len()])
            }
            None => ('#', colors::BOLD),
        };
        marks.insert(town.position, mark);
    }
    for unit in units {
        let (index, ch) = letter(unit.owner);
        marks.insert(
            unit.position,
            (ch.to_ascii_lowercase(), colors::KINGDOM[index % colors::KINGDOM.len()]),
        );
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "Chunk {} ({}x{}) seed {}",
        chunk.coord, chunk.size, chunk.size, view.meta.seed
    );
    for dr in 0..size {
        for _ in 0..dr {
            output.push(' ');
        }
        for dq in 0..size {
            let hex = Hex::new(origin.q + dq, origin.r + dr);
            let (ch, color) = match marks.get(&hex) {
                Some(&mark) => mark,
                None => {
                    let terrain = chunk.cell(hex).map_or(Terrain::Unknown, |c| c.terrain);
                    (terrain_char(terrain), terrain_color(terrain))
                }
            };
            if config.use_color {
                let _ = write!(output, "{color}{ch}{}", colors::RESET);
            } else {
                output.push(ch);
            }
            output.push(' ');
        }
        output.push('\n');
    }

    if config.show_legend {
        output.push_str(&render_legend(view, units));
    }
    output
}

/// Counts of provinces, towns and units per holder.
fn render_legend(view: &ChunkView, units: &[Unit]) -> String {
    let mut provinces: BTreeMap<Option<KingdomId>, usize> = BTreeMap::new();
    for land in view.province_to_land.values() {
        let kingdom = land.and_then(|l| view.land_to_kingdom.get(&l).copied().flatten());
        *provinces.entry(kingdom).or_default() += 1;
    }
    let mut unit_counts: BTreeMap<KingdomId, usize> = BTreeMap::new();
    for unit in units {
        *unit_counts.entry(unit.owner).or_default() += 1;
    }

    let mut output = String::new();
    output.push_str(". plains  f forest  n hills  , swamp  ~ water  ^ mountain  # town\n");
    let meta = &view.meta;
    let _ = writeln!(
        output,
        "provinces {}  lands {}  kingdoms {}  towns {}",
        meta.province_count, meta.land_count, meta.kingdom_count, meta.town_count
    );
    for (kingdom, count) in &provinces {
        match kingdom {
            Some(kingdom) => {
                let units = unit_counts.get(kingdom).copied().unwrap_or(0);
                let _ = writeln!(output, "kingdom {kingdom}: {count} provinces, {units} units");
            }
            None => {
                let _ = writeln!(output, "unheld: {count} provinces");
            }
        }
    }
    output
}
