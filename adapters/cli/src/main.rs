#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that walks a mover through an ASCII scenario.
//!
//! The adapter owns the tick loop: it builds a map from the scenario,
//! spawns the parked monsters and the walker, requests the walk, and
//! drives `logic` at a fixed cadence, printing every committed step.

mod scenario;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gridfare_core::{Action, BlockClass, BlockMask, CellCoord};
use gridfare_map::TileMap;
use gridfare_mover::{Mover, MoverKind};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scenario::Scenario;

const DEMO_SCENARIO: &str = "\
; built-in demo: a wall with a gap at the bottom
.........
.S..#....
....#....
....#..G.
.........
";

/// Walk a mover across an ASCII tile map.
#[derive(Debug, Parser)]
#[command(name = "gridfare")]
struct Args {
    /// Scenario file to load; the built-in demo runs when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,

    /// Scatter this many extra monsters on free cells.
    #[arg(long, default_value_t = 0)]
    scatter: u32,

    /// Seed for the monster scatter.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = match &args.scenario {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?,
        None => DEMO_SCENARIO.to_owned(),
    };
    let scenario = Scenario::parse(&text).context("parsing scenario")?;

    run(&scenario, &args)
}

fn run(scenario: &Scenario, args: &Args) -> Result<()> {
    if args.tick_ms == 0 {
        bail!("tick duration must be positive");
    }

    let mut map = TileMap::new(scenario.width, scenario.height);
    for &cell in &scenario.walls {
        // Walls live as long as the map; their handles are retained by
        // never being freed.
        let _wall = map.block_tile(cell, BlockClass::Wall);
    }

    let mut monsters: Vec<Mover> = scenario
        .monsters
        .iter()
        .map(|&cell| Mover::spawn(&mut map, MoverKind::Monster, cell))
        .collect();
    scatter_monsters(&mut map, &mut monsters, scenario, args);
    info!(
        "map {}x{}, {} walls, {} monsters",
        scenario.width,
        scenario.height,
        scenario.walls.len(),
        monsters.len()
    );

    let mut walker = Mover::spawn(&mut map, MoverKind::Character, scenario.start);
    walker.set_destination(&mut map, scenario.goal, Duration::ZERO);
    if walker.action() != Action::Walk {
        println!("no route from {:?} to {:?}", scenario.start, scenario.goal);
        return Ok(());
    }

    let tick = Duration::from_millis(args.tick_ms);
    let mut last_cell = scenario.start;
    report_step(Duration::ZERO, &walker, &mut last_cell);

    for index in 1..=args.max_ticks {
        let now = tick * u32::try_from(index).unwrap_or(u32::MAX);
        walker.logic(&mut map, now);
        for monster in &mut monsters {
            monster.logic(&mut map, now);
        }
        report_step(now, &walker, &mut last_cell);

        if walker.action() == Action::Stand {
            if walker.cell() == scenario.goal {
                println!("reached {:?} after {now:?}", scenario.goal);
            } else {
                println!("stopped at {:?}, route interrupted", walker.cell());
            }
            return Ok(());
        }
    }

    bail!("walker still under way after {} ticks", args.max_ticks)
}

fn report_step(now: Duration, walker: &Mover, last_cell: &mut CellCoord) {
    if walker.cell() != *last_cell {
        *last_cell = walker.cell();
        let pixel = walker.pixel_pos();
        println!(
            "t={now:>8?} cell=({}, {}) facing={:?} pixel=({}, {})",
            walker.cell().column(),
            walker.cell().row(),
            walker.facing(),
            pixel.x,
            pixel.y
        );
    }
}

/// Parks extra monsters on randomly chosen free cells, avoiding the
/// walker's start and goal.
fn scatter_monsters(
    map: &mut TileMap,
    monsters: &mut Vec<Mover>,
    scenario: &Scenario,
    args: &Args,
) {
    if args.scatter == 0 {
        return;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut free: Vec<CellCoord> = (0..scenario.height)
        .flat_map(|row| (0..scenario.width).map(move |column| CellCoord::new(column, row)))
        .filter(|&cell| {
            cell != scenario.start
                && cell != scenario.goal
                && map.walkable(cell, BlockMask::all())
        })
        .collect();

    for _ in 0..args.scatter {
        if free.is_empty() {
            break;
        }
        let index = rng.gen_range(0..free.len());
        let cell = free.swap_remove(index);
        monsters.push(Mover::spawn(map, MoverKind::Monster, cell));
    }
}
