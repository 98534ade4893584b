//! Headless arena for the sil-core simulation
//!
//! Builds a level from an ASCII map, puts monsters on its numbered spawn
//! points, lets a simple policy play the character for a number of turns
//! and prints what happened.

mod policy;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use hashbrown::HashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sil_core::dungeon::parse_map;
use sil_core::monster::{MonsterRace, builtin_races};
use sil_core::object::{Item, ItemKind};
use sil_core::player::Skill;
use sil_core::world::{OptionsError, TickResult};
use sil_core::{SimError, SimOptions, World};

use policy::ArenaPolicy;

const DEFAULT_MAP: &[&str] = &[
    "#####################",
    "#.......#...........#",
    "#.......#....1......#",
    "#...@...+...........#",
    "#.......#....2...3..#",
    "#.......#...........#",
    "####.################",
    "####.....4..........#",
    "#####################",
];

const DEFAULT_MONSTERS: &[&str] = &["Snaga", "Snaga", "Cave orc", "Wolf"];

/// Run a headless Sil combat arena
#[derive(Parser, Debug)]
#[command(name = "sil-arena")]
#[command(version, about = "Pit a character against monsters and watch the log", long_about = None)]
struct Args {
    /// Seed for the random number generator
    #[arg(short = 's', long = "seed", default_value_t = 1)]
    seed: u64,

    /// Game turns to run (overrides the config file)
    #[arg(short = 't', long = "turns")]
    turns: Option<u32>,

    /// ASCII map; digits 1-9 mark spawn points
    #[arg(short = 'm', long = "map")]
    map: Option<PathBuf>,

    /// JSON file of race templates replacing the built-in bestiary
    #[arg(short = 'r', long = "races")]
    races: Option<PathBuf>,

    /// Options file (`OPTIONS=` lines, or JSON)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Race for each spawn point, in order; repeats if there are more points
    #[arg(long = "monster")]
    monsters: Vec<String>,

    /// Print the summary as JSON
    #[arg(long = "json")]
    json: bool,

    /// Debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Error, Debug)]
enum ArenaError {
    #[error("cannot read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("bad race table: {0}")]
    Races(#[from] serde_json::Error),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("no race named '{0}'")]
    UnknownRace(String),

    #[error("the map has no '@' to start from")]
    NoStart,
}

/// End-of-run report
#[derive(Debug, Serialize)]
struct Summary {
    outcome: String,
    turns: u64,
    player_turns: u64,
    player_hp: i32,
    player_max_hp: i32,
    depth: i32,
    kills: Vec<(String, i32)>,
    survivors: Vec<(String, i32)>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sil-arena: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read(path: &Path) -> Result<String, ArenaError> {
    std::fs::read_to_string(path).map_err(|e| ArenaError::Io(path.to_path_buf(), e))
}

/// Race templates by name, from a file or the built-in bestiary
fn load_races(path: Option<&Path>) -> Result<HashMap<String, MonsterRace>, ArenaError> {
    let races = match path {
        Some(path) => serde_json::from_str::<Vec<MonsterRace>>(&read(path)?)?,
        None => builtin_races(),
    };
    Ok(races.into_iter().map(|r| (r.name.clone(), r)).collect())
}

fn load_map(path: Option<&Path>) -> Result<Vec<String>, ArenaError> {
    let Some(path) = path else {
        return Ok(DEFAULT_MAP.iter().map(|s| s.to_string()).collect());
    };
    let text = read(path)?;
    Ok(text
        .lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// A journeyman warrior: a sword, some skill and a lantern
fn equip_player(world: &mut World) {
    let p = &mut world.player;
    for (skill, value) in [
        (Skill::Melee, 8),
        (Skill::Evasion, 6),
        (Skill::Stealth, 3),
        (Skill::Perception, 4),
        (Skill::Will, 4),
    ] {
        p.skill_base[skill.index()] = value;
    }
    p.equipment.weapon = Some(Item::weapon("Long Sword", ItemKind::Sword, 30, 0, 2, 5));
    p.equipment.light = Some(Item::new("Lantern", ItemKind::Light));
    p.mhp = 40;
    p.chp = 40;
    p.calc_bonuses();
}

fn build_world(args: &Args) -> Result<World, ArenaError> {
    let mut options = match &args.config {
        Some(path) => SimOptions::load_from_file(path)?,
        None => SimOptions::default(),
    };
    if let Some(turns) = args.turns {
        options.turns = turns;
    }

    let races = load_races(args.races.as_deref())?;
    let wanted: Vec<&str> = if args.monsters.is_empty() {
        DEFAULT_MONSTERS.to_vec()
    } else {
        args.monsters.iter().map(String::as_str).collect()
    };
    if let Some(missing) = wanted.iter().find(|name| !races.contains_key(**name)) {
        return Err(ArenaError::UnknownRace(missing.to_string()));
    }

    let layout = parse_map(&load_map(args.map.as_deref())?)?;
    if layout.player.is_none() {
        return Err(ArenaError::NoStart);
    }
    let spawns = layout.spawns.clone();
    let mut world = World::from_layout(layout, options, args.seed)?;
    for race in races.into_values() {
        world.add_race(race);
    }
    equip_player(&mut world);

    for (i, (point, c)) in spawns.into_iter().enumerate() {
        let name = wanted[i % wanted.len()];
        let id = world.place_monster(name, c)?;
        debug!(spawn = point, monster = name, ?id, "spawned");
    }
    world.update_monsters();
    Ok(world)
}

fn summarize(world: &World, result: &TickResult) -> Summary {
    let outcome = match result {
        TickResult::Continue => "survived".to_string(),
        TickResult::PlayerDied(cause) => format!("killed by {cause}"),
        TickResult::PlayerLeft => "left the level".to_string(),
    };
    let mut kills: Vec<(String, i32)> = world
        .races()
        .filter_map(|r| world.lore.get(&r.name).map(|l| (r.name.clone(), l.pkills)))
        .filter(|(_, n)| *n > 0)
        .collect();
    kills.sort();
    let survivors = world.monsters.iter().map(|(_, m)| (m.race.name.clone(), m.hp)).collect();
    Summary {
        outcome,
        turns: world.turn,
        player_turns: world.player_turns,
        player_hp: world.player.chp,
        player_max_hp: world.player.mhp,
        depth: world.player.depth,
        kills,
        survivors,
    }
}

fn run(args: &Args) -> Result<(), ArenaError> {
    let mut world = build_world(args)?;
    let turns = world.options.turns;
    info!(seed = args.seed, turns, monsters = world.monsters.len(), "arena ready");

    let mut policy = ArenaPolicy::new();
    let result = world.run_turns(turns, &mut policy);

    for msg in world.take_messages() {
        println!("{msg}");
    }

    let summary = summarize(&world, &result);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("Outcome: {}", summary.outcome);
        println!("Turns: {} ({} by the player)", summary.turns, summary.player_turns);
        println!("Hit points: {}/{}", summary.player_hp, summary.player_max_hp);
        for (name, n) in &summary.kills {
            println!("Killed: {name} x{n}");
        }
        for (name, hp) in &summary.survivors {
            println!("Still standing: {name} ({hp} hp)");
        }
    }
    Ok(())
}
