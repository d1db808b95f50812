#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Loopwatch level headlessly.

mod script;
mod simulation;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use loopwatch_core::LevelConfig;
use loopwatch_system_statistics::Counters;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{script::Script, simulation::Simulation};

/// Plays a walk through a Loopwatch level and prints what the player sees.
#[derive(Debug, Parser)]
#[command(name = "loopwatch", version, about)]
struct Args {
    /// Level description in TOML; the built-in museum level is used when omitted.
    #[arg(long)]
    level: Option<PathBuf>,
    /// Walk script with one step per line; a default tour is played when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Overrides the seed of the level description.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file holding lifetime statistics, read before and written after the run.
    #[arg(long)]
    stats: Option<PathBuf>,
    /// Log filter applied when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

/// Entry point for the Loopwatch command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log);

    let mut level = match &args.level {
        Some(path) => load_level(path)?,
        None => LevelConfig::default(),
    };
    if let Some(seed) = args.seed {
        level.seed = seed;
    }
    let script = match &args.script {
        Some(path) => load_script(path)?,
        None => Script::default_tour(),
    };
    let counters = match &args.stats {
        Some(path) => load_counters(path)?,
        None => Counters::default(),
    };

    let mut simulation =
        Simulation::new(level, counters).context("level configuration is invalid")?;
    simulation.play(&script);
    for line in simulation.transcript().lines() {
        println!("{line}");
    }

    if let Some(path) = &args.stats {
        store_counters(path, simulation.counters())?;
    }
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn load_level(path: &Path) -> Result<LevelConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read level {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse level {}", path.display()))
}

fn load_script(path: &Path) -> Result<Script> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    Script::parse(&text).with_context(|| format!("failed to parse script {}", path.display()))
}

fn load_counters(path: &Path) -> Result<Counters> {
    match fs::read_to_string(path) {
        Ok(text) => Counters::from_json(&text)
            .with_context(|| format!("failed to parse statistics {}", path.display())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no statistics yet, starting from zero");
            Ok(Counters::default())
        }
        Err(error) => {
            Err(error).with_context(|| format!("failed to read statistics {}", path.display()))
        }
    }
}

fn store_counters(path: &Path, counters: Counters) -> Result<()> {
    let json = counters.to_json().context("failed to encode statistics")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write statistics {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_level_matches_the_built_in_museum() {
        let level: LevelConfig =
            toml::from_str(include_str!("../../../demos/museum.toml")).expect("demo level parses");

        assert_eq!(level.validate(), Ok(()));
        assert_eq!(
            LevelConfig {
                seed: LevelConfig::default().seed,
                ..level
            },
            LevelConfig::default()
        );
    }

    #[test]
    fn demo_walk_parses() {
        let script = Script::parse(include_str!("../../../demos/museum.walk"));
        assert!(script.is_ok());
    }

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from([
            "loopwatch",
            "--level",
            "museum.toml",
            "--seed",
            "9",
            "--log",
            "debug",
        ])
        .expect("valid arguments");

        assert_eq!(args.level, Some(PathBuf::from("museum.toml")));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.log, "debug");
        assert!(args.script.is_none());
    }
}
