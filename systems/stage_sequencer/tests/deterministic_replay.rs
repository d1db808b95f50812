use std::time::Duration;

use loopwatch_core::{Command, Event, LevelConfig, StageId, TriggerKind};
use loopwatch_system_stage_sequencer::{Config, StageSequencer};
use loopwatch_world::{self as world, query, World};

#[test]
fn deterministic_replay_produces_identical_logs() {
    let first = replay(LevelConfig::default());
    let second = replay(LevelConfig::default());

    assert_eq!(first, second, "replay diverged between runs");

    let haunted = LevelConfig {
        anomaly_chance: 100,
        ..LevelConfig::default()
    };
    let first = replay(haunted.clone());
    let second = replay(haunted);
    assert_eq!(first, second, "replay diverged between runs");
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, Event::AnomalyActivated { .. })));
}

#[test]
fn different_seeds_shuffle_differently() {
    let orders: Vec<_> = (0..8u64)
        .map(|seed| {
            let world = World::new(LevelConfig {
                seed,
                ..LevelConfig::default()
            })
            .expect("valid config");
            query::anomaly_order(&world)
        })
        .collect();

    assert!(orders.windows(2).any(|pair| pair[0] != pair[1]));
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    events: Vec<Event>,
    current: Option<StageId>,
    progress: (usize, usize),
}

fn replay(config: LevelConfig) -> ReplayOutcome {
    let mut sequencer = StageSequencer::new(Config::for_level(&config));
    let mut world = World::new(config).expect("valid config");
    let mut log = Vec::new();

    submit(&mut world, &mut sequencer, Command::StartLevel, &mut log);
    for step in 0..12 {
        let current = query::current_stage(&world).expect("level started");
        if step % 3 == 1 {
            submit(&mut world, &mut sequencer, Command::PressReportButton, &mut log);
        }
        submit(
            &mut world,
            &mut sequencer,
            Command::EnterTrigger {
                stage: current,
                trigger: TriggerKind::Transition,
            },
            &mut log,
        );
        let next = log.iter().rev().find_map(|event| match event {
            Event::StageSpawned { stage, .. } => Some(*stage),
            _ => None,
        });
        if let Some(next) = next {
            submit(
                &mut world,
                &mut sequencer,
                Command::EnterTrigger {
                    stage: next,
                    trigger: TriggerKind::Offload,
                },
                &mut log,
            );
        }
        submit(
            &mut world,
            &mut sequencer,
            Command::Tick {
                dt: Duration::from_secs(7),
            },
            &mut log,
        );
    }

    ReplayOutcome {
        events: log,
        current: query::current_stage(&world),
        progress: query::objective_progress(&world),
    }
}

fn submit(world: &mut World, sequencer: &mut StageSequencer, command: Command, log: &mut Vec<Event>) {
    let mut commands = vec![command];
    while !commands.is_empty() {
        let mut events = Vec::new();
        for command in commands.drain(..) {
            world::apply(world, command, &mut events);
        }
        let snapshot = query::chain_snapshot(world);
        sequencer.handle(&events, &snapshot, &mut commands);
        log.extend(events);
    }
}
