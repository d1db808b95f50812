use std::time::Duration;

use loopwatch_core::{Command, ConfigError, Event, LevelConfig, TriggerKind, TARGET_HOLD};
use loopwatch_presentation::{route, Transcript};
use loopwatch_system_anomaly_effects::{self as anomaly_effects, AnomalyEffects};
use loopwatch_system_level_session::{self as level_session, LevelSession};
use loopwatch_system_stage_sequencer::{self as stage_sequencer, StageSequencer};
use loopwatch_system_statistics::{Counters, Statistics};
use loopwatch_world::{self as world, query, World};
use tracing::{debug, info, warn};

use crate::script::{Script, Step};

/// Longest slice of simulated time applied in a single tick.
const TICK: Duration = Duration::from_secs(1);

/// Mixed into the level seed so effects draw from their own stream.
const EFFECTS_SEED_SALT: u64 = 0x6566_6665_6374_7321;

/// Headless game loop wiring the world to every system and the transcript.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    sequencer: StageSequencer,
    effects: AnomalyEffects,
    session: LevelSession,
    statistics: Statistics,
    transcript: Transcript,
}

impl Simulation {
    /// Builds the simulation, resuming the statistics from `counters`.
    pub(crate) fn new(level: LevelConfig, counters: Counters) -> Result<Self, ConfigError> {
        let sequencer = StageSequencer::new(stage_sequencer::Config::for_level(&level));
        let effects =
            AnomalyEffects::new(anomaly_effects::Config::new(level.seed ^ EFFECTS_SEED_SALT));
        let session = LevelSession::new(level_session::Config::for_level(&level));
        let world = World::new(level)?;
        Ok(Self {
            world,
            sequencer,
            effects,
            session,
            statistics: Statistics::new(counters),
            transcript: Transcript::new(),
        })
    }

    /// Plays every step of `script`, stopping once the level has ended.
    pub(crate) fn play(&mut self, script: &Script) {
        for step in script.steps() {
            if query::has_ended(&self.world) {
                info!("level ended, remaining steps skipped");
                break;
            }
            self.perform(*step);
        }
    }

    /// Lines the player would have seen.
    pub(crate) fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Lifetime counters including this run.
    pub(crate) fn counters(&self) -> Counters {
        self.statistics.counters()
    }

    /// Read access to the world for callers inspecting the outcome.
    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    fn perform(&mut self, step: Step) {
        debug!(?step, "performing step");
        match step {
            Step::Start => {
                let _ = self.submit(Command::StartLevel);
            }
            Step::Wait(duration) => self.wait(duration),
            Step::Report => {
                let _ = self.submit(Command::PressReportButton);
            }
            Step::Observe => {
                let haunted = query::current_stage(&self.world)
                    .and_then(|stage| query::stage(&self.world, stage))
                    .and_then(|stage| stage.anomaly())
                    .is_some();
                if haunted {
                    let _ = self.submit(Command::PressReportButton);
                }
            }
            Step::Walk => self.walk(),
            Step::Door(door) => {
                let Some(stage) = query::current_stage(&self.world) else {
                    warn!("no stage to open a door in");
                    return;
                };
                let _ = self.submit(Command::InteractDoor { stage, door });
            }
            Step::Collect => {
                let pending: Vec<_> = query::targets(&self.world)
                    .filter(|target| target.is_visible() && !target.is_completed())
                    .map(|target| target.id())
                    .collect();
                for target in pending {
                    let _ = self.submit(Command::InteractTarget {
                        target,
                        held: TARGET_HOLD,
                    });
                }
            }
            Step::Target { target, held } => {
                let _ = self.submit(Command::InteractTarget { target, held });
            }
            Step::Escape => {
                let _ = self.submit(Command::EnterEndArea);
            }
            Step::Caught => {
                let _ = self.submit(Command::EnemyContact);
            }
        }
    }

    fn wait(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() && !query::has_ended(&self.world) {
            let dt = remaining.min(TICK);
            remaining -= dt;
            let _ = self.submit(Command::Tick { dt });
        }
    }

    fn walk(&mut self) {
        let Some(current) = query::current_stage(&self.world) else {
            warn!("no stage to walk through");
            return;
        };
        let events = self.submit(Command::EnterTrigger {
            stage: current,
            trigger: TriggerKind::Transition,
        });
        let successor = events.iter().find_map(|event| match event {
            Event::StageSpawned { stage, .. } => Some(*stage),
            _ => None,
        });
        if let Some(stage) = successor {
            let _ = self.submit(Command::EnterTrigger {
                stage,
                trigger: TriggerKind::Offload,
            });
        }
    }

    /// Applies `command` and every command the systems answer with.
    fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut log = Vec::new();
        let mut commands = vec![command];
        while !commands.is_empty() {
            let mut events = Vec::new();
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            route(&events, &mut self.transcript);
            self.statistics.handle(&events);

            let snapshot = query::chain_snapshot(&self.world);
            self.sequencer.handle(&events, &snapshot, &mut commands);
            self.effects.handle(&events, &mut commands);
            self.session.handle(&events, &mut commands);
            log.extend(events);
        }
        log
    }
}
