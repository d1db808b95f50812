#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stage sequencer that chains rooms and validates the player's reports.
//!
//! The sequencer reacts to the trigger events broadcast by the world. Crossing
//! the transition trigger requests the next stage (or the end area once the
//! objectives are met). Crossing the offload trigger validates the stage left
//! behind, rolls whether the new stage carries an anomaly and discards the
//! predecessor.

use loopwatch_core::{
    ChainSnapshot, Command, DoorSide, Event, LevelConfig, StageId, GENERATION_ROLL_RANGE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

const SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Configuration parameters required to construct the stage sequencer.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    anomaly_chance: u8,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided generation chance and seed.
    #[must_use]
    pub const fn new(anomaly_chance: u8, rng_seed: u64) -> Self {
        Self {
            anomaly_chance,
            rng_seed,
        }
    }

    /// Derives the configuration from a level description.
    #[must_use]
    pub fn for_level(level: &LevelConfig) -> Self {
        Self::new(level.anomaly_chance, level.seed ^ SEED_SALT)
    }
}

/// Outcome of comparing the player's report with the predecessor's anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The player reported an anomaly that was present, or stayed silent in a clean stage.
    Correct,
    /// The player reported a clean stage, or missed an anomaly.
    Mismatch,
}

/// Judges the report made while traversing a stage.
#[must_use]
pub const fn validate(button_pressed: bool, had_anomaly: bool) -> Verdict {
    if button_pressed == had_anomaly {
        Verdict::Correct
    } else {
        Verdict::Mismatch
    }
}

/// Reports whether a roll in `0..GENERATION_ROLL_RANGE` asks for an anomaly.
#[must_use]
pub const fn roll_generates(roll: u8, chance: u8) -> bool {
    roll < chance
}

/// Pure system that reacts to trigger crossings with chain maintenance commands.
#[derive(Debug)]
pub struct StageSequencer {
    anomaly_chance: u8,
    rng: ChaCha8Rng,
}

impl StageSequencer {
    /// Creates a new stage sequencer using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            anomaly_chance: config.anomaly_chance.min(GENERATION_ROLL_RANGE),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes world events and the chain snapshot to emit follow-up commands.
    pub fn handle(&mut self, events: &[Event], chain: &ChainSnapshot, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TransitionTriggered { stage } => self.on_transition(*stage, chain, out),
                Event::OffloadTriggered { stage, predecessor } => {
                    self.on_offload(*stage, *predecessor, chain, out);
                }
                _ => {}
            }
        }
    }

    fn on_transition(&mut self, stage: StageId, chain: &ChainSnapshot, out: &mut Vec<Command>) {
        if chain.objectives_met() {
            debug!(stage = stage.get(), "objectives met, requesting end area");
            out.push(Command::SpawnEndArea { after: stage });
        } else {
            out.push(Command::SpawnStage { after: stage });
        }
        out.push(Command::CloseDoor {
            stage,
            door: DoorSide::Exit,
        });
        if chain.active_anomaly().is_some() {
            out.push(Command::DeactivateAnomalyEffect);
        }
    }

    fn on_offload(
        &mut self,
        stage: StageId,
        predecessor: Option<StageId>,
        chain: &ChainSnapshot,
        out: &mut Vec<Command>,
    ) {
        out.push(Command::CloseDoor {
            stage,
            door: DoorSide::Entry,
        });

        let Some(predecessor) = predecessor else {
            debug!(stage = stage.get(), "first stage offloaded, nothing to validate");
            return;
        };

        let anomaly = chain
            .stage(predecessor)
            .and_then(|snapshot| snapshot.anomaly);
        let pressed = chain.report_button_pressed();
        let verdict = validate(pressed, anomaly.is_some());
        info!(
            stage = predecessor.get(),
            pressed,
            had_anomaly = anomaly.is_some(),
            ?verdict,
            "stage validated"
        );
        match (verdict, anomaly) {
            (Verdict::Correct, Some(anomaly)) => out.push(Command::SolveAnomaly { anomaly }),
            (Verdict::Correct, None) => {}
            (Verdict::Mismatch, _) => out.push(Command::ResetLevelProgress),
        }
        out.push(Command::DeactivateAnomalyEffect);

        let roll = self.rng.gen_range(0..GENERATION_ROLL_RANGE);
        if roll_generates(roll, self.anomaly_chance) {
            debug!(stage = stage.get(), roll, "anomaly requested");
            out.push(Command::GenerateAnomaly { stage });
        } else {
            out.push(Command::ClearAnomaly { stage });
        }

        out.push(Command::ResetReportButton);
        out.push(Command::DestroyStage { stage: predecessor });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_matches_report_against_presence() {
        assert_eq!(validate(true, true), Verdict::Correct);
        assert_eq!(validate(false, false), Verdict::Correct);
        assert_eq!(validate(true, false), Verdict::Mismatch);
        assert_eq!(validate(false, true), Verdict::Mismatch);
    }

    #[test]
    fn zero_chance_never_generates() {
        assert!((0..GENERATION_ROLL_RANGE).all(|roll| !roll_generates(roll, 0)));
    }

    #[test]
    fn full_chance_always_generates() {
        assert!((0..GENERATION_ROLL_RANGE).all(|roll| roll_generates(roll, 100)));
    }

    #[test]
    fn chance_above_range_is_clamped() {
        let sequencer = StageSequencer::new(Config::new(250, 0));
        assert_eq!(sequencer.anomaly_chance, GENERATION_ROLL_RANGE);
    }
}
