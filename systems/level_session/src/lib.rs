#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Start-of-level orchestration: objective, opening message and guide text.

use std::time::Duration;

use loopwatch_core::{Command, Event, LevelConfig};
use tracing::debug;

/// How long the opening message stays on screen.
pub const OPENING_MESSAGE_DURATION: Duration = Duration::from_secs(5);

/// Configuration parameters required to construct the level session system.
#[derive(Clone, Debug)]
pub struct Config {
    objective: String,
    opening_message: String,
    guide_text: Duration,
}

impl Config {
    /// Creates a new configuration from the objective, opening message and guide text delay.
    #[must_use]
    pub fn new(objective: String, opening_message: String, guide_text: Duration) -> Self {
        Self {
            objective,
            opening_message,
            guide_text,
        }
    }

    /// Derives the configuration from a level description.
    #[must_use]
    pub fn for_level(level: &LevelConfig) -> Self {
        Self::new(
            level.objective.clone(),
            level.opening_message.clone(),
            level.guide_text_duration(),
        )
    }
}

/// Pure system that stages the opening of a level.
#[derive(Debug)]
pub struct LevelSession {
    config: Config,
    guide_remaining: Option<Duration>,
}

impl LevelSession {
    /// Creates a new level session system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            guide_remaining: None,
        }
    }

    /// Consumes world events and emits the opening commands and guide text timeout.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelStarted { name, .. } => {
                    debug!(level = %name, "staging level opening");
                    out.push(Command::CreateObjective {
                        description: self.config.objective.clone(),
                    });
                    out.push(Command::NotifyPlayer {
                        message: self.config.opening_message.clone(),
                        duration: OPENING_MESSAGE_DURATION,
                    });
                    if self.config.guide_text.is_zero() {
                        out.push(Command::HideGuideText);
                    } else {
                        self.guide_remaining = Some(self.config.guide_text);
                    }
                }
                Event::TimeAdvanced { dt } => {
                    let Some(remaining) = self.guide_remaining else {
                        continue;
                    };
                    let remaining = remaining.saturating_sub(*dt);
                    if remaining.is_zero() {
                        self.guide_remaining = None;
                        out.push(Command::HideGuideText);
                    } else {
                        self.guide_remaining = Some(remaining);
                    }
                }
                _ => {}
            }
        }
    }
}
