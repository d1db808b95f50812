#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lifetime counters shown on the main menu statistics panel.

use loopwatch_core::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counters persisted across play sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Counters {
    /// Stages spawned ahead of the player.
    #[serde(default)]
    pub rooms_traveled: u32,
    /// Doors the player opened.
    #[serde(default)]
    pub doors_opened: u32,
}

impl Counters {
    /// Parses counters stored as JSON.
    pub fn from_json(text: &str) -> Result<Self, StatisticsError> {
        serde_json::from_str(text).map_err(StatisticsError::Decode)
    }

    /// Renders the counters as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, StatisticsError> {
        serde_json::to_string_pretty(self).map_err(StatisticsError::Encode)
    }
}

/// Errors raised while loading or storing counters.
#[derive(Debug, Error)]
pub enum StatisticsError {
    /// The stored counters could not be parsed.
    #[error("failed to decode statistics")]
    Decode(#[source] serde_json::Error),
    /// The counters could not be rendered.
    #[error("failed to encode statistics")]
    Encode(#[source] serde_json::Error),
}

/// Pure system that accumulates lifetime counters from world events.
#[derive(Debug, Default)]
pub struct Statistics {
    counters: Counters,
}

impl Statistics {
    /// Creates a statistics system resuming from previously stored counters.
    #[must_use]
    pub const fn new(counters: Counters) -> Self {
        Self { counters }
    }

    /// Current counter values.
    #[must_use]
    pub const fn counters(&self) -> Counters {
        self.counters
    }

    /// Consumes world events and bumps the matching counters.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::StageSpawned { .. } => {
                    self.counters.rooms_traveled = self.counters.rooms_traveled.saturating_add(1);
                }
                Event::DoorOpened { .. } => {
                    self.counters.doors_opened = self.counters.doors_opened.saturating_add(1);
                }
                _ => {}
            }
        }
    }
}
