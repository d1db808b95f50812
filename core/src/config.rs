//! Level configuration and the setup errors it can raise.

use std::{collections::HashSet, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AnomalyDefinition, AnomalyKind, TargetId, GENERATION_ROLL_RANGE, MAX_ANOMALIES};

const DEFAULT_TIME_LIMIT_SECS: f32 = 360.0;
const DEFAULT_ANOMALY_CHANCE: u8 = 50;
const DEFAULT_GUIDE_TEXT_SECS: f32 = 10.0;
const DEFAULT_STAGE_SPAN: [f32; 3] = [0.0, 1.0, 24.0];
const DEFAULT_SEED: u64 = 0x6d75_7365_756d_0001;

/// Target placed with the persistent objects when the level starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Identity of the target.
    pub id: TargetId,
    /// Whether the target is visible at level start and after resets.
    #[serde(default = "default_true")]
    pub initially_active: bool,
}

/// Tunable description of a single level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Display name of the level.
    pub name: String,
    /// Level loaded after this one completes.
    #[serde(default)]
    pub next_level: Option<String>,
    /// Seconds until the clock strikes six and the level fails.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: f32,
    /// Percent chance that a validated stage is followed by an anomaly.
    #[serde(default = "default_anomaly_chance")]
    pub anomaly_chance: u8,
    /// Prefab instantiated for every stage of the loop.
    #[serde(default)]
    pub stage_prefab: String,
    /// Prefab instantiated once the objectives are met.
    #[serde(default)]
    pub end_area_prefab: String,
    /// Offset between the origins of consecutive stages.
    #[serde(default = "default_stage_span")]
    pub stage_span: [f32; 3],
    /// Seed for every random decision taken during the level.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Description of the level objective.
    #[serde(default = "default_objective")]
    pub objective: String,
    /// Message shown when the level starts.
    #[serde(default = "default_opening_message")]
    pub opening_message: String,
    /// Seconds the guide text stays visible.
    #[serde(default = "default_guide_text_secs")]
    pub guide_text_secs: f32,
    /// Targets registered when the level starts.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    /// Anomalies that may be injected into the loop.
    #[serde(default)]
    pub anomalies: Vec<AnomalyDefinition>,
}

impl LevelConfig {
    /// Time limit of the level.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f32(self.time_limit_secs).unwrap_or(Duration::ZERO)
    }

    /// How long the guide text stays visible.
    #[must_use]
    pub fn guide_text_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.guide_text_secs).unwrap_or(Duration::ZERO)
    }

    /// Offset between consecutive stages.
    #[must_use]
    pub fn stage_span(&self) -> Vec3 {
        Vec3::from_array(self.stage_span)
    }

    /// Verifies that the level can start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_prefab.trim().is_empty() {
            return Err(ConfigError::MissingStagePrefab {
                level: self.name.clone(),
            });
        }
        if self.end_area_prefab.trim().is_empty() {
            return Err(ConfigError::MissingEndAreaPrefab {
                level: self.name.clone(),
            });
        }
        match Duration::try_from_secs_f32(self.time_limit_secs) {
            Ok(limit) if !limit.is_zero() => {}
            _ => {
                return Err(ConfigError::InvalidTimeLimit {
                    secs: self.time_limit_secs,
                })
            }
        }
        if Duration::try_from_secs_f32(self.guide_text_secs).is_err() {
            return Err(ConfigError::InvalidGuideText {
                secs: self.guide_text_secs,
            });
        }
        if self.anomalies.len() > MAX_ANOMALIES {
            return Err(ConfigError::TooManyAnomalies {
                count: self.anomalies.len(),
            });
        }
        if self.anomaly_chance > GENERATION_ROLL_RANGE {
            return Err(ConfigError::InvalidAnomalyChance {
                chance: self.anomaly_chance,
            });
        }
        let span = self.stage_span();
        if !span.is_finite() || span.length_squared() == 0.0 {
            return Err(ConfigError::DegenerateStageSpan);
        }

        let mut targets = HashSet::new();
        for spec in &self.targets {
            if !targets.insert(spec.id) {
                return Err(ConfigError::DuplicateTarget { target: spec.id });
            }
        }

        let mut names = HashSet::new();
        for anomaly in &self.anomalies {
            if !names.insert(anomaly.name.as_str()) {
                return Err(ConfigError::DuplicateAnomaly {
                    name: anomaly.name.clone(),
                });
            }
            if let Some(target) = anomaly.target {
                if !targets.contains(&target) {
                    return Err(ConfigError::UnknownAnomalyTarget {
                        anomaly: anomaly.name.clone(),
                        target,
                    });
                }
            }
            anomaly
                .effect
                .validate()
                .map_err(|reason| ConfigError::InvalidEffect {
                    anomaly: anomaly.name.clone(),
                    reason,
                })?;
        }

        Ok(())
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: "Museum".to_owned(),
            next_level: Some("Archive".to_owned()),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            anomaly_chance: DEFAULT_ANOMALY_CHANCE,
            stage_prefab: "stages/museum_loop".to_owned(),
            end_area_prefab: "stages/end_area".to_owned(),
            stage_span: DEFAULT_STAGE_SPAN,
            seed: DEFAULT_SEED,
            objective: default_objective(),
            opening_message: default_opening_message(),
            guide_text_secs: DEFAULT_GUIDE_TEXT_SECS,
            targets: vec![
                TargetSpec {
                    id: TargetId::new(1),
                    initially_active: true,
                },
                TargetSpec {
                    id: TargetId::new(2),
                    initially_active: true,
                },
                TargetSpec {
                    id: TargetId::new(3),
                    initially_active: true,
                },
            ],
            anomalies: vec![
                AnomalyDefinition::new("Duck", AnomalyKind::Duck).with_target(TargetId::new(1)),
                AnomalyDefinition::new(
                    "Player Messages",
                    AnomalyKind::PlayerMessages { interval_secs: 5.0 },
                ),
                AnomalyDefinition::new("Knocking On Door", AnomalyKind::KnockingOnDoor)
                    .with_target(TargetId::new(2)),
                AnomalyDefinition::new("Void Museum", AnomalyKind::VoidMuseum),
                AnomalyDefinition::new(
                    "Shrink",
                    AnomalyKind::Shrink {
                        duration_secs: 60.0,
                        min_scale: 0.01,
                    },
                )
                .with_target(TargetId::new(3)),
            ],
        }
    }
}

/// Setup errors that prevent a level from starting.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No stage prefab was assigned.
    #[error("level `{level}` has no stage prefab assigned")]
    MissingStagePrefab {
        /// Name of the offending level.
        level: String,
    },
    /// No end-area prefab was assigned.
    #[error("level `{level}` has no end-area prefab assigned")]
    MissingEndAreaPrefab {
        /// Name of the offending level.
        level: String,
    },
    /// The time limit is not a positive, representable number of seconds.
    #[error("time limit must be a positive number of seconds (received {secs})")]
    InvalidTimeLimit {
        /// Configured limit in seconds.
        secs: f32,
    },
    /// The guide text delay is negative or not a representable number of seconds.
    #[error("guide text delay must be a non-negative number of seconds (received {secs})")]
    InvalidGuideText {
        /// Configured delay in seconds.
        secs: f32,
    },
    /// The anomaly catalog exceeds [`MAX_ANOMALIES`] entries.
    #[error("level declares {count} anomalies, at most {} are supported", MAX_ANOMALIES)]
    TooManyAnomalies {
        /// Number of declared anomalies.
        count: usize,
    },
    /// The anomaly chance exceeds one hundred percent.
    #[error("anomaly chance must lie within 0..=100 (received {chance})")]
    InvalidAnomalyChance {
        /// Configured chance.
        chance: u8,
    },
    /// Consecutive stages would overlap.
    #[error("stage span must move each stage away from its predecessor")]
    DegenerateStageSpan,
    /// Two targets share an identity.
    #[error("target {} is declared more than once", .target.get())]
    DuplicateTarget {
        /// Duplicated identity.
        target: TargetId,
    },
    /// Two anomalies share a name.
    #[error("anomaly `{name}` is declared more than once")]
    DuplicateAnomaly {
        /// Duplicated name.
        name: String,
    },
    /// An anomaly points at a target that is never registered.
    #[error("anomaly `{anomaly}` references unknown target {}", .target.get())]
    UnknownAnomalyTarget {
        /// Name of the anomaly.
        anomaly: String,
        /// Missing target.
        target: TargetId,
    },
    /// An anomaly carries an unusable effect payload.
    #[error("anomaly `{anomaly}` has an invalid effect: {reason}")]
    InvalidEffect {
        /// Name of the anomaly.
        anomaly: String,
        /// What is wrong with the payload.
        reason: &'static str,
    },
}

fn default_true() -> bool {
    true
}

fn default_time_limit_secs() -> f32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_anomaly_chance() -> u8 {
    DEFAULT_ANOMALY_CHANCE
}

fn default_stage_span() -> [f32; 3] {
    DEFAULT_STAGE_SPAN
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_objective() -> String {
    "Find and report any anomaly.".to_owned()
}

fn default_opening_message() -> String {
    "I need to get out before the clock strikes 6 AM.".to_owned()
}

fn default_guide_text_secs() -> f32 {
    DEFAULT_GUIDE_TEXT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_valid() {
        assert_eq!(LevelConfig::default().validate(), Ok(()));
    }

    #[test]
    fn missing_stage_prefab_is_fatal() {
        let config = LevelConfig {
            stage_prefab: String::new(),
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingStagePrefab {
                level: "Museum".to_owned()
            })
        );
    }

    #[test]
    fn chance_above_hundred_is_rejected() {
        let config = LevelConfig {
            anomaly_chance: 101,
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidAnomalyChance { chance: 101 })
        );
    }

    #[test]
    fn zero_time_limit_is_rejected() {
        let config = LevelConfig {
            time_limit_secs: 0.0,
            ..LevelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeLimit { .. })
        ));
    }

    #[test]
    fn oversized_time_limit_is_rejected_at_setup() {
        let config = LevelConfig {
            time_limit_secs: 1e20,
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimeLimit { secs: 1e20 })
        );

        let config = LevelConfig {
            time_limit_secs: f32::NAN,
            ..LevelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeLimit { .. })
        ));
    }

    #[test]
    fn guide_text_delay_must_be_representable() {
        for secs in [-1.0, 1e20, f32::INFINITY] {
            let config = LevelConfig {
                guide_text_secs: secs,
                ..LevelConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidGuideText { .. })
            ));
        }

        let config = LevelConfig {
            guide_text_secs: 0.0,
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn anomaly_catalog_size_is_capped() {
        let anomalies = (0..=MAX_ANOMALIES)
            .map(|index| AnomalyDefinition::new(format!("Duck {index}"), AnomalyKind::Duck))
            .collect();
        let config = LevelConfig {
            anomalies,
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyAnomalies {
                count: MAX_ANOMALIES + 1
            })
        );
    }

    #[test]
    fn anomaly_targets_must_be_declared() {
        let mut config = LevelConfig::default();
        config.targets.retain(|spec| spec.id != TargetId::new(2));
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownAnomalyTarget {
                anomaly: "Knocking On Door".to_owned(),
                target: TargetId::new(2),
            })
        );
    }

    #[test]
    fn duplicate_anomaly_names_are_rejected() {
        let mut config = LevelConfig::default();
        config
            .anomalies
            .push(AnomalyDefinition::new("Duck", AnomalyKind::VoidMuseum));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAnomaly { name }) if name == "Duck"
        ));
    }

    #[test]
    fn flat_stage_span_is_rejected() {
        let config = LevelConfig {
            stage_span: [0.0; 3],
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DegenerateStageSpan));
    }

    #[test]
    fn error_messages_name_the_culprit() {
        let error = ConfigError::UnknownAnomalyTarget {
            anomaly: "Duck".to_owned(),
            target: TargetId::new(9),
        };
        assert_eq!(
            error.to_string(),
            "anomaly `Duck` references unknown target 9"
        );
    }
}
