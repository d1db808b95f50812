//! Closed catalog of anomaly kinds and the cues their effects produce.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TargetId;

/// Effect payload carried by an anomaly definition.
///
/// Every kind shares the same lifecycle (engage on activation, disengage on
/// transition, solve or reset), so the world treats them uniformly and only
/// the effects system dispatches on the variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A rubber duck that turns to follow the player whenever it is unseen.
    Duck,
    /// Cycles unsettling messages on the player's screen.
    PlayerMessages {
        /// Seconds between two consecutive messages.
        interval_secs: f32,
    },
    /// The museum wing vanishes, its door is sealed and someone knocks.
    KnockingOnDoor,
    /// The museum wing vanishes and its door swings open onto nothing.
    VoidMuseum,
    /// The player slowly shrinks.
    Shrink {
        /// Seconds needed to reach `min_scale`.
        duration_secs: f32,
        /// Scale the player ends at.
        min_scale: f32,
    },
}

impl AnomalyKind {
    /// Interval between messages for [`AnomalyKind::PlayerMessages`].
    #[must_use]
    pub fn message_interval(&self) -> Option<Duration> {
        match self {
            Self::PlayerMessages { interval_secs } => {
                Duration::try_from_secs_f32(*interval_secs).ok()
            }
            _ => None,
        }
    }

    /// Checks the payload, returning a short reason when it is unusable.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        match self {
            Self::PlayerMessages { interval_secs } => {
                if !(interval_secs.is_finite() && *interval_secs > 0.0) {
                    return Err("message interval must be positive");
                }
            }
            Self::Shrink {
                duration_secs,
                min_scale,
            } => {
                if !(duration_secs.is_finite() && *duration_secs > 0.0) {
                    return Err("shrink duration must be positive");
                }
                if !(*min_scale > 0.0 && *min_scale <= 1.0) {
                    return Err("shrink scale must lie within (0, 1]");
                }
            }
            Self::Duck | Self::KnockingOnDoor | Self::VoidMuseum => {}
        }
        Ok(())
    }
}

/// Anomaly entry of a level catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDefinition {
    /// Display name, unique within a level.
    pub name: String,
    /// Effect engaged while the anomaly is active.
    pub effect: AnomalyKind,
    /// Target hidden while the anomaly is active and revealed once solved.
    #[serde(default)]
    pub target: Option<TargetId>,
}

impl AnomalyDefinition {
    /// Creates a definition without an associated target.
    #[must_use]
    pub fn new(name: impl Into<String>, effect: AnomalyKind) -> Self {
        Self {
            name: name.into(),
            effect,
            target: None,
        }
    }

    /// Associates the definition with a target.
    #[must_use]
    pub fn with_target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Presentation cues produced while anomaly effects run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectCue {
    /// The duck starts or stops turning toward the player.
    DuckWatching {
        /// Whether the duck follows the player.
        following: bool,
    },
    /// The museum wing of the current stage is shown or hidden.
    MuseumVisible {
        /// Whether the wing is rendered.
        visible: bool,
    },
    /// The museum door swings open or closes.
    MuseumDoorOpen {
        /// Whether the door is open.
        open: bool,
    },
    /// The museum door refuses or accepts interaction.
    MuseumDoorSealed {
        /// Whether the door is sealed.
        sealed: bool,
    },
    /// Knocking audio starts or stops.
    Knocking {
        /// Whether the knocking plays.
        playing: bool,
    },
    /// The player model scale changed.
    PlayerScale {
        /// Uniform scale applied to the player.
        scale: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_interval_only_applies_to_messages() {
        let messages = AnomalyKind::PlayerMessages { interval_secs: 5.0 };
        assert_eq!(messages.message_interval(), Some(Duration::from_secs(5)));
        assert_eq!(AnomalyKind::Duck.message_interval(), None);
    }

    #[test]
    fn shrink_scale_is_bounded() {
        let valid = AnomalyKind::Shrink {
            duration_secs: 60.0,
            min_scale: 0.01,
        };
        let invalid = AnomalyKind::Shrink {
            duration_secs: 60.0,
            min_scale: 1.5,
        };
        assert!(valid.validate().is_ok());
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        let kind = AnomalyKind::PlayerMessages { interval_secs: 0.0 };
        assert_eq!(kind.validate(), Err("message interval must be positive"));
    }
}
