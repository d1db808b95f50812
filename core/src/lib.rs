#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Loopwatch level simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations (usually the player crossing a trigger or
//! pressing something), the world executes those commands via its `apply`
//! entry point, and then broadcasts [`Event`] values for systems and the
//! presentation layer to react to deterministically. Systems consume event
//! streams, query immutable snapshots, and respond exclusively with new
//! command batches.

use std::{fmt, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};

mod catalog;
mod config;

pub use catalog::{AnomalyDefinition, AnomalyKind, EffectCue};
pub use config::{ConfigError, LevelConfig, TargetSpec};

/// Number of in-game hours the level clock spans before the countdown expires.
pub const CLOCK_HOURS: u32 = 6;

/// Minimum hold required before a target registers as completed.
pub const TARGET_HOLD: Duration = Duration::from_secs(3);

/// Exclusive upper bound of the roll deciding whether a stage receives an anomaly.
pub const GENERATION_ROLL_RANGE: u8 = 100;

/// Largest anomaly catalog a level may declare.
pub const MAX_ANOMALIES: usize = 256;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Spawns the first stage, registers configured targets and starts the clock.
    StartLevel,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports that the player crossed one of the boundary triggers of a stage.
    EnterTrigger {
        /// Stage owning the trigger.
        stage: StageId,
        /// Which of the stage's triggers was crossed.
        trigger: TriggerKind,
    },
    /// Instantiates a successor stage ahead of the provided stage.
    SpawnStage {
        /// Stage whose exit pivot anchors the new stage.
        after: StageId,
    },
    /// Instantiates the terminal end area ahead of the provided stage.
    SpawnEndArea {
        /// Stage whose exit pivot anchors the end area.
        after: StageId,
    },
    /// Reports that the player walked into the spawned end area.
    EnterEndArea,
    /// Closes a stage door and locks it against further interaction.
    CloseDoor {
        /// Stage owning the door.
        stage: StageId,
        /// Which door of the stage to close.
        door: DoorSide,
    },
    /// Player interaction with a stage door.
    InteractDoor {
        /// Stage owning the door.
        stage: StageId,
        /// Which door of the stage the player used.
        door: DoorSide,
    },
    /// Player pressed the anomaly report button.
    PressReportButton,
    /// Clears the manual action flag after a stage validation.
    ResetReportButton,
    /// Marks the provided anomaly as correctly reported.
    SolveAnomaly {
        /// Anomaly that was reported.
        anomaly: AnomalyId,
    },
    /// Ends the effect of the active anomaly without touching its solved state.
    DeactivateAnomalyEffect,
    /// Draws the next anomaly from the pool and engages it inside the stage.
    GenerateAnomaly {
        /// Stage that receives the anomaly.
        stage: StageId,
    },
    /// Records that the stage holds no anomaly and clears the active selection.
    ClearAnomaly {
        /// Stage that is declared anomaly free.
        stage: StageId,
    },
    /// Clears every target and anomaly and reshuffles the pool.
    ResetLevelProgress,
    /// Tears down a stage instance that the player left behind.
    DestroyStage {
        /// Stage to destroy.
        stage: StageId,
    },
    /// Registers a target object instantiated by a room.
    RegisterTarget {
        /// Identity of the target.
        target: TargetId,
        /// Stage owning the target, if it is tied to a room.
        owner: Option<StageId>,
        /// Whether the target should be visible when the level starts or resets.
        initially_active: bool,
    },
    /// Player held the interact key on a target.
    InteractTarget {
        /// Target the player is looking at.
        target: TargetId,
        /// How long the interaction was held.
        held: Duration,
    },
    /// Adds an objective to the ledger.
    CreateObjective {
        /// Human-readable description shown to the player.
        description: String,
    },
    /// Requests a message to be shown to the player.
    NotifyPlayer {
        /// Text to display.
        message: String,
        /// How long the message stays on screen.
        duration: Duration,
    },
    /// Hides the introductory guide text.
    HideGuideText,
    /// Forwards a presentation cue produced by an anomaly effect.
    PlayCue {
        /// Cue to broadcast.
        cue: EffectCue,
    },
    /// Reports that an enemy reached the player.
    EnemyContact,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the level started and the first stage exists.
    LevelStarted {
        /// Display name of the level.
        name: String,
        /// Identifier of the first stage.
        stage: StageId,
        /// Pose at which the first stage sits.
        pose: Pose,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a new value for the in-game clock display.
    ClockChanged {
        /// Hour that should be displayed.
        hour: ClockHour,
    },
    /// The player crossed the forward boundary of a stage.
    TransitionTriggered {
        /// Stage whose transition trigger fired.
        stage: StageId,
    },
    /// The player crossed the boundary that leaves the predecessor behind.
    OffloadTriggered {
        /// Stage whose offload trigger fired; it is now the current stage.
        stage: StageId,
        /// Stage left behind, absent for the first stage of the level.
        predecessor: Option<StageId>,
    },
    /// Reports that a trigger crossing was refused.
    TriggerRejected {
        /// Stage the trigger was reported for.
        stage: StageId,
        /// Trigger that was reported.
        trigger: TriggerKind,
        /// Specific reason the crossing was refused.
        reason: TriggerError,
    },
    /// Confirms that a successor stage was instantiated.
    StageSpawned {
        /// Identifier assigned to the new stage.
        stage: StageId,
        /// Stage the new one is linked behind.
        predecessor: StageId,
        /// Pose at which the stage prefab should be placed.
        pose: Pose,
        /// Prefab the instancer should spawn.
        prefab: String,
    },
    /// Confirms that the terminal end area was instantiated.
    EndAreaSpawned {
        /// Stage the end area follows.
        after: StageId,
        /// Pose at which the end area prefab should be placed.
        pose: Pose,
        /// Prefab the instancer should spawn.
        prefab: String,
    },
    /// Reports that entering the end area was refused.
    EndAreaRejected {
        /// Specific reason the crossing was refused.
        reason: TriggerError,
    },
    /// Confirms that a stage instance was torn down.
    StageDestroyed {
        /// Identifier of the destroyed stage.
        stage: StageId,
    },
    /// The persistent-objects anchor followed the chain to a new position.
    PersistentAnchorMoved {
        /// New world position of the anchor.
        position: Vec3,
    },
    /// A door was closed and locked.
    DoorLocked {
        /// Stage owning the door.
        stage: StageId,
        /// Which door was locked.
        door: DoorSide,
    },
    /// A door was opened by the player.
    DoorOpened {
        /// Stage owning the door.
        stage: StageId,
        /// Which door was opened.
        door: DoorSide,
    },
    /// A door was shut by the player.
    DoorShut {
        /// Stage owning the door.
        stage: StageId,
        /// Which door was shut.
        door: DoorSide,
    },
    /// Reports that a door interaction was refused.
    DoorInteractionRejected {
        /// Stage the door was reported for.
        stage: StageId,
        /// Which door the player used.
        door: DoorSide,
        /// Specific reason the interaction failed.
        reason: DoorRejection,
    },
    /// The manual action flag was raised.
    ReportButtonPressed,
    /// The manual action flag was cleared.
    ReportButtonReset,
    /// An anomaly was drawn from the pool and placed into a stage.
    AnomalyActivated {
        /// Identifier of the anomaly.
        anomaly: AnomalyId,
        /// Display name of the anomaly.
        name: String,
        /// Stage hosting the anomaly.
        stage: StageId,
    },
    /// The effect of an anomaly started.
    AnomalyEffectEngaged {
        /// Identifier of the anomaly.
        anomaly: AnomalyId,
        /// Effect payload that should start.
        kind: AnomalyKind,
    },
    /// The effect of an anomaly ended.
    AnomalyEffectDisengaged {
        /// Identifier of the anomaly.
        anomaly: AnomalyId,
        /// Effect payload that should stop.
        kind: AnomalyKind,
        /// Whether the effect was cancelled by a progress reset.
        forced: bool,
    },
    /// The player reported an anomaly that was present.
    AnomalySolved {
        /// Identifier of the anomaly.
        anomaly: AnomalyId,
    },
    /// No anomaly is active anymore.
    AnomalyCleared {
        /// Anomaly that was active before clearing.
        anomaly: AnomalyId,
    },
    /// A generation request found no unused anomaly left in the pool.
    AnomalyPoolExhausted,
    /// Every target and anomaly was reset after a failed stage validation.
    LevelProgressReset,
    /// A target joined the registry.
    TargetRegistered {
        /// Identity of the target.
        target: TargetId,
    },
    /// A target left the registry together with its owning stage.
    TargetUnregistered {
        /// Identity of the target.
        target: TargetId,
    },
    /// A target was completed by the player.
    TargetCompleted {
        /// Identity of the target.
        target: TargetId,
    },
    /// A target returned to its level-start state.
    TargetReset {
        /// Identity of the target.
        target: TargetId,
    },
    /// A target was shown or hidden.
    TargetVisibilityChanged {
        /// Identity of the target.
        target: TargetId,
        /// Whether the target is now visible and interactable.
        visible: bool,
    },
    /// Reports that a target interaction was refused.
    TargetInteractionRejected {
        /// Identity of the target.
        target: TargetId,
        /// Specific reason the interaction failed.
        reason: TargetRejection,
    },
    /// An objective was added to the ledger.
    ObjectiveCreated {
        /// Identifier of the objective.
        objective: ObjectiveId,
        /// Description of the objective.
        description: String,
    },
    /// The surfaced objective text changed.
    ObjectiveUpdated {
        /// Identifier of the objective.
        objective: ObjectiveId,
        /// Text including the progress counter.
        text: String,
    },
    /// The surfaced objective was completed.
    ObjectiveCompleted {
        /// Identifier of the objective.
        objective: ObjectiveId,
    },
    /// The surfaced objective failed.
    ObjectiveFailed {
        /// Identifier of the objective.
        objective: ObjectiveId,
    },
    /// Every registered target is completed; the next transition leads out.
    ObjectivesMet,
    /// A message should be displayed to the player.
    PlayerMessage {
        /// Text to display.
        message: String,
        /// How long the message stays on screen.
        duration: Duration,
    },
    /// The introductory guide text should disappear.
    GuideTextHidden,
    /// A presentation cue produced by an anomaly effect.
    CueTriggered {
        /// Cue to present.
        cue: EffectCue,
    },
    /// Player control was enabled or disabled.
    PlayerControlChanged {
        /// Whether the player may act.
        allowed: bool,
    },
    /// The level reached its successful terminal state.
    LevelCompleted,
    /// The level reached its failed terminal state.
    LevelFailed {
        /// What ended the level.
        cause: FailureCause,
    },
}

/// Boundary triggers owned by each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Far boundary that requests the next stage.
    Transition,
    /// Near boundary that validates and discards the predecessor.
    Offload,
}

/// Reasons a trigger crossing may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerError {
    /// No live stage carries the provided identifier.
    UnknownStage,
    /// The trigger already fired once; triggers are single use.
    AlreadyFired,
    /// The player cannot have reached the trigger from the current stage.
    OutOfOrder,
    /// The level already reached a terminal outcome.
    LevelEnded,
    /// The end area was entered before it was spawned.
    EndAreaMissing,
}

/// Doors attached to a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorSide {
    /// Door the player walks in through.
    Entry,
    /// Door leading to the next stage.
    Exit,
}

/// Reasons a door interaction may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorRejection {
    /// No live stage carries the provided identifier.
    UnknownStage,
    /// The door was locked by the stage sequencer.
    Locked,
    /// Player control is currently disabled.
    ControlDisabled,
}

/// Reasons a target interaction may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetRejection {
    /// No registered target carries the provided identifier.
    Unknown,
    /// The target is hidden, usually by an unsolved anomaly.
    Hidden,
    /// The target was completed earlier.
    AlreadyCompleted,
    /// The interact key was released before [`TARGET_HOLD`] elapsed.
    HoldTooShort,
    /// Player control is currently disabled.
    ControlDisabled,
}

/// Lifecycle of a stage instance within the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StagePhase {
    /// Instantiated ahead of the player; doors unlocked.
    Spawned,
    /// The player crossed the offload trigger; this is the current stage.
    Offloaded,
    /// The transition trigger fired and a successor exists.
    TransitionArmed,
}

/// Causes that end a level in failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// The countdown reached the level time limit.
    TimerExpired,
    /// An enemy reached the player.
    CaughtByEnemy,
}

/// Unique identifier assigned to a stage instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u32);

impl StageId {
    /// Creates a new stage identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identity of an interactable target object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u32);

impl TargetId {
    /// Creates a new target identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an anomaly definition; the position in the level catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnomalyId(u32);

impl AnomalyId {
    /// Creates a new anomaly identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an objective in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectiveId(u32);

impl ObjectiveId {
    /// Creates a new objective identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Placement of a spawned instance in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    position: Vec3,
    yaw_degrees: f32,
}

impl Pose {
    /// Creates a pose from a position and a rotation around the vertical axis.
    #[must_use]
    pub const fn new(position: Vec3, yaw_degrees: f32) -> Self {
        Self {
            position,
            yaw_degrees,
        }
    }

    /// World position of the instance origin.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation around the vertical axis in degrees.
    #[must_use]
    pub const fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    /// Returns the pose translated by `offset`, keeping its rotation.
    #[must_use]
    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            position: self.position + offset,
            yaw_degrees: self.yaw_degrees,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0)
    }
}

/// Discretised in-game hour shown on the level clock.
///
/// The level time limit is split into [`CLOCK_HOURS`] equal hours starting at
/// midnight, so hour zero displays as `12 AM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockHour(u32);

impl ClockHour {
    /// Hour displayed when the level starts.
    pub const MIDNIGHT: Self = Self(0);

    /// Creates a clock hour from the number of whole hours elapsed.
    #[must_use]
    pub const fn new(hours_elapsed: u32) -> Self {
        Self(hours_elapsed)
    }

    /// Derives the hour for `elapsed` time out of a `limit` long level.
    #[must_use]
    pub fn from_elapsed(elapsed: Duration, limit: Duration) -> Self {
        let hour_length = limit.as_secs_f64() / f64::from(CLOCK_HOURS);
        if hour_length <= 0.0 {
            return Self::MIDNIGHT;
        }
        let hours = (elapsed.as_secs_f64() / hour_length).floor();
        Self(hours as u32)
    }

    /// Number of whole hours elapsed since midnight.
    #[must_use]
    pub const fn hours_elapsed(&self) -> u32 {
        self.0
    }

    /// Hour number as shown on a twelve-hour dial.
    #[must_use]
    pub const fn dial(&self) -> u32 {
        if self.0 == 0 {
            12
        } else {
            self.0
        }
    }
}

impl fmt::Display for ClockHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AM", self.dial())
    }
}

/// Capability shared by every object the player can use.
pub trait Interactable {
    /// Result reported back to the world after an interaction.
    type Outcome;

    /// Reports whether the object currently accepts interactions.
    fn is_interactable(&self) -> bool;

    /// Applies an interaction that was held for `held`.
    fn interact(&mut self, held: Duration) -> Self::Outcome;
}

/// Immutable representation of a single stage used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageSnapshot {
    /// Identifier of the stage.
    pub id: StageId,
    /// Stage this one was spawned behind, absent for the first stage.
    pub predecessor: Option<StageId>,
    /// Current lifecycle phase.
    pub phase: StagePhase,
    /// Anomaly generated for the stage, if any.
    pub anomaly: Option<AnomalyId>,
    /// Pose at which the stage was spawned.
    pub pose: Pose,
}

/// Read-only snapshot of the stage chain and the flags the sequencer consults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainSnapshot {
    stages: Vec<StageSnapshot>,
    current: Option<StageId>,
    report_button_pressed: bool,
    objectives_met: bool,
    active_anomaly: Option<AnomalyId>,
}

impl ChainSnapshot {
    /// Creates a snapshot from captured stages and session flags.
    #[must_use]
    pub fn new(
        mut stages: Vec<StageSnapshot>,
        current: Option<StageId>,
        report_button_pressed: bool,
        objectives_met: bool,
        active_anomaly: Option<AnomalyId>,
    ) -> Self {
        stages.sort_by_key(|stage| stage.id);
        Self {
            stages,
            current,
            report_button_pressed,
            objectives_met,
            active_anomaly,
        }
    }

    /// Looks up a live stage by identifier.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&StageSnapshot> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    /// Iterator over live stages ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &StageSnapshot> {
        self.stages.iter()
    }

    /// Stage the player currently occupies.
    #[must_use]
    pub const fn current(&self) -> Option<StageId> {
        self.current
    }

    /// Whether the report button was pressed since the last validation.
    #[must_use]
    pub const fn report_button_pressed(&self) -> bool {
        self.report_button_pressed
    }

    /// Whether every registered target is completed.
    #[must_use]
    pub const fn objectives_met(&self) -> bool {
        self.objectives_met
    }

    /// Anomaly currently selected from the pool.
    #[must_use]
    pub const fn active_anomaly(&self) -> Option<AnomalyId> {
        self.active_anomaly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_midnight() {
        let limit = Duration::from_secs(360);
        let hour = ClockHour::from_elapsed(Duration::ZERO, limit);
        assert_eq!(hour, ClockHour::MIDNIGHT);
        assert_eq!(hour.to_string(), "12 AM");
    }

    #[test]
    fn clock_divides_limit_into_six_hours() {
        let limit = Duration::from_secs(360);
        assert_eq!(
            ClockHour::from_elapsed(Duration::from_secs(59), limit).to_string(),
            "12 AM"
        );
        assert_eq!(
            ClockHour::from_elapsed(Duration::from_secs(60), limit).to_string(),
            "1 AM"
        );
        assert_eq!(
            ClockHour::from_elapsed(Duration::from_secs(300), limit).to_string(),
            "5 AM"
        );
    }

    #[test]
    fn clock_handles_zero_limit() {
        assert_eq!(
            ClockHour::from_elapsed(Duration::from_secs(5), Duration::ZERO),
            ClockHour::MIDNIGHT
        );
    }

    #[test]
    fn pose_translation_keeps_rotation() {
        let pose = Pose::new(Vec3::new(1.0, 0.0, 0.0), 90.0);
        let moved = pose.translated(Vec3::new(0.0, 1.0, 20.0));
        assert_eq!(moved.position(), Vec3::new(1.0, 1.0, 20.0));
        assert_eq!(moved.yaw_degrees(), 90.0);
    }

    #[test]
    fn chain_snapshot_orders_stages() {
        let stage = |id: u32| StageSnapshot {
            id: StageId::new(id),
            predecessor: None,
            phase: StagePhase::Spawned,
            anomaly: None,
            pose: Pose::default(),
        };
        let snapshot = ChainSnapshot::new(vec![stage(3), stage(1)], None, false, false, None);
        let ids: Vec<_> = snapshot.iter().map(|stage| stage.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(snapshot.stage(StageId::new(2)).is_none());
    }
}
