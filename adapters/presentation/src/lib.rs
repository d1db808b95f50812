#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation contract consumed by Loopwatch adapters.
//!
//! The world never renders anything itself. Adapters implement
//! [`Presentation`] and feed broadcast events through [`route`], which
//! translates them into the narrow set of calls a scene layer needs.

use std::time::Duration;

use glam::Vec3;
use loopwatch_core::{DoorSide, EffectCue, Event, FailureCause, Pose, StageId, TargetId};
use tracing::debug;

/// Visual state a door should be shown in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorVisual {
    /// The door swung open.
    Open,
    /// The door swung shut but remains usable.
    Shut,
    /// The door is closed and refuses further interaction.
    Locked,
}

/// Visual state a target should be shown in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetVisual {
    /// The target is rendered and may be used.
    Shown,
    /// The target is hidden behind an active anomaly.
    Hidden,
    /// The target was completed by the player.
    Completed,
    /// The target returned to its level-start state.
    Restored,
}

/// End-of-level sequence the presentation layer should play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndSequence {
    /// The player escaped through the end area.
    Complete,
    /// The level was lost.
    Fail(FailureCause),
}

/// Scene layer capable of presenting Loopwatch levels.
pub trait Presentation {
    /// Places the first stage of a freshly started level.
    fn begin_level(&mut self, name: &str, stage: StageId, pose: Pose);

    /// Replaces the surfaced objective text.
    fn show_objective(&mut self, text: &str);

    /// Marks the surfaced objective as completed or failed.
    fn resolve_objective(&mut self, completed: bool);

    /// Replaces the time-of-day display, for example `"3 AM"`.
    fn show_clock(&mut self, display: &str);

    /// Shows a message to the player for `duration`.
    fn show_message(&mut self, message: &str, duration: Duration);

    /// Removes the introductory guide text.
    fn hide_guide_text(&mut self);

    /// Instantiates a stage prefab at `pose`.
    fn spawn_stage(&mut self, stage: StageId, prefab: &str, pose: Pose);

    /// Instantiates the end area prefab at `pose`.
    fn spawn_end_area(&mut self, prefab: &str, pose: Pose);

    /// Tears down a stage instance.
    fn destroy_stage(&mut self, stage: StageId);

    /// Moves the persistent-objects anchor.
    fn move_anchor(&mut self, position: Vec3);

    /// Updates the visual state of a door.
    fn update_door(&mut self, stage: StageId, door: DoorSide, visual: DoorVisual);

    /// Updates the visual state of a target.
    fn update_target(&mut self, target: TargetId, visual: TargetVisual);

    /// Plays a cue produced by an anomaly effect.
    fn play_cue(&mut self, cue: EffectCue);

    /// Enables or disables player input.
    fn set_player_control(&mut self, allowed: bool);

    /// Runs the end-of-level sequence.
    fn play_end_sequence(&mut self, ending: EndSequence);
}

/// Forwards every presentable event to `presentation` in broadcast order.
///
/// Events without a visual counterpart are skipped.
pub fn route<P>(events: &[Event], presentation: &mut P)
where
    P: Presentation + ?Sized,
{
    for event in events {
        match event {
            Event::LevelStarted { name, stage, pose } => {
                presentation.begin_level(name, *stage, *pose);
            }
            Event::ClockChanged { hour } => presentation.show_clock(&hour.to_string()),
            Event::StageSpawned {
                stage, pose, prefab, ..
            } => presentation.spawn_stage(*stage, prefab, *pose),
            Event::EndAreaSpawned { pose, prefab, .. } => {
                presentation.spawn_end_area(prefab, *pose);
            }
            Event::StageDestroyed { stage } => presentation.destroy_stage(*stage),
            Event::PersistentAnchorMoved { position } => presentation.move_anchor(*position),
            Event::DoorLocked { stage, door } => {
                presentation.update_door(*stage, *door, DoorVisual::Locked);
            }
            Event::DoorOpened { stage, door } => {
                presentation.update_door(*stage, *door, DoorVisual::Open);
            }
            Event::DoorShut { stage, door } => {
                presentation.update_door(*stage, *door, DoorVisual::Shut);
            }
            Event::TargetVisibilityChanged { target, visible } => {
                let visual = if *visible {
                    TargetVisual::Shown
                } else {
                    TargetVisual::Hidden
                };
                presentation.update_target(*target, visual);
            }
            Event::TargetCompleted { target } => {
                presentation.update_target(*target, TargetVisual::Completed);
            }
            Event::TargetReset { target } => {
                presentation.update_target(*target, TargetVisual::Restored);
            }
            Event::ObjectiveUpdated { text, .. } => presentation.show_objective(text),
            Event::ObjectiveCompleted { .. } => presentation.resolve_objective(true),
            Event::ObjectiveFailed { .. } => presentation.resolve_objective(false),
            Event::PlayerMessage { message, duration } => {
                presentation.show_message(message, *duration);
            }
            Event::GuideTextHidden => presentation.hide_guide_text(),
            Event::CueTriggered { cue } => presentation.play_cue(*cue),
            Event::PlayerControlChanged { allowed } => presentation.set_player_control(*allowed),
            Event::LevelCompleted => presentation.play_end_sequence(EndSequence::Complete),
            Event::LevelFailed { cause } => {
                presentation.play_end_sequence(EndSequence::Fail(*cause));
            }
            Event::TriggerRejected { .. }
            | Event::EndAreaRejected { .. }
            | Event::DoorInteractionRejected { .. }
            | Event::TargetInteractionRejected { .. } => {
                debug!(?event, "rejection has no visual counterpart");
            }
            _ => {}
        }
    }
}

/// Presentation that records every call as a line of text.
///
/// Used by the headless binary and by tests that assert on what a player
/// would have seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the transcript and returns its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Reports whether any recorded line equals `line`.
    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|recorded| recorded == line)
    }

    fn record(&mut self, line: String) {
        self.lines.push(line);
    }
}

fn describe_pose(pose: Pose) -> String {
    let position = pose.position();
    format!(
        "({:.1}, {:.1}, {:.1}) yaw {:.0}",
        position.x,
        position.y,
        position.z,
        pose.yaw_degrees()
    )
}

fn describe_cue(cue: EffectCue) -> String {
    match cue {
        EffectCue::DuckWatching { following } => format!("duck following: {following}"),
        EffectCue::MuseumVisible { visible } => format!("museum visible: {visible}"),
        EffectCue::MuseumDoorOpen { open } => format!("museum door open: {open}"),
        EffectCue::MuseumDoorSealed { sealed } => format!("museum door sealed: {sealed}"),
        EffectCue::Knocking { playing } => format!("knocking: {playing}"),
        EffectCue::PlayerScale { scale } => format!("player scale: {scale:.2}"),
    }
}

impl Presentation for Transcript {
    fn begin_level(&mut self, name: &str, stage: StageId, pose: Pose) {
        self.record(format!(
            "level {name}: stage {} at {}",
            stage.get(),
            describe_pose(pose)
        ));
    }

    fn show_objective(&mut self, text: &str) {
        self.record(format!("objective: {text}"));
    }

    fn resolve_objective(&mut self, completed: bool) {
        let outcome = if completed { "completed" } else { "failed" };
        self.record(format!("objective {outcome}"));
    }

    fn show_clock(&mut self, display: &str) {
        self.record(format!("clock: {display}"));
    }

    fn show_message(&mut self, message: &str, duration: Duration) {
        self.record(format!(
            "message ({:.1}s): {message}",
            duration.as_secs_f32()
        ));
    }

    fn hide_guide_text(&mut self) {
        self.record("guide text hidden".to_owned());
    }

    fn spawn_stage(&mut self, stage: StageId, prefab: &str, pose: Pose) {
        self.record(format!(
            "spawn {prefab} as stage {} at {}",
            stage.get(),
            describe_pose(pose)
        ));
    }

    fn spawn_end_area(&mut self, prefab: &str, pose: Pose) {
        self.record(format!("spawn {prefab} at {}", describe_pose(pose)));
    }

    fn destroy_stage(&mut self, stage: StageId) {
        self.record(format!("destroy stage {}", stage.get()));
    }

    fn move_anchor(&mut self, position: Vec3) {
        self.record(format!(
            "anchor at ({:.1}, {:.1}, {:.1})",
            position.x, position.y, position.z
        ));
    }

    fn update_door(&mut self, stage: StageId, door: DoorSide, visual: DoorVisual) {
        self.record(format!("stage {} {door:?} door {visual:?}", stage.get()));
    }

    fn update_target(&mut self, target: TargetId, visual: TargetVisual) {
        self.record(format!("target {} {visual:?}", target.get()));
    }

    fn play_cue(&mut self, cue: EffectCue) {
        self.record(format!("cue: {}", describe_cue(cue)));
    }

    fn set_player_control(&mut self, allowed: bool) {
        let state = if allowed { "enabled" } else { "disabled" };
        self.record(format!("player control {state}"));
    }

    fn play_end_sequence(&mut self, ending: EndSequence) {
        let line = match ending {
            EndSequence::Complete => "end sequence: complete".to_owned(),
            EndSequence::Fail(cause) => format!("end sequence: fail ({cause:?})"),
        };
        self.record(line);
    }
}
