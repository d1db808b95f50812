#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Loopwatch.
//!
//! The world owns the level session, the stage chain, the anomaly pool, the
//! target registry and the objective ledger. It is mutated exclusively through
//! [`apply`] and read through the functions in [`query`].

mod anomalies;
mod objectives;
mod session;
mod stages;
mod targets;

use std::time::Duration;

use loopwatch_core::{
    AnomalyId, Command, ConfigError, DoorRejection, DoorSide, Event, FailureCause, Interactable,
    LevelConfig, Pose, StageId, TargetId, TargetRejection, TriggerError, TriggerKind,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub use anomalies::{AnomalyInstance, AnomalyPool};
pub use objectives::Objective;
pub use session::ReportButton;
pub use stages::{Door, Stage};
pub use targets::Target;

use objectives::ObjectiveLedger;
use session::LevelSession;
use stages::{DestroyRefusal, StageChain};
use targets::TargetRegistry;

/// Represents the authoritative Loopwatch world state.
#[derive(Debug)]
pub struct World {
    config: LevelConfig,
    session: LevelSession,
    chain: StageChain,
    pool: AnomalyPool,
    targets: TargetRegistry,
    objectives: ObjectiveLedger,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates a world for the provided level after validating its configuration.
    pub fn new(config: LevelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut pool = AnomalyPool::new(config.anomalies.clone())?;
        pool.shuffle(&mut rng);
        debug!(order = ?pool.order(), "anomaly pool shuffled");

        Ok(Self {
            session: LevelSession::new(config.time_limit()),
            chain: StageChain::new(config.stage_span()),
            pool,
            targets: TargetRegistry::default(),
            objectives: ObjectiveLedger::default(),
            rng,
            config,
        })
    }

    fn start_level(&mut self, out_events: &mut Vec<Event>) {
        if !self.session.start() {
            warn!("level already started");
            return;
        }
        let pose = Pose::default();
        let stage = self.chain.spawn_first(pose);
        info!(level = %self.config.name, stage = stage.get(), "level started");
        out_events.push(Event::LevelStarted {
            name: self.config.name.clone(),
            stage,
            pose,
        });
        out_events.push(Event::ClockChanged {
            hour: self.session.hour(),
        });
        out_events.push(Event::PlayerControlChanged { allowed: true });

        let specs = self.config.targets.clone();
        for spec in specs {
            if self.targets.register(spec.id, None, spec.initially_active) {
                out_events.push(Event::TargetRegistered { target: spec.id });
            }
        }
        self.refresh_objectives(out_events);
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });
        let advance = self.session.advance(dt);
        if let Some(hour) = advance.hour_changed {
            debug!(%hour, "clock advanced");
            out_events.push(Event::ClockChanged { hour });
        }
        if advance.expired {
            self.fail(FailureCause::TimerExpired, out_events);
        }
    }

    fn enter_trigger(&mut self, stage: StageId, trigger: TriggerKind, out_events: &mut Vec<Event>) {
        let outcome = if self.session.has_ended() {
            Err(TriggerError::LevelEnded)
        } else {
            match trigger {
                TriggerKind::Transition => self
                    .chain
                    .fire_transition(stage)
                    .map(|()| Event::TransitionTriggered { stage }),
                TriggerKind::Offload => self
                    .chain
                    .fire_offload(stage)
                    .map(|predecessor| Event::OffloadTriggered { stage, predecessor }),
            }
        };

        match outcome {
            Ok(event) => {
                debug!(stage = stage.get(), ?trigger, "trigger fired");
                out_events.push(event);
            }
            Err(reason) => {
                warn!(stage = stage.get(), ?trigger, ?reason, "trigger rejected");
                out_events.push(Event::TriggerRejected {
                    stage,
                    trigger,
                    reason,
                });
            }
        }
    }

    fn spawn_stage(&mut self, after: StageId, out_events: &mut Vec<Event>) {
        match self.chain.spawn_after(after) {
            Ok(spawned) => {
                debug!(stage = spawned.stage.get(), after = after.get(), "stage spawned");
                out_events.push(Event::StageSpawned {
                    stage: spawned.stage,
                    predecessor: after,
                    pose: spawned.pose,
                    prefab: self.config.stage_prefab.clone(),
                });
                out_events.push(Event::PersistentAnchorMoved {
                    position: spawned.anchor,
                });
            }
            Err(reason) => warn!(after = after.get(), ?reason, "stage spawn refused"),
        }
    }

    fn spawn_end_area(&mut self, after: StageId, out_events: &mut Vec<Event>) {
        match self.chain.spawn_end_area(after) {
            Ok(pose) => {
                info!(after = after.get(), "end area spawned");
                out_events.push(Event::EndAreaSpawned {
                    after,
                    pose,
                    prefab: self.config.end_area_prefab.clone(),
                });
            }
            Err(reason) => warn!(after = after.get(), ?reason, "end area spawn refused"),
        }
    }

    fn enter_end_area(&mut self, out_events: &mut Vec<Event>) {
        let reason = if self.session.has_ended() {
            TriggerError::LevelEnded
        } else if self.chain.end_area().is_none() {
            TriggerError::EndAreaMissing
        } else {
            self.complete(out_events);
            return;
        };
        warn!(?reason, "end area entry rejected");
        out_events.push(Event::EndAreaRejected { reason });
    }

    fn interact_door(&mut self, stage: StageId, door: DoorSide, out_events: &mut Vec<Event>) {
        let outcome = if self.session.player_control() {
            match self.chain.door_mut(stage, door) {
                Some(handle) => handle.interact(Duration::ZERO),
                None => Err(DoorRejection::UnknownStage),
            }
        } else {
            Err(DoorRejection::ControlDisabled)
        };

        match outcome {
            Ok(true) => out_events.push(Event::DoorOpened { stage, door }),
            Ok(false) => out_events.push(Event::DoorShut { stage, door }),
            Err(reason) => {
                debug!(stage = stage.get(), ?door, ?reason, "door interaction rejected");
                out_events.push(Event::DoorInteractionRejected {
                    stage,
                    door,
                    reason,
                });
            }
        }
    }

    fn generate_anomaly(&mut self, stage: StageId, out_events: &mut Vec<Event>) {
        if self.chain.get(stage).is_none() {
            warn!(stage = stage.get(), "anomaly requested for unknown stage");
            return;
        }

        let Some(anomaly) = self.pool.generate_next() else {
            let _ = self.chain.set_anomaly(stage, None);
            warn!(stage = stage.get(), "anomaly pool exhausted");
            out_events.push(Event::AnomalyPoolExhausted);
            return;
        };

        let _ = self.chain.set_anomaly(stage, Some(anomaly));
        let (name, target) = match self.pool.get(anomaly) {
            Some(instance) => (instance.name().to_owned(), instance.target()),
            None => return,
        };
        info!(anomaly = %name, stage = stage.get(), "anomaly activated");
        out_events.push(Event::AnomalyActivated {
            anomaly,
            name,
            stage,
        });
        if let Some(kind) = self.pool.engage(anomaly) {
            out_events.push(Event::AnomalyEffectEngaged { anomaly, kind });
        }
        if let Some(target) = target {
            self.set_target_visibility(target, false, out_events);
        }
    }

    fn solve_anomaly(&mut self, anomaly: AnomalyId, out_events: &mut Vec<Event>) {
        let Some(solved) = self.pool.solve(anomaly) else {
            debug!(anomaly = anomaly.get(), "anomaly already solved or unknown");
            return;
        };
        if let Some(kind) = solved.disengaged {
            out_events.push(Event::AnomalyEffectDisengaged {
                anomaly,
                kind,
                forced: false,
            });
        }
        out_events.push(Event::AnomalySolved { anomaly });
        if let Some(target) = solved.target {
            self.set_target_visibility(target, true, out_events);
        }
    }

    fn deactivate_anomaly_effect(&mut self, forced: bool, out_events: &mut Vec<Event>) {
        if let Some((anomaly, kind)) = self.pool.disengage_active() {
            out_events.push(Event::AnomalyEffectDisengaged {
                anomaly,
                kind,
                forced,
            });
        }
    }

    fn reset_level_progress(&mut self, out_events: &mut Vec<Event>) {
        if self.session.has_ended() {
            debug!("progress reset ignored after the level ended");
            return;
        }
        self.deactivate_anomaly_effect(true, out_events);

        for restore in self.targets.reset_all() {
            out_events.push(Event::TargetReset {
                target: restore.target,
            });
            if let Some(visible) = restore.visibility {
                out_events.push(Event::TargetVisibilityChanged {
                    target: restore.target,
                    visible,
                });
            }
        }

        self.pool.reset_all();
        self.pool.shuffle(&mut self.rng);
        info!(order = ?self.pool.order(), "level progress reset");
        out_events.push(Event::LevelProgressReset);
        self.refresh_objectives(out_events);
    }

    fn destroy_stage(&mut self, stage: StageId, out_events: &mut Vec<Event>) {
        match self.chain.destroy(stage) {
            Ok(_) => {
                let unregistered = self.targets.unregister_owned_by(stage);
                for target in &unregistered {
                    out_events.push(Event::TargetUnregistered { target: *target });
                }
                debug!(stage = stage.get(), "stage destroyed");
                out_events.push(Event::StageDestroyed { stage });
                if !unregistered.is_empty() {
                    self.refresh_objectives(out_events);
                }
            }
            Err(DestroyRefusal::UnknownStage) => {
                warn!(stage = stage.get(), "destroy requested for unknown stage");
            }
            Err(DestroyRefusal::NotValidated) => {
                warn!(stage = stage.get(), "stage destroyed before its validation");
            }
        }
    }

    fn register_target(
        &mut self,
        target: TargetId,
        owner: Option<StageId>,
        initially_active: bool,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(stage) = owner {
            if self.chain.get(stage).is_none() {
                warn!(target = target.get(), stage = stage.get(), "target owner is gone");
                return;
            }
        }
        if !self.targets.register(target, owner, initially_active) {
            debug!(target = target.get(), "target already registered");
            return;
        }
        out_events.push(Event::TargetRegistered { target });
        self.refresh_objectives(out_events);
    }

    fn interact_target(&mut self, target: TargetId, held: Duration, out_events: &mut Vec<Event>) {
        let outcome = if self.session.player_control() {
            match self.targets.get_mut(target) {
                Some(handle) => handle.interact(held),
                None => Err(TargetRejection::Unknown),
            }
        } else {
            Err(TargetRejection::ControlDisabled)
        };

        match outcome {
            Ok(()) => {
                debug!(target = target.get(), "target completed");
                out_events.push(Event::TargetCompleted { target });
                self.refresh_objectives(out_events);
            }
            Err(reason) => {
                debug!(target = target.get(), ?reason, "target interaction rejected");
                out_events.push(Event::TargetInteractionRejected { target, reason });
            }
        }
    }

    fn set_target_visibility(&mut self, target: TargetId, visible: bool, out_events: &mut Vec<Event>) {
        if self.targets.set_visible(target, visible) {
            out_events.push(Event::TargetVisibilityChanged { target, visible });
        }
    }

    /// Republishes objective progress and latches completion once every target is done.
    fn refresh_objectives(&mut self, out_events: &mut Vec<Event>) {
        let (completed, total) = self.targets.progress();
        if let Some((objective, text)) = self.objectives.record_progress(completed, total) {
            out_events.push(Event::ObjectiveUpdated { objective, text });
        }
        if self.targets.all_completed() {
            if self.session.mark_objectives_met() {
                info!(completed, total, "objectives met");
                out_events.push(Event::ObjectivesMet);
            }
        } else if self.session.clear_objectives_met() {
            debug!(completed, total, "objectives no longer met");
        }
    }

    fn complete(&mut self, out_events: &mut Vec<Event>) {
        if !self.session.finish() {
            debug!("completion ignored after the level ended");
            return;
        }
        info!(level = %self.config.name, "level completed");
        if let Some(objective) = self.objectives.complete_surfaced() {
            out_events.push(Event::ObjectiveCompleted { objective });
        }
        out_events.push(Event::PlayerControlChanged { allowed: false });
        out_events.push(Event::LevelCompleted);
    }

    fn fail(&mut self, cause: FailureCause, out_events: &mut Vec<Event>) {
        if !self.session.fail() {
            debug!(?cause, "failure ignored after the level was decided");
            return;
        }
        info!(level = %self.config.name, ?cause, "level failed");
        if let Some(objective) = self.objectives.fail_surfaced() {
            out_events.push(Event::ObjectiveFailed { objective });
        }
        out_events.push(Event::PlayerControlChanged { allowed: false });
        out_events.push(Event::LevelFailed { cause });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartLevel => world.start_level(out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::EnterTrigger { stage, trigger } => world.enter_trigger(stage, trigger, out_events),
        Command::SpawnStage { after } => world.spawn_stage(after, out_events),
        Command::SpawnEndArea { after } => world.spawn_end_area(after, out_events),
        Command::EnterEndArea => world.enter_end_area(out_events),
        Command::CloseDoor { stage, door } => {
            if world.chain.close_door(stage, door) == Some(true) {
                out_events.push(Event::DoorLocked { stage, door });
            }
        }
        Command::InteractDoor { stage, door } => world.interact_door(stage, door, out_events),
        Command::PressReportButton => {
            if !world.session.player_control() {
                debug!("report button ignored without player control");
            } else if world.session.press_button() {
                info!("anomaly reported");
                out_events.push(Event::ReportButtonPressed);
            }
        }
        Command::ResetReportButton => {
            if world.session.reset_button() {
                out_events.push(Event::ReportButtonReset);
            }
        }
        Command::SolveAnomaly { anomaly } => world.solve_anomaly(anomaly, out_events),
        Command::DeactivateAnomalyEffect => world.deactivate_anomaly_effect(false, out_events),
        Command::GenerateAnomaly { stage } => world.generate_anomaly(stage, out_events),
        Command::ClearAnomaly { stage } => {
            let _ = world.chain.set_anomaly(stage, None);
            if let Some(anomaly) = world.pool.clear() {
                out_events.push(Event::AnomalyCleared { anomaly });
            }
        }
        Command::ResetLevelProgress => world.reset_level_progress(out_events),
        Command::DestroyStage { stage } => world.destroy_stage(stage, out_events),
        Command::RegisterTarget {
            target,
            owner,
            initially_active,
        } => world.register_target(target, owner, initially_active, out_events),
        Command::InteractTarget { target, held } => world.interact_target(target, held, out_events),
        Command::CreateObjective { description } => {
            let objective = world.objectives.create(description.clone());
            out_events.push(Event::ObjectiveCreated {
                objective,
                description,
            });
            world.refresh_objectives(out_events);
        }
        Command::NotifyPlayer { message, duration } => {
            out_events.push(Event::PlayerMessage { message, duration });
        }
        Command::HideGuideText => {
            if world.session.hide_guide_text() {
                out_events.push(Event::GuideTextHidden);
            }
        }
        Command::PlayCue { cue } => out_events.push(Event::CueTriggered { cue }),
        Command::EnemyContact => world.fail(FailureCause::CaughtByEnemy, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec3;
    use loopwatch_core::{
        AnomalyId, ChainSnapshot, ClockHour, LevelConfig, Pose, StageId, TargetId,
    };

    use super::{AnomalyInstance, Objective, ReportButton, Stage, Target, World};

    /// Configuration the level was created with.
    #[must_use]
    pub fn config(world: &World) -> &LevelConfig {
        &world.config
    }

    /// Whether the level was started.
    #[must_use]
    pub fn is_started(world: &World) -> bool {
        world.session.is_started()
    }

    /// Simulated time accumulated by the countdown.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.session.elapsed()
    }

    /// Time limit of the countdown.
    #[must_use]
    pub fn time_limit(world: &World) -> Duration {
        world.session.limit()
    }

    /// Hour currently shown on the level clock.
    #[must_use]
    pub fn clock(world: &World) -> ClockHour {
        world.session.hour()
    }

    /// Whether every registered target was completed and the next transition leads out.
    ///
    /// Latched until a progress reset leaves a target incomplete again.
    #[must_use]
    pub fn objectives_met(world: &World) -> bool {
        world.session.objectives_met()
    }

    /// Whether the player escaped through the end area.
    #[must_use]
    pub fn is_complete(world: &World) -> bool {
        world.session.is_completed()
    }

    /// Whether the level failed.
    #[must_use]
    pub fn is_failed(world: &World) -> bool {
        world.session.is_failed()
    }

    /// Whether an end sequence was signalled.
    #[must_use]
    pub fn has_ended(world: &World) -> bool {
        world.session.has_ended()
    }

    /// Whether the player may currently act.
    #[must_use]
    pub fn player_control(world: &World) -> bool {
        world.session.player_control()
    }

    /// Whether the introductory guide text is still shown.
    #[must_use]
    pub fn guide_text_visible(world: &World) -> bool {
        world.session.guide_text_visible()
    }

    /// Report button shared by every stage.
    #[must_use]
    pub fn report_button(world: &World) -> &ReportButton {
        world.session.button()
    }

    /// Recomputes the win condition from the target registry.
    ///
    /// True iff at least one target is registered and every target is completed.
    #[must_use]
    pub fn check_completion(world: &World) -> bool {
        world.targets.all_completed()
    }

    /// Captures the stage chain and the flags consulted by the sequencer.
    #[must_use]
    pub fn chain_snapshot(world: &World) -> ChainSnapshot {
        ChainSnapshot::new(
            world.chain.iter().map(Stage::snapshot).collect(),
            world.chain.current(),
            world.session.button().is_pressed(),
            world.session.objectives_met(),
            world.pool.active().map(AnomalyInstance::id),
        )
    }

    /// Looks up a live stage.
    #[must_use]
    pub fn stage(world: &World, id: StageId) -> Option<&Stage> {
        world.chain.get(id)
    }

    /// Iterator over the live stages ordered by identifier.
    pub fn stages(world: &World) -> impl Iterator<Item = &Stage> {
        world.chain.iter()
    }

    /// Number of stage instances alive.
    #[must_use]
    pub fn live_stage_count(world: &World) -> usize {
        world.chain.len()
    }

    /// Stage the player currently occupies.
    #[must_use]
    pub fn current_stage(world: &World) -> Option<StageId> {
        world.chain.current()
    }

    /// Position of the persistent-objects anchor.
    #[must_use]
    pub fn persistent_anchor(world: &World) -> Vec3 {
        world.chain.anchor()
    }

    /// Pose of the end area once spawned.
    #[must_use]
    pub fn end_area(world: &World) -> Option<Pose> {
        world.chain.end_area()
    }

    /// Anomaly currently selected from the pool.
    #[must_use]
    pub fn active_anomaly(world: &World) -> Option<&AnomalyInstance> {
        world.pool.active()
    }

    /// Looks up an anomaly by identifier.
    #[must_use]
    pub fn anomaly(world: &World, id: AnomalyId) -> Option<&AnomalyInstance> {
        world.pool.get(id)
    }

    /// Anomaly identifiers in their current hand-out order.
    #[must_use]
    pub fn anomaly_order(world: &World) -> Vec<AnomalyId> {
        world.pool.order()
    }

    /// Looks up a registered target.
    #[must_use]
    pub fn target(world: &World, id: TargetId) -> Option<&Target> {
        world.targets.get(id)
    }

    /// Iterator over registered targets ordered by identity.
    pub fn targets(world: &World) -> impl Iterator<Item = &Target> {
        world.targets.iter()
    }

    /// Completed and total target counts.
    #[must_use]
    pub fn objective_progress(world: &World) -> (usize, usize) {
        world.targets.progress()
    }

    /// Oldest objective that is still active.
    #[must_use]
    pub fn surfaced_objective(world: &World) -> Option<&Objective> {
        world.objectives.surfaced()
    }

    /// Every objective ever created, including finished ones.
    #[must_use]
    pub fn objectives(world: &World) -> &[Objective] {
        world.objectives.objectives()
    }
}
