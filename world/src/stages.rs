//! Arena of live stage instances forming the room chain.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec3;
use loopwatch_core::{
    AnomalyId, DoorRejection, DoorSide, Interactable, Pose, StageId, StagePhase, StageSnapshot,
    TriggerError,
};

/// Door guarding one side of a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Door {
    locked: bool,
    open: bool,
}

impl Door {
    /// Whether the sequencer locked the door.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the door currently stands open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Closes and locks the door, reporting whether anything changed.
    fn close_and_lock(&mut self) -> bool {
        let changed = self.open || !self.locked;
        self.open = false;
        self.locked = true;
        changed
    }
}

impl Interactable for Door {
    /// Whether the door is open after the interaction.
    type Outcome = Result<bool, DoorRejection>;

    fn is_interactable(&self) -> bool {
        !self.locked
    }

    fn interact(&mut self, _held: Duration) -> Self::Outcome {
        if self.locked {
            return Err(DoorRejection::Locked);
        }
        self.open = !self.open;
        Ok(self.open)
    }
}

/// One instantiated room of the loop.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    id: StageId,
    predecessor: Option<StageId>,
    phase: StagePhase,
    anomaly: Option<AnomalyId>,
    pose: Pose,
    entry: Door,
    exit: Door,
    transition_fired: bool,
    offload_fired: bool,
}

impl Stage {
    fn new(id: StageId, predecessor: Option<StageId>, pose: Pose) -> Self {
        Self {
            id,
            predecessor,
            phase: StagePhase::Spawned,
            anomaly: None,
            pose,
            entry: Door::default(),
            exit: Door::default(),
            transition_fired: false,
            offload_fired: false,
        }
    }

    /// Identifier of the stage.
    #[must_use]
    pub const fn id(&self) -> StageId {
        self.id
    }

    /// Stage this one was spawned behind; the first stage has none.
    #[must_use]
    pub const fn predecessor(&self) -> Option<StageId> {
        self.predecessor
    }

    /// Lifecycle phase of the stage.
    #[must_use]
    pub const fn phase(&self) -> StagePhase {
        self.phase
    }

    /// Anomaly generated for the stage when the player entered it.
    #[must_use]
    pub const fn anomaly(&self) -> Option<AnomalyId> {
        self.anomaly
    }

    /// Pose the stage was spawned at.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    /// Door on the requested side of the stage.
    #[must_use]
    pub const fn door(&self, side: DoorSide) -> &Door {
        match side {
            DoorSide::Entry => &self.entry,
            DoorSide::Exit => &self.exit,
        }
    }

    fn door_mut(&mut self, side: DoorSide) -> &mut Door {
        match side {
            DoorSide::Entry => &mut self.entry,
            DoorSide::Exit => &mut self.exit,
        }
    }

    pub(crate) fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            id: self.id,
            predecessor: self.predecessor,
            phase: self.phase,
            anomaly: self.anomaly,
            pose: self.pose,
        }
    }
}

/// Placement of a freshly spawned stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpawnedStage {
    pub(crate) stage: StageId,
    pub(crate) pose: Pose,
    pub(crate) anchor: Vec3,
}

/// Why a stage could not be torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DestroyRefusal {
    UnknownStage,
    NotValidated,
}

#[derive(Debug)]
pub(crate) struct StageChain {
    stages: BTreeMap<StageId, Stage>,
    next_id: u32,
    current: Option<StageId>,
    end_area: Option<Pose>,
    anchor: Vec3,
    span: Vec3,
}

impl StageChain {
    pub(crate) fn new(span: Vec3) -> Self {
        Self {
            stages: BTreeMap::new(),
            next_id: 0,
            current: None,
            end_area: None,
            anchor: Vec3::ZERO,
            span,
        }
    }

    fn allocate(&mut self, predecessor: Option<StageId>, pose: Pose) -> StageId {
        let id = StageId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let _ = self.stages.insert(id, Stage::new(id, predecessor, pose));
        id
    }

    /// Spawns the stage the level starts in and makes it current.
    pub(crate) fn spawn_first(&mut self, pose: Pose) -> StageId {
        let id = self.allocate(None, pose);
        self.current = Some(id);
        self.anchor = pose.position();
        id
    }

    /// Spawns a successor behind `after` and drags the persistent anchor along.
    pub(crate) fn spawn_after(&mut self, after: StageId) -> Result<SpawnedStage, TriggerError> {
        let base = self.stages.get(&after).ok_or(TriggerError::UnknownStage)?.pose;
        if self.successor_of(after).is_some() {
            return Err(TriggerError::AlreadyFired);
        }
        let pose = base.translated(self.span);
        let stage = self.allocate(Some(after), pose);
        self.anchor += self.span;
        Ok(SpawnedStage {
            stage,
            pose,
            anchor: self.anchor,
        })
    }

    /// Places the terminal end area behind `after`.
    pub(crate) fn spawn_end_area(&mut self, after: StageId) -> Result<Pose, TriggerError> {
        let base = self.stages.get(&after).ok_or(TriggerError::UnknownStage)?.pose;
        if self.end_area.is_some() {
            return Err(TriggerError::AlreadyFired);
        }
        let pose = base.translated(self.span);
        self.end_area = Some(pose);
        Ok(pose)
    }

    /// Arms the transition trigger of the current stage.
    pub(crate) fn fire_transition(&mut self, id: StageId) -> Result<(), TriggerError> {
        let current = self.current;
        let stage = self.stages.get_mut(&id).ok_or(TriggerError::UnknownStage)?;
        if stage.transition_fired {
            return Err(TriggerError::AlreadyFired);
        }
        if current != Some(id) {
            return Err(TriggerError::OutOfOrder);
        }
        stage.transition_fired = true;
        stage.phase = StagePhase::TransitionArmed;
        Ok(())
    }

    /// Fires the offload trigger of `id`, making it current.
    ///
    /// Returns the predecessor left behind when it is still alive.
    pub(crate) fn fire_offload(&mut self, id: StageId) -> Result<Option<StageId>, TriggerError> {
        let current = self.current;
        let stage = self.stages.get(&id).ok_or(TriggerError::UnknownStage)?;
        if stage.offload_fired {
            return Err(TriggerError::AlreadyFired);
        }
        let reachable = match stage.predecessor {
            Some(predecessor) => current == Some(predecessor),
            None => current == Some(id),
        };
        if !reachable {
            return Err(TriggerError::OutOfOrder);
        }
        let predecessor = stage
            .predecessor
            .filter(|predecessor| self.stages.contains_key(predecessor));

        let stage = self.stages.get_mut(&id).ok_or(TriggerError::UnknownStage)?;
        stage.offload_fired = true;
        if stage.phase == StagePhase::Spawned {
            stage.phase = StagePhase::Offloaded;
        }
        self.current = Some(id);
        Ok(predecessor)
    }

    /// Closes and locks a door, reporting whether anything changed.
    pub(crate) fn close_door(&mut self, id: StageId, side: DoorSide) -> Option<bool> {
        self.stages
            .get_mut(&id)
            .map(|stage| stage.door_mut(side).close_and_lock())
    }

    pub(crate) fn door_mut(&mut self, id: StageId, side: DoorSide) -> Option<&mut Door> {
        self.stages.get_mut(&id).map(|stage| stage.door_mut(side))
    }

    /// Records which anomaly, if any, the stage was generated with.
    pub(crate) fn set_anomaly(&mut self, id: StageId, anomaly: Option<AnomalyId>) -> bool {
        match self.stages.get_mut(&id) {
            Some(stage) => {
                stage.anomaly = anomaly;
                true
            }
            None => false,
        }
    }

    /// Removes a stage whose successor already validated it.
    pub(crate) fn destroy(&mut self, id: StageId) -> Result<Stage, DestroyRefusal> {
        if !self.stages.contains_key(&id) {
            return Err(DestroyRefusal::UnknownStage);
        }
        let validated = self
            .successor_of(id)
            .is_some_and(|successor| successor.offload_fired);
        if !validated {
            return Err(DestroyRefusal::NotValidated);
        }
        self.stages.remove(&id).ok_or(DestroyRefusal::UnknownStage)
    }

    fn successor_of(&self, id: StageId) -> Option<&Stage> {
        self.stages
            .values()
            .find(|stage| stage.predecessor == Some(id))
    }

    pub(crate) fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.stages.len()
    }

    pub(crate) const fn current(&self) -> Option<StageId> {
        self.current
    }

    pub(crate) const fn end_area(&self) -> Option<Pose> {
        self.end_area
    }

    pub(crate) const fn anchor(&self) -> Vec3 {
        self.anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAN: Vec3 = Vec3::new(0.0, 1.0, 24.0);

    fn chain_with_first() -> (StageChain, StageId) {
        let mut chain = StageChain::new(SPAN);
        let first = chain.spawn_first(Pose::default());
        (chain, first)
    }

    #[test]
    fn successors_are_offset_by_the_span() {
        let (mut chain, first) = chain_with_first();
        let spawned = chain.spawn_after(first).expect("spawn");

        assert_eq!(spawned.pose.position(), SPAN);
        assert_eq!(spawned.anchor, SPAN);
        assert_eq!(
            chain.get(spawned.stage).and_then(Stage::predecessor),
            Some(first)
        );
        assert_eq!(chain.spawn_after(first), Err(TriggerError::AlreadyFired));
    }

    #[test]
    fn transition_fires_once_and_only_from_the_current_stage() {
        let (mut chain, first) = chain_with_first();
        let second = chain.spawn_after(first).expect("spawn").stage;

        assert_eq!(chain.fire_transition(second), Err(TriggerError::OutOfOrder));
        assert_eq!(chain.fire_transition(first), Ok(()));
        assert_eq!(
            chain.get(first).map(Stage::phase),
            Some(StagePhase::TransitionArmed)
        );
        assert_eq!(chain.fire_transition(first), Err(TriggerError::AlreadyFired));
        assert_eq!(
            chain.fire_transition(StageId::new(42)),
            Err(TriggerError::UnknownStage)
        );
    }

    #[test]
    fn offload_moves_the_player_forward() {
        let (mut chain, first) = chain_with_first();
        assert_eq!(chain.fire_offload(first), Ok(None));
        assert_eq!(chain.fire_transition(first), Ok(()));
        let second = chain.spawn_after(first).expect("spawn").stage;

        assert_eq!(chain.fire_offload(second), Ok(Some(first)));
        assert_eq!(chain.current(), Some(second));
        assert_eq!(
            chain.get(second).map(Stage::phase),
            Some(StagePhase::Offloaded)
        );
        assert_eq!(chain.fire_offload(second), Err(TriggerError::AlreadyFired));
    }

    #[test]
    fn stages_survive_until_their_successor_validated_them() {
        let (mut chain, first) = chain_with_first();
        let second = chain.spawn_after(first).expect("spawn").stage;

        assert_eq!(chain.destroy(first), Err(DestroyRefusal::NotValidated));
        let _ = chain.fire_offload(second).expect("offload");
        assert_eq!(chain.destroy(first).map(|stage| stage.id()), Ok(first));
        assert_eq!(chain.destroy(first), Err(DestroyRefusal::UnknownStage));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn closing_locks_the_door_against_interaction() {
        let (mut chain, first) = chain_with_first();
        let door = chain.door_mut(first, DoorSide::Exit).expect("door");
        assert_eq!(door.interact(Duration::ZERO), Ok(true));

        assert_eq!(chain.close_door(first, DoorSide::Exit), Some(true));
        assert_eq!(chain.close_door(first, DoorSide::Exit), Some(false));

        let door = chain.door_mut(first, DoorSide::Exit).expect("door");
        assert!(!door.is_open());
        assert!(!door.is_interactable());
        assert_eq!(door.interact(Duration::ZERO), Err(DoorRejection::Locked));
    }

    #[test]
    fn end_area_is_placed_once() {
        let (mut chain, first) = chain_with_first();
        assert_eq!(chain.spawn_end_area(first).map(|pose| pose.position()), Ok(SPAN));
        assert_eq!(chain.spawn_end_area(first), Err(TriggerError::AlreadyFired));
        assert!(chain.end_area().is_some());
    }
}
