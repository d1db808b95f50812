//! Registry of the targets the player must resolve to finish the level.

use std::{collections::BTreeMap, time::Duration};

use loopwatch_core::{Interactable, StageId, TargetId, TargetRejection, TARGET_HOLD};

/// Interactable objective object placed in the level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    id: TargetId,
    owner: Option<StageId>,
    initially_active: bool,
    visible: bool,
    completed: bool,
}

impl Target {
    fn new(id: TargetId, owner: Option<StageId>, initially_active: bool) -> Self {
        Self {
            id,
            owner,
            initially_active,
            visible: initially_active,
            completed: false,
        }
    }

    /// Identity of the target.
    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    /// Stage the target belongs to; persistent targets have none.
    #[must_use]
    pub const fn owner(&self) -> Option<StageId> {
        self.owner
    }

    /// Whether the target is visible at level start and after resets.
    #[must_use]
    pub const fn is_initially_active(&self) -> bool {
        self.initially_active
    }

    /// Whether the target is currently shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the player completed the target.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Interactable for Target {
    type Outcome = Result<(), TargetRejection>;

    fn is_interactable(&self) -> bool {
        self.visible && !self.completed
    }

    fn interact(&mut self, held: Duration) -> Self::Outcome {
        if !self.visible {
            return Err(TargetRejection::Hidden);
        }
        if self.completed {
            return Err(TargetRejection::AlreadyCompleted);
        }
        if held < TARGET_HOLD {
            return Err(TargetRejection::HoldTooShort);
        }
        self.completed = true;
        Ok(())
    }
}

/// Changes applied to a single target by a level-wide reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TargetRestore {
    pub(crate) target: TargetId,
    pub(crate) visibility: Option<bool>,
}

#[derive(Debug, Default)]
pub(crate) struct TargetRegistry {
    targets: BTreeMap<TargetId, Target>,
}

impl TargetRegistry {
    /// Adds a target unless one with the same identity exists.
    pub(crate) fn register(
        &mut self,
        id: TargetId,
        owner: Option<StageId>,
        initially_active: bool,
    ) -> bool {
        if self.targets.contains_key(&id) {
            return false;
        }
        let _ = self
            .targets
            .insert(id, Target::new(id, owner, initially_active));
        true
    }

    pub(crate) fn unregister_owned_by(&mut self, stage: StageId) -> Vec<TargetId> {
        let owned: Vec<TargetId> = self
            .targets
            .values()
            .filter(|target| target.owner == Some(stage))
            .map(|target| target.id)
            .collect();
        for id in &owned {
            let _ = self.targets.remove(id);
        }
        owned
    }

    pub(crate) fn get(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.targets.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Shows or hides a target, reporting whether anything changed.
    pub(crate) fn set_visible(&mut self, id: TargetId, visible: bool) -> bool {
        match self.targets.get_mut(&id) {
            Some(target) if target.visible != visible => {
                target.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reset_all(&mut self) -> Vec<TargetRestore> {
        self.targets
            .values_mut()
            .map(|target| {
                target.completed = false;
                let visibility = (target.visible != target.initially_active).then(|| {
                    target.visible = target.initially_active;
                    target.visible
                });
                TargetRestore {
                    target: target.id,
                    visibility,
                }
            })
            .collect()
    }

    /// Completed and total target counts.
    pub(crate) fn progress(&self) -> (usize, usize) {
        let completed = self
            .targets
            .values()
            .filter(|target| target.completed)
            .count();
        (completed, self.targets.len())
    }

    /// True iff at least one target exists and every target is completed.
    pub(crate) fn all_completed(&self) -> bool {
        !self.targets.is_empty() && self.targets.values().all(|target| target.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[u32]) -> TargetRegistry {
        let mut registry = TargetRegistry::default();
        for id in ids {
            assert!(registry.register(TargetId::new(*id), None, true));
        }
        registry
    }

    #[test]
    fn empty_registry_is_never_complete() {
        assert!(!TargetRegistry::default().all_completed());
    }

    #[test]
    fn registration_is_deduplicated_by_identity() {
        let mut registry = registry_with(&[1]);
        assert!(!registry.register(TargetId::new(1), Some(StageId::new(4)), false));
        assert_eq!(registry.progress(), (0, 1));
        assert_eq!(registry.get(TargetId::new(1)).and_then(Target::owner), None);
    }

    #[test]
    fn short_holds_do_not_complete_targets() {
        let mut registry = registry_with(&[1]);
        let target = registry.get_mut(TargetId::new(1)).expect("registered");

        assert_eq!(
            target.interact(Duration::from_secs(1)),
            Err(TargetRejection::HoldTooShort)
        );
        assert_eq!(target.interact(TARGET_HOLD), Ok(()));
        assert_eq!(
            target.interact(TARGET_HOLD),
            Err(TargetRejection::AlreadyCompleted)
        );
        assert!(!target.is_interactable());
    }

    #[test]
    fn hidden_targets_refuse_interaction() {
        let mut registry = registry_with(&[1]);
        assert!(registry.set_visible(TargetId::new(1), false));
        assert!(!registry.set_visible(TargetId::new(1), false));

        let target = registry.get_mut(TargetId::new(1)).expect("registered");
        assert_eq!(target.interact(TARGET_HOLD), Err(TargetRejection::Hidden));
    }

    #[test]
    fn completion_requires_every_target() {
        let mut registry = registry_with(&[1, 2, 3]);
        for id in [1, 2] {
            let target = registry.get_mut(TargetId::new(id)).expect("registered");
            assert_eq!(target.interact(TARGET_HOLD), Ok(()));
        }
        assert_eq!(registry.progress(), (2, 3));
        assert!(!registry.all_completed());

        let target = registry.get_mut(TargetId::new(3)).expect("registered");
        assert_eq!(target.interact(TARGET_HOLD), Ok(()));
        assert!(registry.all_completed());
    }

    #[test]
    fn reset_restores_initial_activity() {
        let mut registry = TargetRegistry::default();
        assert!(registry.register(TargetId::new(1), None, true));
        assert!(registry.register(TargetId::new(2), None, false));
        assert!(registry.set_visible(TargetId::new(1), false));
        assert!(registry.set_visible(TargetId::new(2), true));
        let target = registry.get_mut(TargetId::new(2)).expect("registered");
        assert_eq!(target.interact(TARGET_HOLD), Ok(()));

        let restored = registry.reset_all();

        assert_eq!(
            restored,
            vec![
                TargetRestore {
                    target: TargetId::new(1),
                    visibility: Some(true),
                },
                TargetRestore {
                    target: TargetId::new(2),
                    visibility: Some(false),
                },
            ]
        );
        assert_eq!(registry.progress(), (0, 2));
    }

    #[test]
    fn unregistering_a_stage_removes_only_its_targets() {
        let mut registry = registry_with(&[1]);
        assert!(registry.register(TargetId::new(7), Some(StageId::new(2)), true));

        assert_eq!(
            registry.unregister_owned_by(StageId::new(2)),
            vec![TargetId::new(7)]
        );
        assert_eq!(registry.progress(), (0, 1));
    }
}
