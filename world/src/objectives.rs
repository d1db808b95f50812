//! Ledger of narrative objectives.

use loopwatch_core::ObjectiveId;

/// Objective shown to the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Objective {
    id: ObjectiveId,
    description: String,
    progress: Option<(usize, usize)>,
    active: bool,
    completed: bool,
    failed: bool,
}

impl Objective {
    fn new(id: ObjectiveId, description: String) -> Self {
        Self {
            id,
            description,
            progress: None,
            active: true,
            completed: false,
            failed: false,
        }
    }

    /// Identifier of the objective.
    #[must_use]
    pub const fn id(&self) -> ObjectiveId {
        self.id
    }

    /// Description the objective was created with.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Completed and total counters last recorded for the objective.
    #[must_use]
    pub const fn progress(&self) -> Option<(usize, usize)> {
        self.progress
    }

    /// Text shown to the player, including the progress counter when known.
    #[must_use]
    pub fn text(&self) -> String {
        match self.progress {
            Some((completed, total)) => format!("{} ({completed}/{total})", self.description),
            None => self.description.clone(),
        }
    }

    /// Whether the objective still awaits an outcome.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the objective was completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Whether the objective failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failed
    }
}

#[derive(Debug, Default)]
pub(crate) struct ObjectiveLedger {
    objectives: Vec<Objective>,
    next_id: u32,
}

impl ObjectiveLedger {
    pub(crate) fn create(&mut self, description: String) -> ObjectiveId {
        let id = ObjectiveId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.objectives.push(Objective::new(id, description));
        id
    }

    pub(crate) fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Oldest objective that is still active.
    pub(crate) fn surfaced(&self) -> Option<&Objective> {
        self.objectives.iter().find(|objective| objective.active)
    }

    fn surfaced_mut(&mut self) -> Option<&mut Objective> {
        self.objectives.iter_mut().find(|objective| objective.active)
    }

    /// Records new counters on the surfaced objective, returning its text when it changed.
    pub(crate) fn record_progress(
        &mut self,
        completed: usize,
        total: usize,
    ) -> Option<(ObjectiveId, String)> {
        let objective = self.surfaced_mut()?;
        if objective.progress == Some((completed, total)) {
            return None;
        }
        objective.progress = Some((completed, total));
        Some((objective.id, objective.text()))
    }

    pub(crate) fn complete_surfaced(&mut self) -> Option<ObjectiveId> {
        let objective = self.surfaced_mut()?;
        objective.active = false;
        objective.completed = true;
        Some(objective.id)
    }

    pub(crate) fn fail_surfaced(&mut self) -> Option<ObjectiveId> {
        let objective = self.surfaced_mut()?;
        objective.active = false;
        objective.failed = true;
        Some(objective.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_oldest_active_objective_is_surfaced() {
        let mut ledger = ObjectiveLedger::default();
        let first = ledger.create("Report anomalies.".to_owned());
        let second = ledger.create("Find the exit.".to_owned());

        assert_eq!(ledger.surfaced().map(Objective::id), Some(first));
        assert_eq!(ledger.complete_surfaced(), Some(first));
        assert_eq!(ledger.surfaced().map(Objective::id), Some(second));
        assert_eq!(ledger.objectives().len(), 2);
    }

    #[test]
    fn progress_text_is_only_reported_on_change() {
        let mut ledger = ObjectiveLedger::default();
        let id = ledger.create("Report anomalies.".to_owned());

        assert_eq!(
            ledger.record_progress(2, 3),
            Some((id, "Report anomalies. (2/3)".to_owned()))
        );
        assert_eq!(ledger.record_progress(2, 3), None);
    }

    #[test]
    fn failed_objectives_leave_the_surface() {
        let mut ledger = ObjectiveLedger::default();
        let id = ledger.create("Report anomalies.".to_owned());

        assert_eq!(ledger.fail_surfaced(), Some(id));
        assert!(ledger.surfaced().is_none());
        assert!(ledger.objectives()[0].is_failed());
        assert_eq!(ledger.record_progress(1, 1), None);
    }
}
