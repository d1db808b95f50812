//! Shuffled pool of anomaly definitions and the single active selection.

use loopwatch_core::{
    AnomalyDefinition, AnomalyId, AnomalyKind, ConfigError, TargetId, MAX_ANOMALIES,
};
use rand::Rng;

/// Runtime state of one anomaly definition.
#[derive(Clone, Debug, PartialEq)]
pub struct AnomalyInstance {
    id: AnomalyId,
    definition: AnomalyDefinition,
    effect_engaged: bool,
    solved: bool,
}

impl AnomalyInstance {
    /// Identifier of the anomaly.
    #[must_use]
    pub const fn id(&self) -> AnomalyId {
        self.id
    }

    /// Display name of the anomaly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Effect payload of the anomaly.
    #[must_use]
    pub fn kind(&self) -> &AnomalyKind {
        &self.definition.effect
    }

    /// Target hidden while the anomaly is unsolved.
    #[must_use]
    pub fn target(&self) -> Option<TargetId> {
        self.definition.target
    }

    /// Whether the effect is currently running.
    #[must_use]
    pub const fn is_effect_engaged(&self) -> bool {
        self.effect_engaged
    }

    /// Whether the player reported the anomaly correctly.
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        self.solved
    }
}

/// Ordered pool of anomalies handed out one at a time.
///
/// A shuffle permutes the hand-out order and rewinds the cursor. Every
/// definition is handed out at most once per shuffle; once the cursor passes
/// the end the pool reports exhaustion until it is shuffled again.
#[derive(Clone, Debug)]
pub struct AnomalyPool {
    instances: Vec<AnomalyInstance>,
    order: Vec<usize>,
    handed_out: usize,
    active: Option<usize>,
}

impl AnomalyPool {
    /// Creates a pool that hands out `definitions` in catalog order until shuffled.
    ///
    /// Fails when the catalog holds more than [`MAX_ANOMALIES`] definitions.
    pub fn new(definitions: Vec<AnomalyDefinition>) -> Result<Self, ConfigError> {
        if definitions.len() > MAX_ANOMALIES {
            return Err(ConfigError::TooManyAnomalies {
                count: definitions.len(),
            });
        }
        let instances: Vec<AnomalyInstance> = (0..)
            .zip(definitions)
            .map(|(index, definition)| AnomalyInstance {
                id: AnomalyId::new(index),
                definition,
                effect_engaged: false,
                solved: false,
            })
            .collect();
        let order = (0..instances.len()).collect();
        Ok(Self {
            instances,
            order,
            handed_out: 0,
            active: None,
        })
    }

    /// Number of definitions in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the pool holds no definitions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Permutes the hand-out order uniformly and rewinds the cursor.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let len = self.order.len();
        for index in 0..len.saturating_sub(1) {
            let swap = rng.gen_range(index..len);
            self.order.swap(index, swap);
        }
        self.handed_out = 0;
    }

    /// Hands out the next definition and marks it active.
    ///
    /// Returns `None` and clears the active selection once every definition
    /// was handed out since the last shuffle.
    pub fn generate_next(&mut self) -> Option<AnomalyId> {
        let Some(&index) = self.order.get(self.handed_out) else {
            self.active = None;
            return None;
        };
        self.handed_out += 1;
        self.active = Some(index);
        Some(self.instances[index].id)
    }

    /// Currently active anomaly, if any.
    #[must_use]
    pub fn active(&self) -> Option<&AnomalyInstance> {
        self.active.map(|index| &self.instances[index])
    }

    /// Drops the active selection without advancing the cursor.
    pub fn clear(&mut self) -> Option<AnomalyId> {
        self.active
            .take()
            .map(|index| self.instances[index].id)
    }

    /// Looks up an anomaly by identifier.
    #[must_use]
    pub fn get(&self, id: AnomalyId) -> Option<&AnomalyInstance> {
        self.instances.get(Self::index_of(id)?)
    }

    /// Identifiers in the current hand-out order.
    #[must_use]
    pub fn order(&self) -> Vec<AnomalyId> {
        self.order
            .iter()
            .map(|&index| self.instances[index].id)
            .collect()
    }

    /// Starts the effect of `id`, returning its payload when it was idle.
    pub(crate) fn engage(&mut self, id: AnomalyId) -> Option<AnomalyKind> {
        let instance = self.instances.get_mut(Self::index_of(id)?)?;
        if instance.effect_engaged {
            return None;
        }
        instance.effect_engaged = true;
        Some(instance.definition.effect.clone())
    }

    /// Stops the effect of the active anomaly, keeping its solved state.
    pub(crate) fn disengage_active(&mut self) -> Option<(AnomalyId, AnomalyKind)> {
        let instance = &mut self.instances[self.active?];
        if !instance.effect_engaged {
            return None;
        }
        instance.effect_engaged = false;
        Some((instance.id, instance.definition.effect.clone()))
    }

    /// Marks `id` as solved, stopping its effect when it still runs.
    pub(crate) fn solve(&mut self, id: AnomalyId) -> Option<SolvedAnomaly> {
        let instance = self.instances.get_mut(Self::index_of(id)?)?;
        if instance.solved {
            return None;
        }
        instance.solved = true;
        let disengaged = instance
            .effect_engaged
            .then(|| instance.definition.effect.clone());
        instance.effect_engaged = false;
        Some(SolvedAnomaly {
            disengaged,
            target: instance.definition.target,
        })
    }

    /// Returns every anomaly to its inactive, unsolved state.
    pub(crate) fn reset_all(&mut self) {
        for instance in &mut self.instances {
            instance.effect_engaged = false;
            instance.solved = false;
        }
        self.active = None;
        self.handed_out = 0;
    }

    fn index_of(id: AnomalyId) -> Option<usize> {
        usize::try_from(id.get()).ok()
    }
}

/// Side effects of solving an anomaly.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SolvedAnomaly {
    pub(crate) disengaged: Option<AnomalyKind>,
    pub(crate) target: Option<TargetId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool(count: usize) -> AnomalyPool {
        AnomalyPool::new(
            (0..count)
                .map(|index| AnomalyDefinition::new(format!("anomaly-{index}"), AnomalyKind::Duck))
                .collect(),
        )
        .expect("catalog fits")
    }

    #[test]
    fn oversized_catalog_is_refused() {
        let catalog = (0..=MAX_ANOMALIES)
            .map(|index| AnomalyDefinition::new(format!("anomaly-{index}"), AnomalyKind::Duck))
            .collect();
        assert_eq!(
            AnomalyPool::new(catalog).map(|pool| pool.len()),
            Err(ConfigError::TooManyAnomalies {
                count: MAX_ANOMALIES + 1
            })
        );
        assert_eq!(pool(MAX_ANOMALIES).order().last(), Some(&AnomalyId::new(255)));
    }

    #[test]
    fn hands_out_each_definition_once_then_exhausts() {
        let mut pool = pool(3);
        let handed: Vec<_> = (0..3).filter_map(|_| pool.generate_next()).collect();
        assert_eq!(handed.len(), 3);
        assert!(pool.generate_next().is_none());
        assert!(pool.active().is_none());
        assert!(pool.generate_next().is_none());
    }

    #[test]
    fn shuffle_rewinds_the_cursor() {
        let mut pool = pool(2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let _ = pool.generate_next();
        let _ = pool.generate_next();
        assert!(pool.generate_next().is_none());

        pool.shuffle(&mut rng);
        assert!(pool.generate_next().is_some());
    }

    #[test]
    fn clear_keeps_the_cursor() {
        let mut pool = pool(2);
        let first = pool.generate_next().expect("first anomaly");
        assert_eq!(pool.clear(), Some(first));
        assert!(pool.active().is_none());
        assert_ne!(pool.generate_next(), Some(first));
    }

    #[test]
    fn disengaging_keeps_the_selection_active() {
        let mut pool = pool(1);
        let id = pool.generate_next().expect("anomaly");
        assert_eq!(pool.engage(id), Some(AnomalyKind::Duck));
        assert_eq!(pool.engage(id), None);

        assert_eq!(pool.disengage_active(), Some((id, AnomalyKind::Duck)));
        assert_eq!(pool.disengage_active(), None);
        assert_eq!(pool.active().map(AnomalyInstance::id), Some(id));
        assert!(!pool.active().is_some_and(AnomalyInstance::is_solved));
    }

    #[test]
    fn solving_stops_a_running_effect_once() {
        let mut pool = AnomalyPool::new(vec![AnomalyDefinition::new(
            "duck",
            AnomalyKind::Duck,
        )
        .with_target(TargetId::new(4))])
        .expect("catalog fits");
        let id = pool.generate_next().expect("anomaly");
        let _ = pool.engage(id);

        assert_eq!(
            pool.solve(id),
            Some(SolvedAnomaly {
                disengaged: Some(AnomalyKind::Duck),
                target: Some(TargetId::new(4)),
            })
        );
        assert_eq!(pool.solve(id), None);
        assert!(pool.get(id).is_some_and(AnomalyInstance::is_solved));
    }

    #[test]
    fn reset_clears_every_flag() {
        let mut pool = pool(2);
        let id = pool.generate_next().expect("anomaly");
        let _ = pool.engage(id);
        let _ = pool.solve(id);

        pool.reset_all();

        assert!(pool.active().is_none());
        assert!(pool.get(id).is_some_and(|instance| !instance.is_solved()));
        assert!(pool
            .get(id)
            .is_some_and(|instance| !instance.is_effect_engaged()));
    }

    #[test]
    fn empty_pool_is_exhausted_immediately() {
        let mut pool = pool(0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        pool.shuffle(&mut rng);
        assert!(pool.is_empty());
        assert!(pool.generate_next().is_none());
    }
}
