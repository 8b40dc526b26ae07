//! Boolean expressions over conditions.

use spawn_world::WorldQuery;

use super::SpawningCondition;
use crate::position::SpawnablePosition;

/// A condition tree. Leaves are ordinary conditions; a leaf whose kind does
/// not accept the position evaluates to `false`.
#[derive(Clone, Debug, PartialEq)]
pub enum CompositeCondition {
    All(Vec<CompositeCondition>),
    Any(Vec<CompositeCondition>),
    Not(Box<CompositeCondition>),
    Condition(Box<SpawningCondition>),
}

impl CompositeCondition {
    pub fn is_satisfied_by(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        match self {
            CompositeCondition::All(children) => {
                children.iter().all(|c| c.is_satisfied_by(position, world))
            }
            CompositeCondition::Any(children) => {
                children.iter().any(|c| c.is_satisfied_by(position, world))
            }
            CompositeCondition::Not(child) => !child.is_satisfied_by(position, world),
            CompositeCondition::Condition(condition) => condition.is_satisfied_by(position, world),
        }
    }

    /// Visits every leaf condition mutably.
    pub fn for_each_condition_mut(&mut self, f: &mut impl FnMut(&mut SpawningCondition)) {
        match self {
            CompositeCondition::All(children) | CompositeCondition::Any(children) => {
                for child in children {
                    child.for_each_condition_mut(f);
                }
            }
            CompositeCondition::Not(child) => child.for_each_condition_mut(f),
            CompositeCondition::Condition(condition) => f(condition),
        }
    }
}
