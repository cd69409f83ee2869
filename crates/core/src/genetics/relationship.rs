use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};
use crate::genetics::{
    AnimalId, Category, Grade, GradeCounts, JointDistribution, PerCategory,
};

/// Stable identifier of a breeding relationship within a herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub u32);

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An unordered breeding pair with its accumulated offspring evidence.
///
/// The pair is canonicalized to ascending animal id so at most one
/// relationship exists per unordered pair; the parents are distinct and
/// immutable for the life of the relationship. Per category it holds the
/// offspring phenotype counts (monotone non-decreasing) and a joint
/// distribution over hidden-allele pairs, fully recomputed from the counts on
/// every breeding event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    id: RelationshipId,
    parent1: AnimalId,
    parent2: AnimalId,
    offspring_counts: PerCategory<GradeCounts>,
    joints: PerCategory<JointDistribution>,
}

impl Relationship {
    /// Create a relationship between two distinct animals. The lower id
    /// becomes parent 1. The joint starts uniform so the normalization
    /// invariant holds before the first estimate.
    ///
    /// # Errors
    /// Returns `SelfBreeding` if both ids are the same animal.
    pub(crate) fn new(id: RelationshipId, a: AnimalId, b: AnimalId) -> Result<Self> {
        if a == b {
            return Err(InferenceError::SelfBreeding);
        }
        let (parent1, parent2) = if a < b { (a, b) } else { (b, a) };
        Ok(Relationship {
            id,
            parent1,
            parent2,
            offspring_counts: PerCategory::filled(GradeCounts::new()),
            joints: PerCategory::filled(JointDistribution::uniform()),
        })
    }

    pub fn id(&self) -> RelationshipId {
        self.id
    }

    pub fn parent1(&self) -> AnimalId {
        self.parent1
    }

    pub fn parent2(&self) -> AnimalId {
        self.parent2
    }

    /// Whether `animal` is one of the two parents.
    pub fn involves(&self, animal: AnimalId) -> bool {
        self.parent1 == animal || self.parent2 == animal
    }

    /// Whether `animal` sits on the first-parent axis of the joint.
    pub fn is_first_parent(&self, animal: AnimalId) -> bool {
        self.parent1 == animal
    }

    /// The partner of `animal` in this relationship, or `None` if `animal`
    /// is not a parent here.
    pub fn other_parent(&self, animal: AnimalId) -> Option<AnimalId> {
        if self.parent1 == animal {
            Some(self.parent2)
        } else if self.parent2 == animal {
            Some(self.parent1)
        } else {
            None
        }
    }

    pub fn offspring_counts(&self, category: Category) -> &GradeCounts {
        self.offspring_counts.get(category)
    }

    /// Record one offspring born with `phenotype` in `category`.
    pub fn record_offspring(&mut self, category: Category, phenotype: Grade) {
        self.offspring_counts.get_mut(category).record(phenotype);
    }

    pub fn joint(&self, category: Category) -> &JointDistribution {
        self.joints.get(category)
    }

    /// Replace the joint distribution for `category`.
    ///
    /// # Errors
    /// Returns `NotNormalized` if the joint does not sum to 1 within
    /// tolerance.
    pub fn set_joint(&mut self, category: Category, joint: JointDistribution) -> Result<()> {
        joint.validate_normalized()?;
        *self.joints.get_mut(category) = joint;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_canonicalizes_parent_order() {
        let rel = Relationship::new(RelationshipId(1), AnimalId(7), AnimalId(3)).unwrap();
        assert_eq!(rel.parent1(), AnimalId(3));
        assert_eq!(rel.parent2(), AnimalId(7));
        assert!(rel.is_first_parent(AnimalId(3)));
        assert!(!rel.is_first_parent(AnimalId(7)));
    }

    #[test]
    fn test_new_rejects_self_breeding() {
        assert!(Relationship::new(RelationshipId(1), AnimalId(4), AnimalId(4)).is_err());
    }

    #[test]
    fn test_other_parent() {
        let rel = Relationship::new(RelationshipId(1), AnimalId(1), AnimalId(2)).unwrap();
        assert_eq!(rel.other_parent(AnimalId(1)), Some(AnimalId(2)));
        assert_eq!(rel.other_parent(AnimalId(2)), Some(AnimalId(1)));
        assert_eq!(rel.other_parent(AnimalId(9)), None);
    }

    #[test]
    fn test_counts_accumulate_per_category() {
        let mut rel = Relationship::new(RelationshipId(1), AnimalId(1), AnimalId(2)).unwrap();
        rel.record_offspring(Category::Swim, Grade::C);
        rel.record_offspring(Category::Swim, Grade::C);
        rel.record_offspring(Category::Fly, Grade::A);
        assert_eq!(rel.offspring_counts(Category::Swim).get(Grade::C), 2);
        assert_eq!(rel.offspring_counts(Category::Fly).get(Grade::A), 1);
        assert_eq!(rel.offspring_counts(Category::Run).total(), 0);
    }

    #[test]
    fn test_joint_starts_uniform_and_replaces() {
        let mut rel = Relationship::new(RelationshipId(1), AnimalId(1), AnimalId(2)).unwrap();
        rel.joint(Category::Swim).validate_normalized().unwrap();

        let mut joint = JointDistribution::zero();
        joint.set(crate::genetics::GradePair::new(Grade::B, Grade::C), 1.0);
        rel.set_joint(Category::Swim, joint.clone()).unwrap();
        assert_eq!(rel.joint(Category::Swim), &joint);

        assert!(rel
            .set_joint(Category::Fly, JointDistribution::zero())
            .is_err());
    }
}
