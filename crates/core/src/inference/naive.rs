use crate::error::Result;
use crate::genetics::{
    Category, DistributionKind, Grade, GradeDistribution, Herd, RelationshipId,
};
use crate::inference::scoring::belief_weighted_joint;
use crate::inference::{predict_with_context, InferenceEngine};

/// Naive-Bayes strategy: the estimator folds the parents' current beliefs
/// into every hypothesis weight, and the marginal update is a direct
/// marginalization of that joint onto each parent's axis. The cheapest and
/// least cycle-aware of the three.
pub struct NaiveInference;

impl InferenceEngine for NaiveInference {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn estimate_joint(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()> {
        let rel = herd.relationship(relationship)?;
        let parent1 = herd.animal(rel.parent1())?;
        let parent2 = herd.animal(rel.parent2())?;

        let mut joints = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let joint = belief_weighted_joint(
                parent1.phenotype(category),
                parent2.phenotype(category),
                rel.offspring_counts(category),
                parent1.distribution(category, DistributionKind::Inferred),
                parent2.distribution(category, DistributionKind::Inferred),
                &format!("joint estimation for relationship {relationship} in {category}"),
            )?;
            joints.push((category, joint));
        }

        let rel = herd.relationship_mut(relationship)?;
        for (category, joint) in joints {
            rel.set_joint(category, joint)?;
        }
        Ok(())
    }

    fn update_marginals(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()> {
        let rel = herd.relationship(relationship)?;
        let parent1_id = rel.parent1();
        let parent2_id = rel.parent2();

        let mut updates = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let mut marginal1 = GradeDistribution::zero();
            let mut marginal2 = GradeDistribution::zero();
            for (pair, probability) in rel.joint(category).iter() {
                marginal1.add(pair.first, probability);
                marginal2.add(pair.second, probability);
            }
            updates.push((category, marginal1, marginal2));
        }

        for (category, marginal1, marginal2) in updates {
            herd.animal_mut(parent1_id)?.set_distribution(
                category,
                DistributionKind::Inferred,
                marginal1,
            )?;
            herd.animal_mut(parent2_id)?.set_distribution(
                category,
                DistributionKind::Inferred,
                marginal2,
            )?;
        }
        Ok(())
    }

    fn predict_child(
        &self,
        herd: &Herd,
        relationship: RelationshipId,
        category: Category,
        child_phenotype: Grade,
    ) -> Result<GradeDistribution> {
        predict_with_context(herd, relationship, category, child_phenotype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{Genotype, GradePair, PerCategory};
    use approx::assert_relative_eq;

    fn two_founder_herd(phenotype1: Grade, phenotype2: Grade) -> (Herd, RelationshipId) {
        let mut herd = Herd::new();
        let a = herd.register_founder(
            "p1",
            PerCategory::filled(Genotype {
                phenotype: phenotype1,
                hidden_allele: phenotype1,
            }),
        );
        let b = herd.register_founder(
            "p2",
            PerCategory::filled(Genotype {
                phenotype: phenotype2,
                hidden_allele: phenotype2,
            }),
        );
        let rel = herd.find_or_create_relationship(a, b).unwrap();
        (herd, rel)
    }

    #[test]
    fn test_estimate_joint_folds_in_beliefs() {
        let (mut herd, rel_id) = two_founder_herd(Grade::A, Grade::B);
        herd.relationship_mut(rel_id)
            .unwrap()
            .record_offspring(Category::Swim, Grade::C);

        // Concentrate parent 1's belief on C: hypotheses with a first allele
        // other than C must vanish.
        let mut belief = GradeDistribution::zero();
        belief.set(Grade::C, 1.0);
        let parent1 = herd.relationship(rel_id).unwrap().parent1();
        herd.animal_mut(parent1)
            .unwrap()
            .set_distribution(Category::Swim, DistributionKind::Inferred, belief)
            .unwrap();

        NaiveInference.estimate_joint(&mut herd, rel_id).unwrap();

        let joint = herd.relationship(rel_id).unwrap().joint(Category::Swim);
        assert_relative_eq!(joint.sum(), 1.0, epsilon = 1e-9);
        assert_eq!(joint.get(GradePair::new(Grade::D, Grade::C)), 0.0);
        assert!(joint.get(GradePair::new(Grade::C, Grade::S)) > 0.0);
    }

    #[test]
    fn test_update_marginals_is_direct_marginalization() {
        let (mut herd, rel_id) = two_founder_herd(Grade::A, Grade::B);
        herd.relationship_mut(rel_id)
            .unwrap()
            .record_offspring(Category::Swim, Grade::C);

        NaiveInference.estimate_joint(&mut herd, rel_id).unwrap();
        NaiveInference.update_marginals(&mut herd, rel_id).unwrap();

        let rel = herd.relationship(rel_id).unwrap();
        let joint = rel.joint(Category::Swim);
        let mut expected = GradeDistribution::zero();
        for (pair, probability) in joint.iter() {
            expected.add(pair.first, probability);
        }

        let parent1 = herd.animal(rel.parent1()).unwrap();
        let inferred = parent1.distribution(Category::Swim, DistributionKind::Inferred);
        for grade in Grade::ALL {
            assert_relative_eq!(inferred.get(grade), expected.get(grade), epsilon = 1e-12);
        }
    }
}
