use crate::error::Result;
use crate::genetics::{
    product_of_experts, AnimalId, Category, DistributionKind, Grade, GradeDistribution, Herd,
    RelationshipId,
};
use crate::inference::scoring::likelihood_joint;
use crate::inference::{predict_with_context, InferenceEngine};

/// Ensemble strategy: the joint is estimated from the likelihood alone (so
/// re-estimation stays idempotent), and a parent's belief is the product of
/// one partial marginal per relationship it participates in, with its prior
/// folded in last. Each relationship's evidence is treated as conditionally
/// independent given the parent's hidden allele; the shared-allele cycle
/// effect is what the loopy strategy corrects.
pub struct EnsembleInference;

/// Marginalize one relationship's joint onto `parent`'s axis, weighting each
/// hypothesis by both parents' current beliefs.
fn partial_marginal(
    herd: &Herd,
    relationship: RelationshipId,
    parent: AnimalId,
    category: Category,
) -> Result<GradeDistribution> {
    let rel = herd.relationship(relationship)?;
    let belief1 = herd
        .animal(rel.parent1())?
        .distribution(category, DistributionKind::Inferred);
    let belief2 = herd
        .animal(rel.parent2())?
        .distribution(category, DistributionKind::Inferred);
    let onto_first = rel.is_first_parent(parent);

    let mut marginal = GradeDistribution::zero();
    for (pair, probability) in rel.joint(category).iter() {
        let weighted = probability * belief1.get(pair.first) * belief2.get(pair.second);
        marginal.add(if onto_first { pair.first } else { pair.second }, weighted);
    }
    marginal.normalize(&format!(
        "partial marginal of relationship {relationship} for animal {parent} in {category}"
    ))?;
    Ok(marginal)
}

/// Combine the partial marginals from every relationship `parent`
/// participates in, then the parent's prior.
fn ensemble_marginal(herd: &Herd, parent: AnimalId, category: Category) -> Result<GradeDistribution> {
    let context = format!("ensemble marginal for animal {parent} in {category}");

    let mut combined: Option<GradeDistribution> = None;
    for relationship in herd.relationships_by_parent(parent) {
        let partial = partial_marginal(herd, relationship, parent, category)?;
        combined = Some(match combined {
            None => partial,
            Some(existing) => product_of_experts(&existing, &partial, &context)?,
        });
    }
    let combined = combined.unwrap_or_else(GradeDistribution::uniform);

    let prior = herd.animal(parent)?.distribution(category, DistributionKind::Prior);
    product_of_experts(&combined, prior, &context)
}

impl InferenceEngine for EnsembleInference {
    fn name(&self) -> &'static str {
        "ensemble"
    }

    fn estimate_joint(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()> {
        let rel = herd.relationship(relationship)?;
        let parent1 = herd.animal(rel.parent1())?;
        let parent2 = herd.animal(rel.parent2())?;

        let mut joints = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let joint = likelihood_joint(
                parent1.phenotype(category),
                parent2.phenotype(category),
                rel.offspring_counts(category),
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

        // Both parents' new beliefs come from pre-update state; writes happen
        // only after every category succeeded.
        let mut updates = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let marginal1 = ensemble_marginal(herd, parent1_id, category)?;
            let marginal2 = ensemble_marginal(herd, parent2_id, category)?;
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
    use crate::genetics::{Genotype, PerCategory};
    use approx::assert_relative_eq;

    fn founder(herd: &mut Herd, name: &str, phenotype: Grade) -> AnimalId {
        herd.register_founder(
            name,
            PerCategory::filled(Genotype {
                phenotype,
                hidden_allele: phenotype,
            }),
        )
    }

    #[test]
    fn test_estimate_joint_is_idempotent() {
        let mut herd = Herd::new();
        let a = founder(&mut herd, "a", Grade::B);
        let b = founder(&mut herd, "b", Grade::B);
        let rel_id = herd.find_or_create_relationship(a, b).unwrap();
        let rel = herd.relationship_mut(rel_id).unwrap();
        for _ in 0..5 {
            rel.record_offspring(Category::Swim, Grade::B);
        }
        rel.record_offspring(Category::Swim, Grade::C);

        EnsembleInference.estimate_joint(&mut herd, rel_id).unwrap();
        let first = herd.relationship(rel_id).unwrap().joint(Category::Swim).clone();

        EnsembleInference.estimate_joint(&mut herd, rel_id).unwrap();
        let second = herd.relationship(rel_id).unwrap().joint(Category::Swim).clone();

        assert_eq!(first, second);
    }

    #[test]
    fn test_update_marginals_single_offspring() {
        // Parents A and B with one C offspring: the known 7/12 split.
        let mut herd = Herd::new();
        let a = founder(&mut herd, "a", Grade::A);
        let b = founder(&mut herd, "b", Grade::B);
        let rel_id = herd.find_or_create_relationship(a, b).unwrap();
        herd.relationship_mut(rel_id)
            .unwrap()
            .record_offspring(Category::Fly, Grade::C);

        EnsembleInference.estimate_joint(&mut herd, rel_id).unwrap();
        EnsembleInference
            .update_marginals(&mut herd, rel_id)
            .unwrap();

        for id in [a, b] {
            let inferred = herd
                .animal(id)
                .unwrap()
                .distribution(Category::Fly, DistributionKind::Inferred);
            assert_relative_eq!(inferred.get(Grade::C), 7.0 / 12.0, epsilon = 1e-9);
            for grade in Grade::ALL {
                if grade != Grade::C {
                    assert_relative_eq!(inferred.get(grade), 1.0 / 12.0, epsilon = 1e-9);
                }
            }
        }
    }
}
