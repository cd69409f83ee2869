use crate::error::Result;
use crate::genetics::{
    product_of_experts, AnimalId, Category, DistributionKind, Grade, GradeDistribution, Herd,
    RelationshipId,
};
use crate::inference::scoring::half_joint_marginal;
use crate::inference::{predict_with_context, EnsembleInference, InferenceEngine};

/// Loopy-belief-propagation strategy: one sum-product round per breeding
/// event, scoped to the triggering relationship's two parents. A parent's
/// outgoing message toward the relationship deliberately excludes the
/// relationship's own evidence, so a relationship never hears back
/// information it produced itself — the correction that matters when
/// partners are related through the wider pedigree. The rest of the graph
/// refreshes as its own relationships are next bred.
pub struct LoopyInference;

/// Message from `parent` toward `toward`: the parent's prior combined with
/// the half-joint marginal of every *other* relationship it participates in,
/// each weighted by the partner's current belief on the partner's axis and
/// projected onto `parent`'s axis.
fn outgoing_message(
    herd: &Herd,
    parent: AnimalId,
    toward: RelationshipId,
    category: Category,
) -> Result<GradeDistribution> {
    let context = format!(
        "message from animal {parent} toward relationship {toward} in {category}"
    );
    let mut message = herd
        .animal(parent)?
        .distribution(category, DistributionKind::Prior)
        .clone();

    for rel_id in herd.relationships_by_parent(parent) {
        if rel_id == toward {
            continue;
        }
        let rel = herd.relationship(rel_id)?;
        let Some(partner) = rel.other_parent(parent) else {
            continue;
        };
        let partner_belief = herd
            .animal(partner)?
            .distribution(category, DistributionKind::Inferred);
        let half = half_joint_marginal(
            rel.joint(category),
            partner_belief,
            rel.is_first_parent(partner),
            &context,
        )?;
        message = product_of_experts(&message, &half, &context)?;
    }
    Ok(message)
}

/// Cycle-corrected belief for `parent`: its own outgoing message combined
/// with the triggering relationship's half-joint marginal weighted by the
/// partner's outgoing message.
fn loopy_marginal(
    herd: &Herd,
    relationship: RelationshipId,
    parent: AnimalId,
    partner: AnimalId,
    category: Category,
) -> Result<GradeDistribution> {
    let context = format!(
        "loopy marginal for animal {parent} at relationship {relationship} in {category}"
    );
    let rel = herd.relationship(relationship)?;

    let partner_message = outgoing_message(herd, partner, relationship, category)?;
    let own_message = outgoing_message(herd, parent, relationship, category)?;

    let from_relationship = half_joint_marginal(
        rel.joint(category),
        &partner_message,
        rel.is_first_parent(partner),
        &context,
    )?;
    product_of_experts(&own_message, &from_relationship, &context)
}

impl InferenceEngine for LoopyInference {
    fn name(&self) -> &'static str {
        "loopy"
    }

    fn estimate_joint(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()> {
        // Likelihood-only joint, exactly as the ensemble strategy.
        EnsembleInference.estimate_joint(herd, relationship)
    }

    fn update_marginals(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()> {
        let rel = herd.relationship(relationship)?;
        let parent1_id = rel.parent1();
        let parent2_id = rel.parent2();

        // Messages on both sides read pre-update beliefs; nothing is written
        // until every category succeeded.
        let mut updates = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let marginal1 =
                loopy_marginal(herd, relationship, parent1_id, parent2_id, category)?;
            let marginal2 =
                loopy_marginal(herd, relationship, parent2_id, parent1_id, category)?;
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
