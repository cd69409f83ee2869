// Inference module
// Strategy trait, shared child predictor, and the three engine variants

pub mod ensemble;
pub mod loopy;
pub mod naive;
pub mod scoring;

pub use ensemble::EnsembleInference;
pub use loopy::LoopyInference;
pub use naive::NaiveInference;

use crate::error::{InferenceError, Result};
use crate::genetics::{
    Category, DistributionKind, Grade, GradeDistribution, Herd, RelationshipId,
};
use crate::inference::scoring::conditional_distribution;

/// A hidden-allele inference strategy over the breeding history.
///
/// One breeding event drives the three operations in order:
/// `estimate_joint` refreshes the relationship's joint distribution from the
/// accumulated offspring counts, `update_marginals` refreshes the parents'
/// beliefs, and `predict_child` produces the newborn's hidden-grade
/// distribution. Every operation either fully applies its writes or fails
/// without writing anything.
pub trait InferenceEngine {
    /// Strategy name as used for selection ("naive", "ensemble", "loopy").
    fn name(&self) -> &'static str;

    /// Recompute the relationship's joint distribution for every category
    /// from its offspring phenotype counts. Idempotent for unchanged counts.
    ///
    /// # Errors
    /// `InconsistentEvidence` when no hypothesis explains the counts in some
    /// category; lookup errors for stale ids.
    fn estimate_joint(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()>;

    /// Write new INFERRED distributions for both parents of the triggering
    /// relationship, every category. Both parents' new beliefs are computed
    /// from pre-update state before either is written.
    ///
    /// # Errors
    /// `InconsistentEvidence` when combining beliefs leaves zero mass;
    /// lookup errors for stale ids.
    fn update_marginals(&self, herd: &mut Herd, relationship: RelationshipId) -> Result<()>;

    /// Distribution over a newborn's hidden grade given its observed
    /// phenotype. The breeding operation stores the result as the child's
    /// PRIOR.
    ///
    /// # Errors
    /// `InconsistentEvidence` when no hypothesis is compatible with the
    /// parents' current beliefs; lookup errors for stale ids.
    fn predict_child(
        &self,
        herd: &Herd,
        relationship: RelationshipId,
        category: Category,
        child_phenotype: Grade,
    ) -> Result<GradeDistribution>;
}

/// Select a strategy by name.
///
/// # Errors
/// Returns `UnknownStrategy` for anything but "naive", "ensemble", "loopy".
pub fn engine_for(name: &str) -> Result<Box<dyn InferenceEngine>> {
    match name {
        "naive" => Ok(Box::new(NaiveInference)),
        "ensemble" => Ok(Box::new(EnsembleInference)),
        "loopy" => Ok(Box::new(LoopyInference)),
        other => Err(InferenceError::UnknownStrategy(other.to_string())),
    }
}

/// Shared child predictor: per hypothesis, the conditional hidden-grade
/// distribution given the observed phenotype, mixed by the context-adjusted
/// hypothesis weight (joint weight times both parents' current INFERRED
/// belief at the pair, renormalized).
pub(crate) fn predict_with_context(
    herd: &Herd,
    relationship: RelationshipId,
    category: Category,
    child_phenotype: Grade,
) -> Result<GradeDistribution> {
    let rel = herd.relationship(relationship)?;
    let parent1 = herd.animal(rel.parent1())?;
    let parent2 = herd.animal(rel.parent2())?;
    let phenotype1 = parent1.phenotype(category);
    let phenotype2 = parent2.phenotype(category);
    let belief1 = parent1.distribution(category, DistributionKind::Inferred);
    let belief2 = parent2.distribution(category, DistributionKind::Inferred);
    let joint = rel.joint(category);

    let context = format!(
        "child prediction for relationship {relationship} in {category}"
    );

    let mut total_context_weight = 0.0;
    let mut child = GradeDistribution::zero();
    for (pair, joint_weight) in joint.iter() {
        let context_weight =
            joint_weight * belief1.get(pair.first) * belief2.get(pair.second);
        if context_weight == 0.0 {
            continue;
        }
        total_context_weight += context_weight;

        let conditional =
            conditional_distribution(pair, phenotype1, phenotype2, child_phenotype);
        for (grade, mass) in conditional.iter() {
            child.add(grade, context_weight * mass);
        }
    }
    if total_context_weight == 0.0 {
        return Err(InferenceError::InconsistentEvidence { context });
    }

    child.normalize(&context)?;
    Ok(child)
}
