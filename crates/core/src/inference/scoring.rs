//! Shared scoring and marginalization primitives used by every strategy.
//!
//! The probability model: a child draws one allele uniformly from the four
//! parental alleles — each parent's observed phenotype and its hypothesized
//! hidden allele. Identical alleles accumulate draw mass, so a grade carried
//! by two of the four alleles is drawn with probability 1/2.

use crate::error::{InferenceError, Result};
use crate::genetics::{
    Grade, GradeCounts, GradeDistribution, GradePair, JointDistribution,
};
use crate::types::Prob;

/// The distribution of a single offspring allele draw under the hypothesis
/// `pair`: each of the four parental alleles contributes 1/4.
pub fn allele_draw_distribution(
    pair: GradePair,
    phenotype1: Grade,
    phenotype2: Grade,
) -> GradeDistribution {
    let mut draw = GradeDistribution::zero();
    draw.add(phenotype1, 0.25);
    draw.add(pair.first, 0.25);
    draw.add(phenotype2, 0.25);
    draw.add(pair.second, 0.25);
    draw
}

/// Log of the relative multinomial likelihood that `pair` explains the
/// observed offspring counts, or `None` when the hypothesis is falsified
/// (some grade has a positive count but zero draw probability).
pub fn multinomial_log_score(
    pair: GradePair,
    phenotype1: Grade,
    phenotype2: Grade,
    counts: &GradeCounts,
) -> Option<f64> {
    let draw = allele_draw_distribution(pair, phenotype1, phenotype2);

    let mut log_score = 0.0;
    for (grade, frequency) in counts.iter() {
        if frequency == 0 {
            continue;
        }
        let probability = draw.get(grade);
        if probability == 0.0 {
            return None;
        }
        log_score += f64::from(frequency) * probability.ln();
    }
    Some(log_score)
}

/// Relative multinomial likelihood as a plain weight, 0 for a falsified
/// hypothesis. Scores are only meaningful relative to each other; estimators
/// renormalize in log space to dodge underflow.
pub fn multinomial_score(
    pair: GradePair,
    phenotype1: Grade,
    phenotype2: Grade,
    counts: &GradeCounts,
) -> Prob {
    multinomial_log_score(pair, phenotype1, phenotype2, counts)
        .map_or(0.0, f64::exp)
}

/// Normalized joint distribution over all hypotheses from the likelihood
/// alone (the ensemble/loopy estimator variant).
///
/// # Errors
/// Returns `InconsistentEvidence` if every hypothesis is falsified.
pub fn likelihood_joint(
    phenotype1: Grade,
    phenotype2: Grade,
    counts: &GradeCounts,
    context: &str,
) -> Result<JointDistribution> {
    joint_from_log_scores(phenotype1, phenotype2, counts, |_| 1.0, context)
}

/// Normalized joint distribution weighting each hypothesis' likelihood by the
/// parents' current beliefs as an independence-assuming prior over the pair
/// (the naive-Bayes estimator variant).
///
/// # Errors
/// Returns `InconsistentEvidence` if no hypothesis survives both the
/// likelihood and the belief weights.
pub fn belief_weighted_joint(
    phenotype1: Grade,
    phenotype2: Grade,
    counts: &GradeCounts,
    belief1: &GradeDistribution,
    belief2: &GradeDistribution,
    context: &str,
) -> Result<JointDistribution> {
    joint_from_log_scores(
        phenotype1,
        phenotype2,
        counts,
        |pair| belief1.get(pair.first) * belief2.get(pair.second),
        context,
    )
}

/// Shared estimator body: log scores per hypothesis, max-subtracted before
/// exponentiation so only relative magnitude survives, multiplied by the
/// caller's weight, then normalized.
fn joint_from_log_scores(
    phenotype1: Grade,
    phenotype2: Grade,
    counts: &GradeCounts,
    weight: impl Fn(GradePair) -> Prob,
    context: &str,
) -> Result<JointDistribution> {
    let mut log_scores = Vec::with_capacity(JointDistribution::LEN);
    let mut max_log = f64::NEG_INFINITY;
    for pair in GradePair::all() {
        let log_score = multinomial_log_score(pair, phenotype1, phenotype2, counts);
        if let Some(ls) = log_score {
            max_log = max_log.max(ls);
        }
        log_scores.push((pair, log_score));
    }
    if max_log == f64::NEG_INFINITY {
        return Err(InferenceError::InconsistentEvidence {
            context: context.to_string(),
        });
    }

    let mut joint = JointDistribution::zero();
    for (pair, log_score) in log_scores {
        if let Some(ls) = log_score {
            joint.set(pair, (ls - max_log).exp() * weight(pair));
        }
    }
    joint.normalize(context)?;
    Ok(joint)
}

/// Probability that an observed allele came from each parent, given the
/// hypothesized hidden pair: Bayes over the four equally likely draws, with
/// the 1/2 chance of picking each parent folded in. Returns
/// `[from_parent1, from_parent2]`, both 0 when the allele is impossible under
/// the hypothesis.
pub fn allele_origin_probabilities(
    pair: GradePair,
    phenotype1: Grade,
    phenotype2: Grade,
    allele: Grade,
) -> [Prob; 2] {
    let mut total = 0.0;

    let mut given_parent1 = 0.0;
    if phenotype1 == allele {
        given_parent1 += 0.5;
        total += 0.25;
    }
    if pair.first == allele {
        given_parent1 += 0.5;
        total += 0.25;
    }

    let mut given_parent2 = 0.0;
    if phenotype2 == allele {
        given_parent2 += 0.5;
        total += 0.25;
    }
    if pair.second == allele {
        given_parent2 += 0.5;
        total += 0.25;
    }

    if total == 0.0 {
        return [0.0, 0.0];
    }
    [0.5 * given_parent1 / total, 0.5 * given_parent2 / total]
}

/// Distribution of the child's hidden allele under one hypothesis, given its
/// observed phenotype. The hidden allele is whichever allele the
/// non-contributing parent passed; since that parent's choice between its two
/// alleles stays uncertain, half of its contribution probability lands on
/// each. Sums to 1 when the phenotype is possible under the hypothesis, to 0
/// otherwise; callers combine across hypotheses and renormalize.
pub fn conditional_distribution(
    pair: GradePair,
    phenotype1: Grade,
    phenotype2: Grade,
    child_phenotype: Grade,
) -> GradeDistribution {
    let [from_parent1, from_parent2] =
        allele_origin_probabilities(pair, phenotype1, phenotype2, child_phenotype);

    let mut hidden = GradeDistribution::zero();
    hidden.add(phenotype1, 0.5 * from_parent2);
    hidden.add(pair.first, 0.5 * from_parent2);
    hidden.add(phenotype2, 0.5 * from_parent1);
    hidden.add(pair.second, 0.5 * from_parent1);
    hidden
}

/// Marginalize a joint distribution onto one parent's axis, weighting each
/// pair by `weights` evaluated on the *other* axis. With `weight_on_first`
/// the weights apply to the first-parent allele and the result ranges over
/// the second-parent allele, and vice versa. Shared by both marginal
/// updaters, with different weight sources.
///
/// # Errors
/// Returns `InconsistentEvidence` if the weighted mass vanishes entirely.
pub fn half_joint_marginal(
    joint: &JointDistribution,
    weights: &GradeDistribution,
    weight_on_first: bool,
    context: &str,
) -> Result<GradeDistribution> {
    let mut marginal = GradeDistribution::zero();
    for (pair, probability) in joint.iter() {
        let (weighted, target) = if weight_on_first {
            (pair.first, pair.second)
        } else {
            (pair.second, pair.first)
        };
        marginal.add(target, probability * weights.get(weighted));
    }
    marginal.normalize(context)?;
    Ok(marginal)
}
