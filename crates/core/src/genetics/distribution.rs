use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};
use crate::genetics::{Grade, GradePair};
use crate::types::{Prob, NORMALIZATION_TOLERANCE};

/// A total distribution of weight over the grade space.
///
/// The representation is a dense array indexed by grade, so every grade always
/// has a defined weight (zero allowed). A distribution is *normalized* when
/// its weights sum to 1 within [`NORMALIZATION_TOLERANCE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDistribution {
    weights: [Prob; Grade::COUNT],
}

impl GradeDistribution {
    /// The all-zero distribution, used as an accumulator.
    pub fn zero() -> Self {
        GradeDistribution {
            weights: [0.0; Grade::COUNT],
        }
    }

    /// The uniform distribution (1/G per grade).
    pub fn uniform() -> Self {
        GradeDistribution {
            weights: [1.0 / Grade::COUNT as Prob; Grade::COUNT],
        }
    }

    /// Build a distribution from explicit per-grade weights, in grade order.
    pub fn from_weights(weights: [Prob; Grade::COUNT]) -> Self {
        GradeDistribution { weights }
    }

    pub fn get(&self, grade: Grade) -> Prob {
        self.weights[grade.index()]
    }

    pub fn set(&mut self, grade: Grade, weight: Prob) {
        self.weights[grade.index()] = weight;
    }

    /// Add `weight` onto `grade`.
    pub fn add(&mut self, grade: Grade, weight: Prob) {
        self.weights[grade.index()] += weight;
    }

    pub fn sum(&self) -> Prob {
        self.weights.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, Prob)> + '_ {
        Grade::ALL.iter().copied().zip(self.weights.iter().copied())
    }

    /// Rescale the weights to sum to 1.
    ///
    /// # Errors
    /// Returns `InconsistentEvidence` if the weights sum to 0; the
    /// distribution is left untouched in that case.
    pub fn normalize(&mut self, context: &str) -> Result<()> {
        let sum = self.sum();
        if sum == 0.0 {
            return Err(InferenceError::InconsistentEvidence {
                context: context.to_string(),
            });
        }
        for w in &mut self.weights {
            *w /= sum;
        }
        Ok(())
    }

    /// Check that the distribution is normalized.
    ///
    /// # Errors
    /// Returns `NotNormalized` if the weights do not sum to 1 within
    /// [`NORMALIZATION_TOLERANCE`].
    pub fn validate_normalized(&self) -> Result<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(InferenceError::NotNormalized {
                sum,
                tolerance: NORMALIZATION_TOLERANCE,
            });
        }
        Ok(())
    }

    /// Grade with the largest weight (ties resolve to the better grade).
    pub fn mode(&self) -> Grade {
        let mut best = Grade::S;
        for (grade, weight) in self.iter() {
            if weight > self.get(best) {
                best = grade;
            }
        }
        best
    }
}

/// Combine two independent beliefs about the same hidden grade: elementwise
/// product, renormalized. This is the sole evidence-merging primitive in the
/// engine. Commutative and associative modulo normalization order.
///
/// # Errors
/// Returns `InconsistentEvidence` if the product sums to 0 (mutually
/// exclusive beliefs).
pub fn product_of_experts(
    a: &GradeDistribution,
    b: &GradeDistribution,
    context: &str,
) -> Result<GradeDistribution> {
    let mut combined = GradeDistribution::zero();
    for grade in Grade::ALL {
        combined.set(grade, a.get(grade) * b.get(grade));
    }
    combined.normalize(context)?;
    Ok(combined)
}

/// A total distribution of weight over all ordered hidden-allele pairs for a
/// breeding relationship. Dense `G x G`, row = parent-1 allele, column =
/// parent-2 allele.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDistribution {
    weights: [[Prob; Grade::COUNT]; Grade::COUNT],
}

impl JointDistribution {
    /// Number of hypotheses the joint is defined over.
    pub const LEN: usize = Grade::COUNT * Grade::COUNT;

    pub fn zero() -> Self {
        JointDistribution {
            weights: [[0.0; Grade::COUNT]; Grade::COUNT],
        }
    }

    /// Uniform weight (1/G^2) on every pair.
    pub fn uniform() -> Self {
        JointDistribution {
            weights: [[1.0 / Self::LEN as Prob; Grade::COUNT]; Grade::COUNT],
        }
    }

    pub fn get(&self, pair: GradePair) -> Prob {
        self.weights[pair.first.index()][pair.second.index()]
    }

    pub fn set(&mut self, pair: GradePair, weight: Prob) {
        self.weights[pair.first.index()][pair.second.index()] = weight;
    }

    pub fn sum(&self) -> Prob {
        self.weights.iter().flatten().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GradePair, Prob)> + '_ {
        GradePair::all().map(move |pair| (pair, self.get(pair)))
    }

    /// Rescale the weights to sum to 1.
    ///
    /// # Errors
    /// Returns `InconsistentEvidence` if every weight is 0.
    pub fn normalize(&mut self, context: &str) -> Result<()> {
        let sum = self.sum();
        if sum == 0.0 {
            return Err(InferenceError::InconsistentEvidence {
                context: context.to_string(),
            });
        }
        for row in &mut self.weights {
            for w in row {
                *w /= sum;
            }
        }
        Ok(())
    }

    /// Check that the joint is normalized over all `G^2` pairs.
    ///
    /// # Errors
    /// Returns `NotNormalized` if the weights do not sum to 1 within
    /// [`NORMALIZATION_TOLERANCE`].
    pub fn validate_normalized(&self) -> Result<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(InferenceError::NotNormalized {
                sum,
                tolerance: NORMALIZATION_TOLERANCE,
            });
        }
        Ok(())
    }
}

/// Offspring phenotype counts for one category of a relationship.
/// Counts only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCounts {
    counts: [u32; Grade::COUNT],
}

impl GradeCounts {
    pub fn new() -> Self {
        GradeCounts::default()
    }

    pub fn get(&self, grade: Grade) -> u32 {
        self.counts[grade.index()]
    }

    /// Record one more offspring observed with `grade`.
    pub fn record(&mut self, grade: Grade) {
        self.counts[grade.index()] += 1;
    }

    /// Total offspring observed.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, u32)> + '_ {
        Grade::ALL.iter().copied().zip(self.counts.iter().copied())
    }
}
