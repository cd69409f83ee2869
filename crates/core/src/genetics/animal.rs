use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::genetics::{
    Category, DistributionKind, Grade, GradeDistribution, PerCategory, RelationshipId,
};

/// Stable identifier of an animal within a herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimalId(pub u32);

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An animal's true genetic state for one category. The phenotype is always
/// observed; the hidden allele is simulation ground truth that drives allele
/// draws during breeding and is never read by the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genotype {
    pub phenotype: Grade,
    pub hidden_allele: Grade,
}

/// An animal in the herd: observed phenotypes per category, belief
/// distributions over the hidden allele, and an optional reference to the
/// relationship it was born from (set once at creation, never mutated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    id: AnimalId,
    name: String,
    genotypes: PerCategory<Genotype>,
    priors: PerCategory<GradeDistribution>,
    inferred: PerCategory<GradeDistribution>,
    parent_relationship: Option<RelationshipId>,
}

impl Animal {
    /// Create an animal with uniform PRIOR and INFERRED distributions in
    /// every category. Both are overwritten by inference over its lifetime,
    /// never removed.
    pub(crate) fn new(
        id: AnimalId,
        name: String,
        genotypes: PerCategory<Genotype>,
        parent_relationship: Option<RelationshipId>,
    ) -> Self {
        Animal {
            id,
            name,
            genotypes,
            priors: PerCategory::filled(GradeDistribution::uniform()),
            inferred: PerCategory::filled(GradeDistribution::uniform()),
            parent_relationship,
        }
    }

    pub fn id(&self) -> AnimalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The observed grade for `category`.
    pub fn phenotype(&self, category: Category) -> Grade {
        self.genotypes.get(category).phenotype
    }

    /// The true hidden allele for `category`. Simulation-only: breeding draws
    /// from it, inference must not.
    pub fn hidden_allele(&self, category: Category) -> Grade {
        self.genotypes.get(category).hidden_allele
    }

    /// The relationship this animal was born from, if it was bred rather than
    /// registered as a founder.
    pub fn parent_relationship(&self) -> Option<RelationshipId> {
        self.parent_relationship
    }

    /// Current belief over the hidden allele for `category`.
    pub fn distribution(&self, category: Category, kind: DistributionKind) -> &GradeDistribution {
        match kind {
            DistributionKind::Prior => self.priors.get(category),
            DistributionKind::Inferred => self.inferred.get(category),
        }
    }

    /// Overwrite a belief distribution.
    ///
    /// # Errors
    /// Returns `NotNormalized` if the distribution does not sum to 1 within
    /// tolerance; malformed input is rejected here, at the data-model
    /// boundary, not inside the algorithms.
    pub fn set_distribution(
        &mut self,
        category: Category,
        kind: DistributionKind,
        distribution: GradeDistribution,
    ) -> Result<()> {
        distribution.validate_normalized()?;
        let slot = match kind {
            DistributionKind::Prior => self.priors.get_mut(category),
            DistributionKind::Inferred => self.inferred.get_mut(category),
        };
        *slot = distribution;
        Ok(())
    }
}
