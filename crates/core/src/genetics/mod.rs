// Genetics module
// Grade space, distributions, animals, relationships, and the herd catalog

pub mod animal;
pub mod distribution;
pub mod grade;
pub mod herd;
pub mod relationship;

pub use animal::{Animal, AnimalId, Genotype};
pub use distribution::{product_of_experts, GradeCounts, GradeDistribution, JointDistribution};
pub use grade::{Category, DistributionKind, Grade, GradePair, PerCategory};
pub use herd::Herd;
pub use relationship::{Relationship, RelationshipId};
