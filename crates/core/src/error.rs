use thiserror::Error;

use crate::genetics::{AnimalId, RelationshipId};

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Animal {0} not found in herd")]
    UnknownAnimal(AnimalId),

    #[error("Relationship {0} not found in herd")]
    UnknownRelationship(RelationshipId),

    #[error("An animal cannot be bred with itself")]
    SelfBreeding,

    #[error("Distribution weights must sum to 1.0 (+/- {tolerance}), got {sum}")]
    NotNormalized { sum: f64, tolerance: f64 },

    #[error("No hypothesis is consistent with the evidence in {context}")]
    InconsistentEvidence { context: String },

    #[error("Unknown inference strategy '{0}' (expected \"naive\", \"ensemble\", or \"loopy\")")]
    UnknownStrategy(String),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
