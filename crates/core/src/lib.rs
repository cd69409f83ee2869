pub mod error;
pub mod genetics;
pub mod inference;
pub mod types;

pub use error::{InferenceError, Result};
