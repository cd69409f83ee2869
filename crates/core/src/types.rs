/// The probability/weight scalar used throughout the library.
pub type Prob = f64;

/// Tolerance on the sum of a normalized distribution.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;
