use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the six ordered trait grades, best (`S`) to worst (`E`).
///
/// Grades index dense arrays throughout the crate, so every distribution is
/// total over the grade space by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    /// Number of grades.
    pub const COUNT: usize = 6;

    /// All grades in rank order.
    pub const ALL: [Grade; Grade::COUNT] =
        [Grade::S, Grade::A, Grade::B, Grade::C, Grade::D, Grade::E];

    /// Dense 0-based index of this grade.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse a grade from its symbol.
    pub fn from_symbol(s: &str) -> Option<Grade> {
        match s {
            "S" => Some(Grade::S),
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "E" => Some(Grade::E),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An independent trait axis. All per-animal and per-relationship state is
/// kept per category; the engine never mixes evidence across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Swim,
    Fly,
    Run,
    Power,
    Stamina,
}

impl Category {
    /// Number of trait categories.
    pub const COUNT: usize = 5;

    /// All categories.
    pub const ALL: [Category; Category::COUNT] = [
        Category::Swim,
        Category::Fly,
        Category::Run,
        Category::Power,
        Category::Stamina,
    ];

    /// Dense 0-based index of this category.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An ordered hypothesis for a breeding pair's two hidden alleles: `first` is
/// the allele linked to parent 1, `second` to parent 2. `(X, Y)` and `(Y, X)`
/// are distinct keys even though the probability model treats the parents
/// symmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GradePair {
    pub first: Grade,
    pub second: Grade,
}

impl GradePair {
    pub fn new(first: Grade, second: Grade) -> Self {
        GradePair { first, second }
    }

    /// Iterate over all `Grade::COUNT`^2 ordered pairs.
    pub fn all() -> impl Iterator<Item = GradePair> {
        Grade::ALL.iter().flat_map(|&first| {
            Grade::ALL
                .iter()
                .map(move |&second| GradePair { first, second })
        })
    }
}

impl fmt::Display for GradePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// Which of an animal's two per-category belief distributions is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionKind {
    /// Belief prior to (independent of) the current round of relationship
    /// evidence. For a bred animal this is the predictor output at birth.
    Prior,
    /// Output of a marginal updater.
    Inferred,
}

/// A dense, total map from `Category` to `T`, built eagerly at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T>([T; Category::COUNT]);

impl<T> PerCategory<T> {
    /// Build the map by evaluating `f` for every category.
    pub fn build(mut f: impl FnMut(Category) -> T) -> Self {
        PerCategory(Category::ALL.map(&mut f))
    }

    pub fn get(&self, category: Category) -> &T {
        &self.0[category.index()]
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        &mut self.0[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.iter().copied().zip(self.0.iter())
    }
}

impl<T: Clone> PerCategory<T> {
    /// Build the map with the same value for every category.
    pub fn filled(value: T) -> Self {
        PerCategory::build(|_| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_order() {
        assert!(Grade::S < Grade::A);
        assert!(Grade::D < Grade::E);
        assert_eq!(Grade::ALL.len(), Grade::COUNT);
    }

    #[test]
    fn test_grade_from_symbol() {
        assert_eq!(Grade::from_symbol("S"), Some(Grade::S));
        assert_eq!(Grade::from_symbol("E"), Some(Grade::E));
        assert_eq!(Grade::from_symbol("F"), None);
        assert_eq!(Grade::from_symbol("s"), None);
    }

    #[test]
    fn test_pair_enumeration_is_ordered_and_complete() {
        let pairs: Vec<GradePair> = GradePair::all().collect();
        assert_eq!(pairs.len(), Grade::COUNT * Grade::COUNT);
        assert_eq!(pairs[0], GradePair::new(Grade::S, Grade::S));
        assert_eq!(pairs[1], GradePair::new(Grade::S, Grade::A));

        // (X, Y) and (Y, X) are distinct keys.
        assert_ne!(
            GradePair::new(Grade::A, Grade::B),
            GradePair::new(Grade::B, Grade::A)
        );
    }

    #[test]
    fn test_per_category_build() {
        let map = PerCategory::build(|c| c.index() * 10);
        assert_eq!(*map.get(Category::Swim), 0);
        assert_eq!(*map.get(Category::Stamina), 40);
        assert_eq!(map.iter().count(), Category::COUNT);
    }
}
