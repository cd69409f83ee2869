//! Scenario tests for the three inference strategies, built on small herds
//! whose expected beliefs can be verified by hand.

use approx::assert_relative_eq;
use openherd_core::genetics::{
    AnimalId, Category, DistributionKind, Genotype, Grade, GradeDistribution, GradePair, Herd,
    PerCategory, RelationshipId,
};
use openherd_core::inference::{engine_for, EnsembleInference, InferenceEngine, LoopyInference};

fn founder(herd: &mut Herd, name: &str, phenotype: Grade) -> AnimalId {
    herd.register_founder(
        name,
        PerCategory::filled(Genotype {
            phenotype,
            hidden_allele: phenotype,
        }),
    )
}

fn record_counts(herd: &mut Herd, rel: RelationshipId, counts: &[(Grade, u32)]) {
    let relationship = herd.relationship_mut(rel).unwrap();
    for &(grade, n) in counts {
        for _ in 0..n {
            relationship.record_offspring(Category::Swim, grade);
        }
    }
}

#[test]
fn test_strategy_selection_by_name() {
    for name in ["naive", "ensemble", "loopy"] {
        assert_eq!(engine_for(name).unwrap().name(), name);
    }
    assert!(engine_for("exact").is_err());
}

// Scenario: both parents phenotype B, one offspring observed with phenotype
// C. Every hypothesis that cannot produce a C offspring must carry weight 0.
#[test]
fn test_joint_covers_only_compatible_hypotheses() {
    let mut herd = Herd::new();
    let a = founder(&mut herd, "a", Grade::B);
    let b = founder(&mut herd, "b", Grade::B);
    let rel = herd.find_or_create_relationship(a, b).unwrap();
    record_counts(&mut herd, rel, &[(Grade::C, 1)]);

    EnsembleInference.estimate_joint(&mut herd, rel).unwrap();

    let joint = herd.relationship(rel).unwrap().joint(Category::Swim);
    assert_eq!(joint.iter().count(), 36);
    assert_relative_eq!(joint.sum(), 1.0, epsilon = 1e-9);
    for (pair, weight) in joint.iter() {
        let compatible = pair.first == Grade::C || pair.second == Grade::C;
        if compatible {
            assert!(weight > 0.0, "pair {pair} should carry weight");
        } else {
            assert_eq!(weight, 0.0, "pair {pair} cannot produce a C offspring");
        }
    }
}

// Scenario: parent1 phenotype A, parent2 phenotype B, uniform priors, one
// offspring with phenotype C. The ensemble marginal puts 7/12 on C for both
// parents and 1/12 on every other grade.
#[test]
fn test_ensemble_marginals_seven_twelfths() {
    let mut herd = Herd::new();
    let a = founder(&mut herd, "a", Grade::A);
    let b = founder(&mut herd, "b", Grade::B);
    let rel = herd.find_or_create_relationship(a, b).unwrap();
    record_counts(&mut herd, rel, &[(Grade::C, 1)]);

    EnsembleInference.estimate_joint(&mut herd, rel).unwrap();
    EnsembleInference.update_marginals(&mut herd, rel).unwrap();

    for id in [a, b] {
        let inferred = herd
            .animal(id)
            .unwrap()
            .distribution(Category::Swim, DistributionKind::Inferred);
        assert_relative_eq!(inferred.get(Grade::C), 7.0 / 12.0, epsilon = 1e-9);
        for grade in Grade::ALL {
            if grade != Grade::C {
                assert_relative_eq!(inferred.get(grade), 1.0 / 12.0, epsilon = 1e-9);
            }
        }
        assert_relative_eq!(inferred.sum(), 1.0, epsilon = 1e-9);
    }
}

// Scenario: both parents phenotype B with offspring history
// {B: 53, C: 24, D: 23}. Only the hidden pairs (C, D) and (D, C) explain all
// three observed grades, so predicting a child seen with phenotype D gives
// exactly half B (the contributing parent's phenotype) and half C.
#[test]
fn test_predict_child_after_long_history() {
    let mut herd = Herd::new();
    let a = founder(&mut herd, "a", Grade::B);
    let b = founder(&mut herd, "b", Grade::B);
    let rel = herd.find_or_create_relationship(a, b).unwrap();
    record_counts(&mut herd, rel, &[(Grade::B, 53), (Grade::C, 24), (Grade::D, 23)]);

    EnsembleInference.estimate_joint(&mut herd, rel).unwrap();
    EnsembleInference.update_marginals(&mut herd, rel).unwrap();

    let joint = herd.relationship(rel).unwrap().joint(Category::Swim);
    assert_relative_eq!(
        joint.get(GradePair::new(Grade::C, Grade::D)),
        0.5,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        joint.get(GradePair::new(Grade::D, Grade::C)),
        0.5,
        epsilon = 1e-9
    );

    let prediction = EnsembleInference
        .predict_child(&herd, rel, Category::Swim, Grade::D)
        .unwrap();
    assert_relative_eq!(prediction.get(Grade::B), 0.5, epsilon = 1e-9);
    assert_relative_eq!(prediction.get(Grade::C), 0.5, epsilon = 1e-9);
    for grade in [Grade::S, Grade::A, Grade::D, Grade::E] {
        assert_relative_eq!(prediction.get(grade), 0.0, epsilon = 1e-9);
    }
}

// Estimation must fail loudly when no hidden pair can explain the counts:
// three distinct non-phenotype grades never fit two hidden alleles.
#[test]
fn test_estimate_joint_contradictory_counts_fails_without_writes() {
    let mut herd = Herd::new();
    let a = founder(&mut herd, "a", Grade::A);
    let b = founder(&mut herd, "b", Grade::A);
    let rel = herd.find_or_create_relationship(a, b).unwrap();
    record_counts(&mut herd, rel, &[(Grade::C, 1), (Grade::D, 1), (Grade::E, 1)]);

    let before = herd.relationship(rel).unwrap().joint(Category::Swim).clone();
    assert!(EnsembleInference.estimate_joint(&mut herd, rel).is_err());
    assert_eq!(herd.relationship(rel).unwrap().joint(Category::Swim), &before);
}

// When the parents' beliefs exclude every hypothesis the joint supports, the
// predictor must report the inconsistency instead of normalizing garbage.
#[test]
fn test_predict_child_with_incompatible_beliefs_fails() {
    let mut herd = Herd::new();
    let a = founder(&mut herd, "a", Grade::A);
    let b = founder(&mut herd, "b", Grade::A);
    let rel = herd.find_or_create_relationship(a, b).unwrap();
    record_counts(&mut herd, rel, &[(Grade::C, 1)]);
    EnsembleInference.estimate_joint(&mut herd, rel).unwrap();

    // Force both beliefs onto S; the joint only supports pairs containing C.
    let mut on_s = GradeDistribution::zero();
    on_s.set(Grade::S, 1.0);
    for id in [a, b] {
        herd.animal_mut(id)
            .unwrap()
            .set_distribution(Category::Swim, DistributionKind::Inferred, on_s.clone())
            .unwrap();
    }

    assert!(EnsembleInference
        .predict_child(&herd, rel, Category::Swim, Grade::C)
        .is_err());
}

// A three-animal cycle of relationships (a-b, b-c, c-a). The ensemble
// strategy lets relationship evidence echo around the cycle; loopy excludes
// the triggering relationship from each parent's message. After breeding all
// three relationships the two strategies must disagree about animal a.
#[test]
fn test_loopy_and_ensemble_diverge_on_a_cycle() {
    fn run(engine: &dyn InferenceEngine) -> GradeDistribution {
        let mut herd = Herd::new();
        let a = founder(&mut herd, "a", Grade::B);
        let b = founder(&mut herd, "b", Grade::B);
        let c = founder(&mut herd, "c", Grade::B);

        let pairs = [(a, b, Grade::C), (b, c, Grade::D), (c, a, Grade::C)];
        for (x, y, offspring_phenotype) in pairs {
            let rel = herd.find_or_create_relationship(x, y).unwrap();
            record_counts(&mut herd, rel, &[(offspring_phenotype, 1)]);
            engine.estimate_joint(&mut herd, rel).unwrap();
            engine.update_marginals(&mut herd, rel).unwrap();
        }

        herd.animal(a)
            .unwrap()
            .distribution(Category::Swim, DistributionKind::Inferred)
            .clone()
    }

    let ensemble_belief = run(&EnsembleInference);
    let loopy_belief = run(&LoopyInference);

    ensemble_belief.validate_normalized().unwrap();
    loopy_belief.validate_normalized().unwrap();

    let max_difference = Grade::ALL
        .iter()
        .map(|&g| (ensemble_belief.get(g) - loopy_belief.get(g)).abs())
        .fold(0.0_f64, f64::max);
    assert!(
        max_difference > 1e-9,
        "cycle exclusion should change the belief (max difference {max_difference})"
    );
}
