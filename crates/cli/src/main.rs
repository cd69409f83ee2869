use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use openherd_core::genetics::{
    Category, DistributionKind, Genotype, Grade, GradeDistribution, Herd, PerCategory,
};
use openherd_core::inference::engine_for;

#[derive(Parser)]
#[command(name = "openherd")]
#[command(version)]
#[command(about = "Hidden-allele inference over simulated breeding records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a randomized breeding simulation and report inferred beliefs
    Simulate {
        /// Number of founder animals with random genotypes
        #[arg(long, default_value = "6")]
        founders: usize,

        /// Number of breeding events
        #[arg(long, default_value = "20")]
        rounds: usize,

        /// Inference strategy: "naive", "ensemble" (default) or "loopy"
        #[arg(long, default_value = "ensemble")]
        strategy: String,

        /// RNG seed for reproducible runs
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Estimate a single pair's joint from observed offspring counts
    Score {
        /// First parent's phenotype (S, A, B, C, D or E)
        #[arg(long)]
        parent1: String,

        /// Second parent's phenotype
        #[arg(long)]
        parent2: String,

        /// Observed offspring phenotypes as grade:count (repeatable,
        /// e.g. --offspring B:53 --offspring C:24)
        #[arg(long)]
        offspring: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            founders,
            rounds,
            strategy,
            seed,
            format,
        } => cmd_simulate(founders, rounds, &strategy, seed, &format),
        Commands::Score {
            parent1,
            parent2,
            offspring,
        } => cmd_score(&parent1, &parent2, &offspring),
    }
}

fn cmd_simulate(
    founders: usize,
    rounds: usize,
    strategy: &str,
    seed: u64,
    output_format: &str,
) -> Result<()> {
    anyhow::ensure!(founders >= 2, "Need at least 2 founders to breed");
    let engine = engine_for(strategy)
        .with_context(|| format!("Unknown strategy '{strategy}'"))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut herd = Herd::new();

    let founder_ids: Vec<_> = (0..founders)
        .map(|i| {
            let genotypes = PerCategory::build(|_| Genotype {
                phenotype: random_grade(&mut rng),
                hidden_allele: random_grade(&mut rng),
            });
            herd.register_founder(&format!("founder-{i}"), genotypes)
        })
        .collect();

    eprintln!(
        "Simulating {rounds} breeding events over {founders} founders, strategy={}",
        engine.name()
    );

    let mut failures = 0usize;
    for round in 0..rounds {
        let a = founder_ids[rng.gen_range(0..founder_ids.len())];
        let b = founder_ids[rng.gen_range(0..founder_ids.len())];
        if a == b {
            continue;
        }
        if let Err(err) = herd.breed(engine.as_ref(), a, b, &format!("lamb-{round}"), &mut rng) {
            failures += 1;
            eprintln!("round {round}: breeding {a} x {b} failed: {err}");
        }
    }

    eprintln!(
        "Done: {} animals, {} relationships, {failures} rolled-back events",
        herd.n_animals(),
        herd.n_relationships()
    );

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&herd)?,
        _ => print_text(&herd),
    }
    Ok(())
}

fn random_grade<R: Rng>(rng: &mut R) -> Grade {
    Grade::ALL[rng.gen_range(0..Grade::COUNT)]
}

fn print_text(herd: &Herd) {
    for animal in herd.animals() {
        println!("{} ({})", animal.name(), animal.id());
        for category in Category::ALL {
            let inferred = animal.distribution(category, DistributionKind::Inferred);
            let weights: Vec<String> = inferred
                .iter()
                .map(|(grade, p)| format!("{grade}:{p:.3}"))
                .collect();
            println!(
                "  {category:<8} phenotype={} mode={} [{}]",
                animal.phenotype(category),
                inferred.mode(),
                weights.join(" ")
            );
        }
    }
}

fn print_json(herd: &Herd) -> Result<()> {
    let animals: Vec<serde_json::Value> = herd
        .animals()
        .map(|animal| {
            let categories: Vec<serde_json::Value> = Category::ALL
                .iter()
                .map(|&category| {
                    let inferred = animal.distribution(category, DistributionKind::Inferred);
                    serde_json::json!({
                        "category": category.to_string(),
                        "phenotype": animal.phenotype(category).to_string(),
                        "mode": inferred.mode().to_string(),
                        "inferred": distribution_json(inferred),
                    })
                })
                .collect();
            serde_json::json!({
                "id": animal.id().to_string(),
                "name": animal.name(),
                "founder": animal.parent_relationship().is_none(),
                "categories": categories,
            })
        })
        .collect();

    let json = serde_json::json!({
        "n_animals": herd.n_animals(),
        "n_relationships": herd.n_relationships(),
        "animals": animals,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn distribution_json(distribution: &GradeDistribution) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = distribution
        .iter()
        .map(|(grade, p)| (grade.to_string(), serde_json::json!(p)))
        .collect();
    serde_json::Value::Object(map)
}

fn cmd_score(parent1: &str, parent2: &str, offspring: &[String]) -> Result<()> {
    let phenotype1 = parse_grade(parent1)?;
    let phenotype2 = parse_grade(parent2)?;

    let mut herd = Herd::new();
    let a = herd.register_founder(
        "parent1",
        PerCategory::filled(Genotype {
            phenotype: phenotype1,
            hidden_allele: phenotype1,
        }),
    );
    let b = herd.register_founder(
        "parent2",
        PerCategory::filled(Genotype {
            phenotype: phenotype2,
            hidden_allele: phenotype2,
        }),
    );
    let rel_id = herd.find_or_create_relationship(a, b)?;

    let mut total = 0u32;
    for entry in offspring {
        let (grade, count) = parse_offspring(entry)?;
        let relationship = herd.relationship_mut(rel_id)?;
        for _ in 0..count {
            relationship.record_offspring(Category::Swim, grade);
        }
        total += count;
    }
    anyhow::ensure!(total > 0, "Need at least one observed offspring");

    let engine = engine_for("ensemble")?;
    engine
        .estimate_joint(&mut herd, rel_id)
        .context("No hidden-allele pair explains the observed counts")?;
    engine.update_marginals(&mut herd, rel_id)?;

    println!("Joint over hidden alleles ({total} offspring observed):");
    let joint = herd.relationship(rel_id)?.joint(Category::Swim);
    for (pair, weight) in joint.iter() {
        if weight > 0.0 {
            println!("  ({}, {}): {weight:.6}", pair.first, pair.second);
        }
    }

    for (label, id) in [("parent1", a), ("parent2", b)] {
        let inferred = herd
            .animal(id)?
            .distribution(Category::Swim, DistributionKind::Inferred);
        let weights: Vec<String> = inferred
            .iter()
            .map(|(grade, p)| format!("{grade}:{p:.4}"))
            .collect();
        println!("{label} hidden-allele belief: [{}]", weights.join(" "));
    }
    Ok(())
}

fn parse_grade(symbol: &str) -> Result<Grade> {
    Grade::from_symbol(symbol.trim())
        .with_context(|| format!("Unknown grade '{symbol}'. Use S, A, B, C, D or E."))
}

fn parse_offspring(entry: &str) -> Result<(Grade, u32)> {
    let (grade, count) = entry
        .split_once(':')
        .with_context(|| format!("Expected grade:count, got '{entry}'"))?;
    let count: u32 = count
        .parse()
        .with_context(|| format!("Invalid count in '{entry}'"))?;
    Ok((parse_grade(grade)?, count))
}
