use indexmap::IndexMap;
use rand::Rng;

use crate::error::{InferenceError, Result};
use crate::genetics::{
    Animal, AnimalId, Category, Genotype, GradeDistribution, DistributionKind, PerCategory,
    Relationship, RelationshipId,
};
use crate::inference::InferenceEngine;

/// The herd catalog: every animal and breeding relationship, keyed by stable
/// id with insertion-ordered iteration.
///
/// The catalog is the collaborator the inference strategies query for
/// pedigree neighborhoods; animals and relationships reference each other by
/// id only, never by direct object links, so the (cyclic) pedigree graph
/// stays walkable without reference cycles.
///
/// All access is synchronous and exclusive: a breeding event borrows the herd
/// mutably for its whole estimate -> update -> predict chain, which is the
/// serialization contract the engine assumes.
#[derive(Debug, Clone, Default)]
pub struct Herd {
    animals: IndexMap<AnimalId, Animal>,
    relationships: IndexMap<RelationshipId, Relationship>,
    next_animal_id: u32,
    next_relationship_id: u32,
}

impl Herd {
    pub fn new() -> Self {
        Herd::default()
    }

    pub fn n_animals(&self) -> usize {
        self.animals.len()
    }

    pub fn n_relationships(&self) -> usize {
        self.relationships.len()
    }

    /// Register an animal with known genotypes and no parents in the herd.
    /// Its belief distributions start uniform.
    pub fn register_founder(&mut self, name: &str, genotypes: PerCategory<Genotype>) -> AnimalId {
        let id = AnimalId(self.next_animal_id);
        self.next_animal_id += 1;
        self.animals
            .insert(id, Animal::new(id, name.to_string(), genotypes, None));
        id
    }

    /// Look up an animal by id.
    ///
    /// # Errors
    /// Returns `UnknownAnimal` if the id is not in the catalog.
    pub fn animal(&self, id: AnimalId) -> Result<&Animal> {
        self.animals
            .get(&id)
            .ok_or(InferenceError::UnknownAnimal(id))
    }

    /// Mutable access to an animal. The herd has no internal locking;
    /// callers serialize access per pedigree neighborhood.
    ///
    /// # Errors
    /// Returns `UnknownAnimal` if the id is not in the catalog.
    pub fn animal_mut(&mut self, id: AnimalId) -> Result<&mut Animal> {
        self.animals
            .get_mut(&id)
            .ok_or(InferenceError::UnknownAnimal(id))
    }

    /// Look up a relationship by id.
    ///
    /// # Errors
    /// Returns `UnknownRelationship` if the id is not in the catalog.
    pub fn relationship(&self, id: RelationshipId) -> Result<&Relationship> {
        self.relationships
            .get(&id)
            .ok_or(InferenceError::UnknownRelationship(id))
    }

    /// Mutable access to a relationship, under the same exclusivity contract
    /// as [`Herd::animal_mut`].
    ///
    /// # Errors
    /// Returns `UnknownRelationship` if the id is not in the catalog.
    pub fn relationship_mut(&mut self, id: RelationshipId) -> Result<&mut Relationship> {
        self.relationships
            .get_mut(&id)
            .ok_or(InferenceError::UnknownRelationship(id))
    }

    pub fn animals(&self) -> impl Iterator<Item = &Animal> {
        self.animals.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// The existing relationship for an unordered pair, if any.
    pub fn find_relationship(&self, a: AnimalId, b: AnimalId) -> Option<RelationshipId> {
        self.relationships
            .values()
            .find(|rel| rel.involves(a) && rel.involves(b))
            .map(|rel| rel.id())
    }

    /// Locate the canonical relationship for the pair, creating it on first
    /// breeding.
    ///
    /// # Errors
    /// Returns `UnknownAnimal` for ids outside the catalog and `SelfBreeding`
    /// when both ids name the same animal.
    pub fn find_or_create_relationship(
        &mut self,
        a: AnimalId,
        b: AnimalId,
    ) -> Result<RelationshipId> {
        self.animal(a)?;
        self.animal(b)?;
        if let Some(existing) = self.find_relationship(a, b) {
            return Ok(existing);
        }
        let id = RelationshipId(self.next_relationship_id);
        let relationship = Relationship::new(id, a, b)?;
        self.next_relationship_id += 1;
        self.relationships.insert(id, relationship);
        Ok(id)
    }

    /// Every relationship `parent` participates in, in creation order.
    pub fn relationships_by_parent(&self, parent: AnimalId) -> Vec<RelationshipId> {
        self.relationships
            .values()
            .filter(|rel| rel.involves(parent))
            .map(|rel| rel.id())
            .collect()
    }

    /// The two parents of `animal`, or `None` for a founder.
    ///
    /// # Errors
    /// Returns `UnknownAnimal` if the id is not in the catalog.
    pub fn parents_of(&self, animal: AnimalId) -> Result<Option<(AnimalId, AnimalId)>> {
        let animal = self.animal(animal)?;
        match animal.parent_relationship() {
            None => Ok(None),
            Some(rel_id) => {
                let rel = self.relationship(rel_id)?;
                Ok(Some((rel.parent1(), rel.parent2())))
            }
        }
    }

    /// All animals born from a relationship `parent` participates in.
    pub fn children_of(&self, parent: AnimalId) -> Vec<AnimalId> {
        self.animals
            .values()
            .filter(|animal| {
                animal
                    .parent_relationship()
                    .and_then(|rel_id| self.relationships.get(&rel_id))
                    .is_some_and(|rel| rel.involves(parent))
            })
            .map(|animal| animal.id())
            .collect()
    }

    /// Every animal `parent` shares a relationship with.
    pub fn partners_of(&self, parent: AnimalId) -> Vec<AnimalId> {
        self.relationships
            .values()
            .filter_map(|rel| rel.other_parent(parent))
            .collect()
    }

    /// Breed two animals: draw a child, record its phenotype against the
    /// pair's relationship, and run the full inference chain
    /// (estimate joint -> update marginals -> predict child).
    ///
    /// The event is atomic: if any inference step fails, the touched
    /// relationship and parents are restored to their pre-event state and no
    /// child is added.
    ///
    /// # Errors
    /// Propagates lookup failures, `SelfBreeding`, and any
    /// `InconsistentEvidence` raised by the engine.
    pub fn breed<R: Rng + ?Sized>(
        &mut self,
        engine: &dyn InferenceEngine,
        a: AnimalId,
        b: AnimalId,
        child_name: &str,
        rng: &mut R,
    ) -> Result<AnimalId> {
        let existing = self.find_relationship(a, b);
        let rel_id = self.find_or_create_relationship(a, b)?;
        let created = existing.is_none();

        let snapshot_rel = self.relationship(rel_id)?.clone();
        let parent1_id = snapshot_rel.parent1();
        let parent2_id = snapshot_rel.parent2();
        let snapshot_p1 = self.animal(parent1_id)?.clone();
        let snapshot_p2 = self.animal(parent2_id)?.clone();

        let child_genotypes = self.draw_child_genotypes(parent1_id, parent2_id, rng)?;
        {
            let relationship = self.relationship_mut(rel_id)?;
            for (category, genotype) in child_genotypes.iter() {
                relationship.record_offspring(category, genotype.phenotype);
            }
        }

        match self.run_breeding_inference(engine, rel_id, &child_genotypes) {
            Ok(child_priors) => {
                let child_id = AnimalId(self.next_animal_id);
                self.next_animal_id += 1;
                let mut child = Animal::new(
                    child_id,
                    child_name.to_string(),
                    child_genotypes,
                    Some(rel_id),
                );
                for (category, prior) in child_priors.iter() {
                    child.set_distribution(category, DistributionKind::Prior, prior.clone())?;
                }
                log::debug!(
                    "bred {} from relationship {} ({} offspring so far)",
                    child_id,
                    rel_id,
                    self.relationship(rel_id)?
                        .offspring_counts(Category::Swim)
                        .total(),
                );
                self.animals.insert(child_id, child);
                Ok(child_id)
            }
            Err(err) => {
                log::warn!("breeding event on relationship {rel_id} rolled back: {err}");
                if created {
                    self.relationships.shift_remove(&rel_id);
                } else {
                    self.relationships.insert(rel_id, snapshot_rel);
                }
                self.animals.insert(parent1_id, snapshot_p1);
                self.animals.insert(parent2_id, snapshot_p2);
                Err(err)
            }
        }
    }

    /// Uniform random inheritance: per category each parent passes one of its
    /// two alleles uniformly, and a fair coin decides which parent's allele
    /// becomes the visible phenotype.
    fn draw_child_genotypes<R: Rng + ?Sized>(
        &self,
        parent1: AnimalId,
        parent2: AnimalId,
        rng: &mut R,
    ) -> Result<PerCategory<Genotype>> {
        let parent1 = self.animal(parent1)?;
        let parent2 = self.animal(parent2)?;

        let mut genotypes = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let allele1 = if rng.gen_bool(0.5) {
                parent1.phenotype(category)
            } else {
                parent1.hidden_allele(category)
            };
            let allele2 = if rng.gen_bool(0.5) {
                parent2.phenotype(category)
            } else {
                parent2.hidden_allele(category)
            };
            let (phenotype, hidden_allele) = if rng.gen_bool(0.5) {
                (allele1, allele2)
            } else {
                (allele2, allele1)
            };
            genotypes.push(Genotype {
                phenotype,
                hidden_allele,
            });
        }
        Ok(PerCategory::build(|category| genotypes[category.index()]))
    }

    fn run_breeding_inference(
        &mut self,
        engine: &dyn InferenceEngine,
        rel_id: RelationshipId,
        child_genotypes: &PerCategory<Genotype>,
    ) -> Result<PerCategory<GradeDistribution>> {
        engine.estimate_joint(self, rel_id)?;
        engine.update_marginals(self, rel_id)?;

        let mut priors = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let phenotype = child_genotypes.get(category).phenotype;
            priors.push(engine.predict_child(self, rel_id, category, phenotype)?);
        }
        Ok(PerCategory::build(|category| {
            priors[category.index()].clone()
        }))
    }
}
