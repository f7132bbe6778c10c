//! Content hashes of planned recipes
//!
//! A recipe's hash covers its canonical JSON form together with the hashes
//! of its dependencies, so any change anywhere below a recipe changes the
//! recipe's hash as well.

use crate::error::{RecipeError, Result};
use crate::plan::BuildPlan;
use crate::recipe::{Recipe, RecipeId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// SHA-256 identifying a recipe and everything it depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeHash([u8; 32]);

/// What goes into a recipe hash. Maps are ordered, so the JSON is
/// canonical.
#[derive(Serialize)]
struct HashInput<'a> {
    recipe: &'a Recipe,
    dependencies: BTreeMap<String, String>,
}

impl RecipeHash {
    /// Raw digest
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash every recipe of a plan.
    ///
    /// # Errors
    ///
    /// - `RecipeError::UnresolvedDependency` if a dependency is not in the
    ///   plan ahead of the recipe needing it
    /// - `RecipeError::Serialization` if a recipe cannot be encoded
    pub fn compute_all(plan: &BuildPlan) -> Result<BTreeMap<RecipeId, RecipeHash>> {
        let mut hashes: BTreeMap<RecipeId, RecipeHash> = BTreeMap::new();

        for recipe in plan {
            let mut dependencies = BTreeMap::new();
            for dependency in recipe.dependency_ids() {
                let hash = hashes
                    .get(&dependency)
                    .ok_or_else(|| RecipeError::UnresolvedDependency {
                        recipe: recipe.id.clone(),
                        dependency: dependency.clone(),
                    })?;
                let _ = dependencies.insert(dependency.to_string(), hash.to_string());
            }

            let hash = Self::compute(recipe, dependencies)?;
            let _ = hashes.insert(recipe.id.clone(), hash);
        }

        Ok(hashes)
    }

    fn compute(recipe: &Recipe, dependencies: BTreeMap<String, String>) -> Result<Self> {
        let input = HashInput {
            recipe,
            dependencies,
        };
        let json = serde_json::to_vec(&input).map_err(|e| RecipeError::Serialization {
            recipe: recipe.id.clone(),
            message: e.to_string(),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(Self(hasher.finalize().into()))
    }
}

impl fmt::Display for RecipeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RecipeGraph;
    use crate::loader::RecipeSet;
    use crate::recipe::{BuildScript, RecipeSource};

    fn recipe(name: &str, script: &'static str, deps: &[&str]) -> Recipe {
        deps.iter().fold(
            Recipe::new(
                RecipeId::new(name, "1"),
                RecipeSource::Tarball {
                    tarball: format!("https://example.org/{name}.tar.gz"),
                },
                BuildScript::sh(script),
            ),
            |recipe, dep| recipe.with_dependency(*dep, "1"),
        )
    }

    fn hashes(recipes: Vec<Recipe>) -> BTreeMap<RecipeId, RecipeHash> {
        let graph = RecipeGraph::build(RecipeSet::from_recipes(recipes).unwrap()).unwrap();
        RecipeHash::compute_all(&BuildPlan::new(&graph).unwrap()).unwrap()
    }

    #[test]
    fn test_hash_display() {
        let hashes = hashes(vec![recipe("m4", "make", &[])]);
        let digest = hashes[&RecipeId::new("m4", "1")].to_string();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let mut bytes = [0u8; 32];
        bytes[0] = 0x0a;
        bytes[31] = 0xff;
        let shown = RecipeHash(bytes).to_string();
        assert!(shown.starts_with("0a00"));
        assert!(shown.ends_with("00ff"));
        assert_eq!(shown, hex::encode(RecipeHash(bytes).as_bytes()));
    }

    #[test]
    fn test_hash_is_stable() {
        let first = hashes(vec![recipe("a", "make", &["b"]), recipe("b", "make", &[])]);
        let second = hashes(vec![recipe("b", "make", &[]), recipe("a", "make", &["b"])]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dependency_change_propagates() {
        let before = hashes(vec![
            recipe("a", "make", &["b"]),
            recipe("b", "make", &["c"]),
            recipe("c", "make", &[]),
            recipe("d", "make", &[]),
        ]);
        let after = hashes(vec![
            recipe("a", "make", &["b"]),
            recipe("b", "make", &["c"]),
            recipe("c", "make install", &[]),
            recipe("d", "make", &[]),
        ]);

        for changed in ["a", "b", "c"] {
            let id = RecipeId::new(changed, "1");
            assert_ne!(before[&id], after[&id], "{changed} should change");
        }
        let unrelated = RecipeId::new("d", "1");
        assert_eq!(before[&unrelated], after[&unrelated]);
    }
}
