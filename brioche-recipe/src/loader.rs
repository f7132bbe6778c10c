//! Turning declarations into a consistent recipe set

use crate::declaration::RecipeDeclaration;
use crate::error::{RecipeError, Result};
use crate::recipe::{Recipe, RecipeId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Loader behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Accept several versions of the same recipe name. When off, a second
    /// declaration with an already loaded name is a duplicate whatever its
    /// version.
    pub allow_multiple_versions: bool,
}

/// Recipes keyed by identity, iterated in (name, version) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeSet {
    recipes: BTreeMap<RecipeId, Recipe>,
}

impl RecipeSet {
    /// Collect recipes into a set.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::DuplicateRecipe` if two recipes share an
    /// identity. Several versions of one name are allowed here.
    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Result<Self> {
        let mut set = Self::default();
        for recipe in recipes {
            set.insert(recipe)?;
        }
        Ok(set)
    }

    fn insert(&mut self, recipe: Recipe) -> Result<()> {
        if self.recipes.contains_key(&recipe.id) {
            return Err(RecipeError::DuplicateRecipe {
                existing: recipe.id.clone(),
                duplicate: recipe.id,
            });
        }
        let _ = self.recipes.insert(recipe.id.clone(), recipe);
        Ok(())
    }

    /// Recipe with exactly this identity
    pub fn get(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// Whether a recipe with this identity is loaded
    pub fn contains(&self, id: &RecipeId) -> bool {
        self.recipes.contains_key(id)
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// True when the set holds no recipe
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Recipes ordered by identity
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Identities in order
    pub fn ids(&self) -> impl Iterator<Item = &RecipeId> {
        self.recipes.keys()
    }

    /// All loaded versions of `name`, lowest version string first.
    pub fn versions_of<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Recipe> + use<'a, 'n> {
        self.recipes.values().filter(move |recipe| recipe.name() == name)
    }

    /// Look a recipe up by name, and by version when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::UnknownRecipe` if nothing matches, or if only a
    /// name is given and several versions of it are loaded.
    pub fn find(&self, name: &str, version: Option<&str>) -> Result<&Recipe> {
        if let Some(version) = version {
            return self
                .get(&RecipeId::new(name, version))
                .ok_or_else(|| RecipeError::UnknownRecipe(format!("{name}@{version}")));
        }

        let mut matches = self.versions_of(name);
        match (matches.next(), matches.next()) {
            (Some(recipe), None) => Ok(recipe),
            (Some(_), Some(_)) => Err(RecipeError::UnknownRecipe(format!(
                "{name} (several versions loaded, use NAME@VERSION)"
            ))),
            (None, _) => Err(RecipeError::UnknownRecipe(name.to_string())),
        }
    }

    /// Parse a `NAME` or `NAME@VERSION` label and look it up.
    ///
    /// # Errors
    ///
    /// See [`RecipeSet::find`].
    pub fn find_label(&self, label: &str) -> Result<&Recipe> {
        match label.split_once('@') {
            Some((name, version)) => self.find(name, Some(version)),
            None => self.find(label, None),
        }
    }
}

impl<'a> IntoIterator for &'a RecipeSet {
    type Item = &'a Recipe;
    type IntoIter = std::collections::btree_map::Values<'a, RecipeId, Recipe>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipes.values()
    }
}

/// Outcome of loading a batch of declarations.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecipes {
    /// Recipes that passed validation
    pub recipes: RecipeSet,
    /// One `MalformedDeclaration` per declaration that was skipped
    pub rejected: Vec<RecipeError>,
}

impl LoadedRecipes {
    /// Keep the recipes only if nothing was rejected.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Rejected` with every rejection otherwise.
    pub fn into_strict(self) -> Result<RecipeSet> {
        if self.rejected.is_empty() {
            Ok(self.recipes)
        } else {
            Err(RecipeError::Rejected(self.rejected))
        }
    }
}

/// Validate declarations and collect them into a recipe set.
///
/// Declarations are processed in the given order. A malformed declaration
/// is recorded in `rejected` and loading carries on with the rest.
///
/// # Errors
///
/// Returns `RecipeError::DuplicateRecipe` if two declarations share an
/// identity, or a name unless `allow_multiple_versions` is set.
pub fn load_recipes(
    declarations: &[RecipeDeclaration],
    config: &LoaderConfig,
) -> Result<LoadedRecipes> {
    let mut loaded = LoadedRecipes::default();
    let mut by_name: BTreeMap<String, RecipeId> = BTreeMap::new();

    for declaration in declarations {
        let recipe = match declaration.parse() {
            Ok(recipe) => recipe,
            Err(e) => {
                warn!("Skipping declaration: {}", e);
                loaded.rejected.push(e);
                continue;
            }
        };

        let clash = if config.allow_multiple_versions {
            loaded.recipes.contains(&recipe.id).then(|| recipe.id.clone())
        } else {
            by_name.get(recipe.name()).cloned()
        };

        if let Some(existing) = clash {
            return Err(RecipeError::DuplicateRecipe {
                existing,
                duplicate: recipe.id,
            });
        }

        debug!("Loaded {} from {}", recipe.id, declaration.origin);
        let _ = by_name.insert(recipe.name().to_string(), recipe.id.clone());
        let _ = loaded.recipes.recipes.insert(recipe.id.clone(), recipe);
    }

    Ok(loaded)
}
