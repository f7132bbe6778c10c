//! Recipe declarations, dependency resolution and build planning
//!
//! The pipeline:
//! 1. [`RecipeRepository::scan`] reads `brioche.yml` declarations from disk
//! 2. [`load_recipes`] validates them into a [`RecipeSet`]
//! 3. [`RecipeGraph::build`] links dependencies and rejects cycles
//! 4. [`BuildPlan::new`] orders the recipes, [`BuildPlan::stages`] groups
//!    them for parallel builds
//! 5. [`PlanRunner`] hands each stage to a [`SourceFetcher`] and a
//!    [`BuildExecutor`]
//!
//! # Example
//!
//! ```
//! use brioche_recipe::{BuildPlan, LoaderConfig, RecipeDeclaration, RecipeGraph, load_recipes};
//!
//! let declarations = [
//!     RecipeDeclaration::from_yaml_str(
//!         "gcc",
//!         r#"
//! name: gcc
//! version: "11.2.0"
//! source: { tarball: "https://ftp.gnu.org/gnu/gcc/gcc-11.2.0/gcc-11.2.0.tar.gz" }
//! dependencies: { binutils: "2.37" }
//! build: make && make install
//! "#,
//!     )
//!     .unwrap(),
//!     RecipeDeclaration::from_yaml_str(
//!         "binutils",
//!         r#"
//! name: binutils
//! version: "2.37"
//! source: { tarball: "https://ftp.gnu.org/gnu/binutils/binutils-2.37.tar.gz" }
//! build: make && make install
//! "#,
//!     )
//!     .unwrap(),
//! ];
//!
//! let recipes = load_recipes(&declarations, &LoaderConfig::default())
//!     .unwrap()
//!     .into_strict()
//!     .unwrap();
//! let graph = RecipeGraph::build(recipes).unwrap();
//! let plan = BuildPlan::new(&graph).unwrap();
//!
//! let order: Vec<String> = plan.ids().map(ToString::to_string).collect();
//! assert_eq!(order, vec!["binutils@2.37", "gcc@11.2.0"]);
//! ```

#![warn(unused_results)]

pub mod declaration;
pub mod env;
pub mod error;
pub mod executor;
pub mod graph;
pub mod hash;
pub mod loader;
pub mod plan;
pub mod recipe;
pub mod repository;

pub use declaration::RecipeDeclaration;
pub use env::BuildEnv;
pub use error::{RecipeError, Result};
pub use executor::{
    BakedRecipe, BuildExecutor, BuildRequest, DryRunExecutor, ExecutionError, PlanRunner,
    SourceFetcher,
};
pub use graph::RecipeGraph;
pub use hash::RecipeHash;
pub use loader::{LoadedRecipes, LoaderConfig, RecipeSet, load_recipes};
pub use plan::BuildPlan;
pub use recipe::{BuildScript, Recipe, RecipeId, RecipeSource};
pub use repository::{DEFAULT_RECIPE_FILE, RecipeFile, RecipeRepository};
