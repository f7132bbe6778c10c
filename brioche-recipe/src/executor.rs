//! Running a build plan
//!
//! Fetching sources and running build scripts is left to implementations of
//! [`SourceFetcher`] and [`BuildExecutor`]. [`PlanRunner`] drives them over a
//! [`BuildPlan`]: stages run one after another, and the recipes of a stage
//! run concurrently, each one handed the install prefixes of its direct
//! dependencies.

use crate::env::BuildEnv;
use crate::plan::BuildPlan;
use crate::recipe::{Recipe, RecipeId};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// Errors raised while running a plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// Source could not be fetched or unpacked
    #[error("Failed to fetch source of {recipe}: {message}")]
    Fetch {
        /// Recipe whose source failed
        recipe: RecipeId,
        /// Fetcher message
        message: String,
    },

    /// Build script failed
    #[error("Failed to build {recipe}: {message}")]
    Build {
        /// Recipe whose build failed
        recipe: RecipeId,
        /// Executor message
        message: String,
    },

    /// A dependency has no install prefix yet
    #[error("{recipe} needs {dependency}, which has not been built")]
    MissingDependencyOutput {
        /// Recipe about to be built
        recipe: RecipeId,
        /// Dependency without output
        dependency: RecipeId,
    },
}

/// Everything an executor needs to build one recipe
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Recipe being fetched or built
    pub recipe: &'a Recipe,
    /// Unpacked source tree
    pub source_dir: PathBuf,
    /// Install prefix of each direct dependency
    pub dependency_prefixes: BTreeMap<RecipeId, PathBuf>,
    /// Variables the build script runs with
    pub env: BTreeMap<String, String>,
}

/// Makes a recipe's source available locally
#[allow(async_fn_in_trait)]
pub trait SourceFetcher {
    /// Return a directory holding the unpacked source of `recipe`.
    async fn fetch(&self, recipe: &Recipe) -> Result<PathBuf, ExecutionError>;
}

/// Runs build scripts
#[allow(async_fn_in_trait)]
pub trait BuildExecutor {
    /// Run the build script and return the directory the recipe was
    /// installed to.
    async fn build(&self, request: BuildRequest<'_>) -> Result<PathBuf, ExecutionError>;
}

/// A successfully built recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedRecipe {
    /// Recipe that was built
    pub id: RecipeId,
    /// Install prefix holding its output
    pub prefix_path: PathBuf,
}

/// Drives a fetcher and an executor over a plan
pub struct PlanRunner<'a, F, B> {
    fetcher: &'a F,
    executor: &'a B,
    env: BuildEnv,
}

impl<'a, F, B> PlanRunner<'a, F, B>
where
    F: SourceFetcher,
    B: BuildExecutor,
{
    /// Runner over the given fetcher and executor
    pub fn new(fetcher: &'a F, executor: &'a B, env: BuildEnv) -> Self {
        Self {
            fetcher,
            executor,
            env,
        }
    }

    /// Build every recipe of the plan.
    ///
    /// All recipes of a stage are started together. If any of them fails,
    /// the rest of the stage still finishes but no later stage is started.
    ///
    /// # Errors
    ///
    /// Returns the first error of the failing stage, in plan order.
    pub async fn run(&self, plan: &BuildPlan) -> Result<Vec<BakedRecipe>, ExecutionError> {
        let stages = plan.stages();
        info!(
            "Running {} recipes in {} stages",
            plan.len(),
            stages.len()
        );
        let start_time = Instant::now();

        let mut outputs: BTreeMap<RecipeId, PathBuf> = BTreeMap::new();

        for (index, stage) in stages.into_iter().enumerate() {
            let labels: Vec<String> = stage.iter().map(|recipe| recipe.id.to_string()).collect();
            info!("Stage {}: {}", index, labels.join(", "));

            let results = join_all(stage.iter().map(|recipe| self.bake(recipe, &outputs))).await;

            let mut first_error = None;
            for (recipe, result) in stage.iter().zip(results) {
                match result {
                    Ok(prefix_path) => {
                        debug!("{} -> {}", recipe.id, prefix_path.display());
                        let _ = outputs.insert(recipe.id.clone(), prefix_path);
                    }
                    Err(e) => {
                        error!("{}", e);
                        let _ = first_error.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = first_error {
                return Err(e);
            }
        }

        info!(
            "Built {} recipes in {:.2}s",
            outputs.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(plan
            .ids()
            .filter_map(|id| {
                outputs.remove(id).map(|prefix_path| BakedRecipe {
                    id: id.clone(),
                    prefix_path,
                })
            })
            .collect())
    }

    async fn bake(
        &self,
        recipe: &Recipe,
        outputs: &BTreeMap<RecipeId, PathBuf>,
    ) -> Result<PathBuf, ExecutionError> {
        let mut dependency_prefixes = BTreeMap::new();
        for dependency in recipe.dependency_ids() {
            let prefix = outputs.get(&dependency).cloned().ok_or_else(|| {
                ExecutionError::MissingDependencyOutput {
                    recipe: recipe.id.clone(),
                    dependency: dependency.clone(),
                }
            })?;
            let _ = dependency_prefixes.insert(dependency, prefix);
        }

        let source_dir = self.fetcher.fetch(recipe).await?;

        let request = BuildRequest {
            recipe,
            source_dir,
            dependency_prefixes,
            env: self.env.resolve(recipe),
        };
        self.executor.build(request).await
    }
}

/// Fetcher and executor that only log what they would do.
///
/// Paths returned point under `work_dir`; nothing is created on disk.
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    work_dir: PathBuf,
}

impl DryRunExecutor {
    /// Dry run rooted at `work_dir`; nothing is written there
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn dir_name(recipe: &Recipe) -> String {
        format!("{}-{}", recipe.name(), recipe.version())
    }
}

impl SourceFetcher for DryRunExecutor {
    async fn fetch(&self, recipe: &Recipe) -> Result<PathBuf, ExecutionError> {
        let source_dir = self.work_dir.join("sources").join(Self::dir_name(recipe));
        info!("Would fetch {} into {}", recipe.source, source_dir.display());
        Ok(source_dir)
    }
}

impl BuildExecutor for DryRunExecutor {
    async fn build(&self, request: BuildRequest<'_>) -> Result<PathBuf, ExecutionError> {
        let recipe = request.recipe;
        let prefix_path = self.work_dir.join("outputs").join(Self::dir_name(recipe));

        info!(
            "Would build {} with {} in {}",
            recipe.id,
            recipe.build.shell(),
            request.source_dir.display()
        );
        for (dependency, prefix) in &request.dependency_prefixes {
            debug!("  {} from {}", dependency, prefix.display());
        }
        for (name, value) in &request.env {
            debug!("  {}={}", name, value);
        }

        Ok(prefix_path)
    }
}
