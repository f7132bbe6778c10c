//! Brioche command-line interface
//!
//! - `check`: Validate every declaration in the repository
//! - `plan`: Print the build order
//! - `show`: Recipe details and reverse dependencies
//! - `hash`: Content hashes in build order
//! - `dry-run`: Walk the plan without building anything

use brioche_recipe::{
    BuildPlan, DEFAULT_RECIPE_FILE, LoaderConfig, RecipeError, RecipeGraph, RecipeId,
    RecipeRepository,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod check;
pub mod dry_run;
pub mod hash;
pub mod plan;
pub mod show;

/// Error type returned by every command
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

/// Brioche - recipe planner for bootstrapping a toolchain from source
#[derive(Parser)]
#[command(name = "brioche")]
#[command(about = "Check, plan and dry-run Brioche recipe repositories")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where recipes come from and how they are loaded
#[derive(clap::Args, Debug, Clone)]
pub struct RepoArgs {
    /// Recipe repository: one sub-directory per recipe
    #[arg(short, long, global = true, default_value = "recipes", env = "BRIOCHE_REPO")]
    pub repo: PathBuf,

    /// Declaration file name inside each recipe directory
    #[arg(long, global = true, default_value = DEFAULT_RECIPE_FILE, env = "BRIOCHE_RECIPE_FILE")]
    pub recipe_file: String,

    /// Allow several versions of one recipe name
    #[arg(long, global = true)]
    pub allow_multiple_versions: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load every declaration, build the graph and plan it
    Check,

    /// Print the build order
    Plan {
        /// Only plan this recipe (NAME or NAME@VERSION) and its dependencies
        target: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
        format: PlanFormat,
    },

    /// Show a recipe, its dependencies and its dependents
    Show {
        /// NAME or NAME@VERSION
        recipe: String,
    },

    /// Print recipe hashes in build order
    Hash {
        /// Only hash this recipe and its dependencies
        target: Option<String>,
    },

    /// Walk the plan stage by stage without fetching or building
    DryRun {
        /// Only run this recipe and its dependencies
        target: Option<String>,

        /// Directory placeholder sources and outputs are reported under
        #[arg(short, long, default_value = "build")]
        work_dir: PathBuf,

        /// Override the bootstrap target triple
        #[arg(long, env = "BRIOCHE_BOOTSTRAP_TARGET")]
        bootstrap_target: Option<String>,
    },
}

/// Output formats of `plan`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanFormat {
    /// Numbered list with stages
    Text,
    /// Machine-readable JSON
    Json,
    /// One line per stage
    Stages,
    /// Just NAME@VERSION labels
    Label,
}

/// A repository loaded into a validated graph
pub struct LoadedRepo {
    pub repository: RecipeRepository,
    pub graph: RecipeGraph,
    pub rejected: Vec<RecipeError>,
}

impl LoadedRepo {
    /// Scan, load and link the repository.
    ///
    /// Malformed declarations are kept in `rejected`; everything else that
    /// goes wrong is an error.
    pub async fn open(args: &RepoArgs) -> Result<Self, CommandError> {
        let repository = RecipeRepository::scan(&args.repo, &args.recipe_file).await?;
        let config = LoaderConfig {
            allow_multiple_versions: args.allow_multiple_versions,
        };
        let loaded = repository.load(&config)?;
        let graph = RecipeGraph::build(loaded.recipes)?;

        Ok(Self {
            repository,
            graph,
            rejected: loaded.rejected,
        })
    }

    /// Resolve a `NAME` or `NAME@VERSION` label.
    pub fn resolve(&self, label: &str) -> Result<RecipeId, RecipeError> {
        self.graph
            .recipes()
            .find_label(label)
            .map(|recipe| recipe.id.clone())
    }

    /// Plan the whole repository, or only `target` and its dependencies.
    pub fn plan(&self, target: Option<&str>) -> Result<BuildPlan, RecipeError> {
        match target {
            Some(label) => BuildPlan::for_target(&self.graph, &self.resolve(label)?),
            None => BuildPlan::new(&self.graph),
        }
    }
}
