//! Dry-run command: walk a plan without building

use super::{CommandError, LoadedRepo, RepoArgs};
use brioche_recipe::env::BOOTSTRAP_TARGET_VAR;
use brioche_recipe::{BakedRecipe, BuildEnv, BuildPlan, DryRunExecutor, PlanRunner};
use std::path::Path;
use tracing::info;

pub async fn execute(
    args: &RepoArgs,
    target: Option<&str>,
    work_dir: &Path,
    bootstrap_target: Option<&str>,
) -> Result<(), CommandError> {
    let repo = LoadedRepo::open(args).await?;
    let plan = repo.plan(target)?;

    let baked = run(&plan, work_dir, bootstrap_target).await?;

    println!();
    for recipe in &baked {
        println!("  {} -> {}", recipe.id, recipe.prefix_path.display());
    }
    println!("\n{} recipes would be built", baked.len());

    Ok(())
}

async fn run(
    plan: &BuildPlan,
    work_dir: &Path,
    bootstrap_target: Option<&str>,
) -> Result<Vec<BakedRecipe>, CommandError> {
    let mut env = BuildEnv::host();
    if let Some(triple) = bootstrap_target {
        env.bootstrap_target = triple.to_string();
    }
    info!("Dry run with {}={}", BOOTSTRAP_TARGET_VAR, env.bootstrap_target);

    let executor = DryRunExecutor::new(work_dir);
    let runner = PlanRunner::new(&executor, &executor, env);
    Ok(runner.run(plan).await?)
}
