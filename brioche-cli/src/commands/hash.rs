//! Hash command: content hashes in build order

use super::{CommandError, LoadedRepo, RepoArgs};
use brioche_recipe::{BuildPlan, RecipeHash};

pub async fn execute(args: &RepoArgs, target: Option<&str>) -> Result<(), CommandError> {
    let repo = LoadedRepo::open(args).await?;
    let plan = repo.plan(target)?;

    print!("{}", render(&plan)?);
    Ok(())
}

fn render(plan: &BuildPlan) -> Result<String, CommandError> {
    let hashes = RecipeHash::compute_all(plan)?;

    let mut out = String::new();
    for id in plan.ids() {
        if let Some(hash) = hashes.get(id) {
            out.push_str(&format!("{hash}  {id}\n"));
        }
    }
    Ok(out)
}
