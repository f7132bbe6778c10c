//! Plan command: print the build order

use super::{CommandError, LoadedRepo, PlanFormat, RepoArgs};
use brioche_recipe::BuildPlan;
use serde_json::json;

pub async fn execute(
    args: &RepoArgs,
    target: Option<&str>,
    format: PlanFormat,
) -> Result<(), CommandError> {
    let repo = LoadedRepo::open(args).await?;
    let plan = repo.plan(target)?;

    print!("{}", render(&plan, format)?);
    Ok(())
}

/// Format a plan for printing
pub fn render(plan: &BuildPlan, format: PlanFormat) -> Result<String, CommandError> {
    let mut out = String::new();

    match format {
        PlanFormat::Text => {
            if let Some(target) = plan.target() {
                out.push_str(&format!("Build plan for {target}:\n"));
            } else {
                out.push_str("Build plan:\n");
            }
            for (index, recipe) in plan.iter().enumerate() {
                let stage = plan.stage_of(&recipe.id).unwrap_or_default();
                out.push_str(&format!(
                    "  {:>3}. [stage {}] {}\n",
                    index + 1,
                    stage,
                    recipe.id
                ));
            }
            out.push_str(&format!(
                "\n{} recipes in {} stages\n",
                plan.len(),
                plan.stages().len()
            ));
        }
        PlanFormat::Json => {
            let steps: Vec<_> = plan
                .iter()
                .map(|recipe| {
                    json!({
                        "name": recipe.name(),
                        "version": recipe.version(),
                        "stage": plan.stage_of(&recipe.id),
                        "source": recipe.source,
                        "dependencies": recipe.dependencies,
                    })
                })
                .collect();
            out.push_str(&serde_json::to_string_pretty(&json!({
                "target": plan.target().map(ToString::to_string),
                "steps": steps,
            }))?);
            out.push('\n');
        }
        PlanFormat::Stages => {
            for (index, stage) in plan.stages().into_iter().enumerate() {
                let labels: Vec<String> = stage.iter().map(|recipe| recipe.id.to_string()).collect();
                out.push_str(&format!("{index}: {}\n", labels.join(" ")));
            }
        }
        PlanFormat::Label => {
            for id in plan.ids() {
                out.push_str(&format!("{id}\n"));
            }
        }
    }

    Ok(out)
}
