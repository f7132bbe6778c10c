//! Show command: recipe details

use super::{CommandError, LoadedRepo, RepoArgs};
use brioche_recipe::{Recipe, RecipeGraph};

pub async fn execute(args: &RepoArgs, label: &str) -> Result<(), CommandError> {
    let repo = LoadedRepo::open(args).await?;
    let id = repo.resolve(label)?;

    print!("{}", describe(&repo.graph, repo.graph.get(&id)?)?);
    Ok(())
}

fn labels(recipes: &[&Recipe]) -> String {
    if recipes.is_empty() {
        return "(none)".to_string();
    }
    recipes
        .iter()
        .map(|recipe| recipe.id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(graph: &RecipeGraph, recipe: &Recipe) -> Result<String, CommandError> {
    let dependencies = graph.dependencies(&recipe.id)?;
    let dependents = graph.dependents(&recipe.id)?;
    let transitive = graph.transitive_dependencies(&recipe.id)?;

    let mut out = String::new();
    out.push_str(&format!("{}\n", recipe.id));
    out.push_str(&format!("  Source:        {}\n", recipe.source));
    out.push_str(&format!("  Depends on:    {}\n", labels(&dependencies)));
    out.push_str(&format!("  Needed by:     {}\n", labels(&dependents)));
    out.push_str(&format!("  All deps:      {}\n", transitive.len()));
    out.push_str(&format!("  Shell:         {}\n", recipe.build.shell()));

    for (name, value) in recipe.build.env_vars() {
        out.push_str(&format!("  Env:           {name}={value}\n"));
    }

    out.push_str("  Script:\n");
    for line in recipe.build.script().lines() {
        out.push_str(&format!("    {line}\n"));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{args, toolchain_repo};
    use super::*;
    use brioche_recipe::RecipeId;

    #[tokio::test]
    async fn test_describe_gcc() {
        let temp = toolchain_repo();
        let repo = LoadedRepo::open(&args(temp.path())).await.unwrap();
        let gcc = repo.graph.get(&RecipeId::new("gcc", "11.2.0")).unwrap();

        let out = describe(&repo.graph, gcc).unwrap();
        assert!(out.starts_with("gcc@11.2.0\n"));
        assert!(out.contains("  Source:        tarball https://example.org/gcc-11.2.0.tar.gz\n"));
        assert!(out.contains("  Depends on:    binutils@2.37\n"));
        assert!(out.contains("  Needed by:     glibc@2.34\n"));
        assert!(out.contains("  Script:\n    make\n"));
    }

    #[tokio::test]
    async fn test_describe_leaf() {
        let temp = toolchain_repo();
        let repo = LoadedRepo::open(&args(temp.path())).await.unwrap();
        let glibc = repo.graph.get(&RecipeId::new("glibc", "2.34")).unwrap();

        let out = describe(&repo.graph, glibc).unwrap();
        assert!(out.contains("  Needed by:     (none)\n"));
        assert!(out.contains("  All deps:      3\n"));
    }

    #[tokio::test]
    async fn test_show_unknown_recipe() {
        let temp = toolchain_repo();
        let error = execute(&args(temp.path()), "m4").await.unwrap_err();
        assert_eq!(error.to_string(), "Unknown recipe m4");
    }
}
