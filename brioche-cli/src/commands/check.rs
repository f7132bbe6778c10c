//! Check command: validate a recipe repository

use super::{CommandError, LoadedRepo, RepoArgs};
use brioche_recipe::{BuildPlan, RecipeError};

/// Load the repository, link and plan it, and report what was found.
///
/// Fails if any declaration was rejected, after listing all of them.
pub async fn execute(args: &RepoArgs) -> Result<(), CommandError> {
    let repo = LoadedRepo::open(args).await?;
    let plan = BuildPlan::new(&repo.graph)?;

    print!("{}", report(&repo, &plan));

    if repo.rejected.is_empty() {
        Ok(())
    } else {
        Err(RecipeError::Rejected(repo.rejected).into())
    }
}

fn report(repo: &LoadedRepo, plan: &BuildPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("Repository:     {}\n", repo.repository.root.display()));
    out.push_str(&format!(
        "Declarations:   {}\n",
        repo.repository.files.len() + repo.repository.rejected.len()
    ));
    out.push_str(&format!("Recipes:        {}\n", repo.graph.len()));
    out.push_str(&format!("Stages:         {}\n", plan.stages().len()));
    out.push_str(&format!(
        "Checksum:       {}\n",
        repo.repository.combined_checksum()
    ));

    if !repo.rejected.is_empty() {
        out.push_str(&format!("\nRejected ({}):\n", repo.rejected.len()));
        for error in &repo.rejected {
            out.push_str(&format!("  {error}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::super::testing::{args, toolchain_repo, write};
    use super::*;

    #[tokio::test]
    async fn test_check_valid_repo() {
        let temp = toolchain_repo();
        execute(&args(temp.path())).await.unwrap();

        let repo = LoadedRepo::open(&args(temp.path())).await.unwrap();
        let plan = BuildPlan::new(&repo.graph).unwrap();
        let report = report(&repo, &plan);
        assert!(report.contains("Recipes:        4\n"));
        assert!(report.contains("Stages:         3\n"));
        assert!(!report.contains("Rejected"));
    }

    #[tokio::test]
    async fn test_check_reports_rejected() {
        let temp = toolchain_repo();
        write(temp.path(), "broken", "name: broken\n");

        let result = execute(&args(temp.path())).await;
        assert!(result.is_err());

        let repo = LoadedRepo::open(&args(temp.path())).await.unwrap();
        let plan = BuildPlan::new(&repo.graph).unwrap();
        let report = report(&repo, &plan);
        assert!(report.contains("Declarations:   5\n"));
        assert!(report.contains("Rejected (1):"));
        assert!(report.contains("missing required field `version`"));
    }

    #[tokio::test]
    async fn test_check_unresolved_dependency() {
        let temp = toolchain_repo();
        write(
            temp.path(),
            "m4",
            "name: m4\nversion: \"1.4.19\"\nsource:\n  tarball: https://example.org/m4.tar.gz\ndependencies:\n  glibc: \"2.35\"\nbuild: make\n",
        );

        let error = execute(&args(temp.path())).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Recipe m4@1.4.19 depends on glibc@2.35, which is not loaded"
        );
    }
}
