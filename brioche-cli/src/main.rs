//! Brioche - plans bootstrap builds from recipe declarations
//!
//! 1. Scan a recipe repository (`recipes/<dir>/brioche.yml`)
//! 2. Validate declarations and link dependencies
//! 3. Plan the build, stage by stage
//! 4. Report plans and hashes, or walk the plan in a dry run

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "brioche=debug,brioche_recipe=debug"
    } else {
        "brioche=info,brioche_recipe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Check => commands::check::execute(&cli.repo).await,
        Commands::Plan { target, format } => {
            commands::plan::execute(&cli.repo, target.as_deref(), *format).await
        }
        Commands::Show { recipe } => commands::show::execute(&cli.repo, recipe).await,
        Commands::Hash { target } => commands::hash::execute(&cli.repo, target.as_deref()).await,
        Commands::DryRun {
            target,
            work_dir,
            bootstrap_target,
        } => {
            commands::dry_run::execute(
                &cli.repo,
                target.as_deref(),
                work_dir,
                bootstrap_target.as_deref(),
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
