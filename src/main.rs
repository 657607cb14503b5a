use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repomirror::{Config, ConfigError, GitCli, GitHubClient, SyncAction, SyncEngine};

#[derive(Parser)]
#[command(name = "repomirror")]
#[command(about = "Mirror every repository of a GitHub account into a local directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to ./config.ini, then the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone new repositories and update existing mirrors (default)
    Sync {
        /// Show what would be cloned or updated without running git
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of git operations running at once
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },

    /// List repositories with the action a sync would take
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ConfigError>() {
                // Printed as-is: this message is part of the console output
                Some(err @ ConfigError::TargetNotFound(_)) => println!("{}", err),
                Some(err) => eprintln!("Error: {}", err),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting repomirror v{}", env!("CARGO_PKG_VERSION"));

    let config_path = Config::resolve_path(cli.config)?;
    let config = Config::load(&config_path)?;

    match cli.command.unwrap_or(Commands::Sync {
        dry_run: false,
        jobs: 1,
    }) {
        Commands::Sync { dry_run, jobs } => cmd_sync(&config, dry_run, jobs).await,
        Commands::List => cmd_list(&config).await,
    }
}

/// Mirror repositories according to configuration
async fn cmd_sync(config: &Config, dry_run: bool, jobs: usize) -> Result<()> {
    let github = GitHubClient::new(&config.auth, &config.api)?;
    let repos = github.list_user_repositories().await?;

    let engine = SyncEngine::new(&config.target, GitCli::new()).with_jobs(jobs);

    if dry_run {
        let (included, excluded) = config.target.filter.partition(repos);
        let plan = engine.plan(&included);

        for entry in &plan {
            let verb = match entry.action {
                SyncAction::Clone => "clone",
                SyncAction::Fetch => "update",
            };
            println!("→ Would {} {}", verb, entry.repo.full_name);
        }
        println!(
            "\nWould sync {} repos ({} excluded)",
            plan.len(),
            excluded.len()
        );
        return Ok(());
    }

    let summary = engine.run(repos, &config.target.filter).await?;

    println!("Successfully cloned {} repos", summary.processed);

    Ok(())
}

/// List repositories that would be synced
async fn cmd_list(config: &Config) -> Result<()> {
    let github = GitHubClient::new(&config.auth, &config.api)?;
    let repos = github.list_user_repositories().await?;

    let engine = SyncEngine::new(&config.target, GitCli::new());
    let (included, excluded) = config.target.filter.partition(repos);

    println!("Repositories ({}):", included.len() + excluded.len());

    for entry in engine.plan(&included) {
        let state = match entry.action {
            SyncAction::Clone => "clone",
            SyncAction::Fetch => "update",
        };
        println!("  {:<8} {}", state, entry.repo.full_name);
    }
    for repo in &excluded {
        println!("  {:<8} {}", "excluded", repo.full_name);
    }

    Ok(())
}
