use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use foreman::agents::{HttpCoderClient, HttpPlannerClient};
use foreman::config::ForemanConfig;
use foreman::error::Result;
use foreman::orchestrator::{StartRequest, WebhookBridge};
use foreman::persistence::JsonFileStore;
use foreman::project::{ProjectRegistry, RepoRef, TenantFilter};
use foreman::release::{EasReleaseRunner, NoopReleaseRunner, ReleaseRunner};
use foreman::verification::{GitProjectVerifier, VerificationEngine};

#[derive(Parser)]
#[command(name = "foreman", about = "Idea-to-release orchestration of a planning agent and a coding agent", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config.toml
    #[arg(short, long, global = true, default_value = ".foreman/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rehydrate persisted projects and wait for webhook delivery by an
    /// external transport
    Serve,
    /// Start one project from an idea
    Start {
        /// The product idea
        idea: String,
        /// Target repository (owner/name or full URL)
        #[arg(short, long)]
        repo: String,
        /// Working branch
        #[arg(short, long, default_value = "main")]
        branch: String,
        /// Autonomy mode: assist, builder, or autopilot
        #[arg(short, long)]
        mode: Option<String>,
        /// Ask the planning agent for a task breakdown first
        #[arg(long)]
        plan: bool,
    },
    /// List known projects
    Status,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("foreman=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foreman=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = ForemanConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Serve => cmd_serve(config).await,
        Commands::Start {
            idea,
            repo,
            branch,
            mode,
            plan,
        } => cmd_start(config, idea, repo, branch, mode, plan).await,
        Commands::Status => cmd_status(config).await,
        Commands::Config => cmd_config(config),
    }
}

/// Composition root: every collaborator is constructed here and injected,
/// never reached through globals.
async fn build_bridge(config: ForemanConfig) -> Result<WebhookBridge> {
    let registry = Arc::new(ProjectRegistry::new());

    let store = JsonFileStore::new(&config.orchestrator.state_dir);
    store.init().await?;

    let coder = Arc::new(HttpCoderClient::new(config.coder.clone()));
    let planner = Arc::new(HttpPlannerClient::new(config.planner.clone()));
    let verifier = Arc::new(GitProjectVerifier::new(VerificationEngine::new(
        config.verification.clone(),
    )));
    let release: Arc<dyn ReleaseRunner> = if config.release.enabled {
        Arc::new(EasReleaseRunner::new(config.release.clone()))
    } else {
        Arc::new(NoopReleaseRunner)
    };

    Ok(WebhookBridge::new(
        registry,
        Arc::new(store),
        coder,
        planner,
        verifier,
        release,
        config,
    ))
}

async fn cmd_serve(config: ForemanConfig) -> Result<()> {
    let bridge = build_bridge(config).await?;
    let count = bridge.hydrate().await?;
    info!(projects = count, "Registry hydrated, engine ready");

    // The HTTP transport is an external collaborator; it delivers validated
    // webhook bodies into the bridge. Here we only hold the engine open.
    println!("foreman engine ready ({} projects). Press Ctrl-C to stop.", count);
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

async fn cmd_start(
    config: ForemanConfig,
    idea: String,
    repo: String,
    branch: String,
    mode: Option<String>,
    plan: bool,
) -> Result<()> {
    let mode = mode.map(|m| m.parse()).transpose()?;
    let bridge = build_bridge(config).await?;
    bridge.hydrate().await?;

    let outcome = bridge
        .start_project(StartRequest {
            idea,
            repository: RepoRef::new(repo).with_branch(branch),
            proposed_tasks: Vec::new(),
            mode,
            max_iterations: None,
            credentials: None,
            tenant: None,
            request_plan: plan,
        })
        .await?;

    match &outcome.project_id {
        Some(id) => {
            println!("project started: {}", id);
            println!(
                "approved tasks: {} (postponed {})",
                outcome.decision.approved_tasks.len(),
                outcome.decision.postponed_tasks.len()
            );
        }
        None if outcome.decision.approved_tasks.is_empty() => {
            println!("proposal rejected:");
            for reason in &outcome.decision.rejected_reasons {
                println!("  - {}", reason);
            }
        }
        None => {
            println!("assist mode: suggested tasks, nothing dispatched:");
            for task in &outcome.decision.approved_tasks {
                println!("  - {}: {}", task.id, task.title);
            }
        }
    }
    for entry in &outcome.decision.reasoning_log {
        println!("  [{}] {} (confidence {:.2})", entry.rule, entry.output, entry.confidence);
    }
    Ok(())
}

async fn cmd_status(config: ForemanConfig) -> Result<()> {
    let store = JsonFileStore::new(&config.orchestrator.state_dir);
    store.init().await?;
    let registry = ProjectRegistry::new();
    registry.hydrate(foreman::persistence::ProjectStore::load_all(&store).await?);

    let projects = registry.list(&TenantFilter::default());
    if projects.is_empty() {
        println!("no projects");
        return Ok(());
    }
    for p in projects {
        println!(
            "{}  {:<18} task {}/{}  iteration {}/{}  {}",
            p.id, p.status, p.current_index, p.task_count, p.iteration, p.max_iterations, p.idea
        );
    }
    Ok(())
}

fn cmd_config(config: ForemanConfig) -> Result<()> {
    let shown = config.redacted();
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| foreman::ForemanError::Config(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
