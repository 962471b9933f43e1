//! Solution CLI entrypoint.
//!
//! This is the main entrypoint for the solution command-line tool.
//! Reports go to stdout; logs and prompts go to stderr.

use std::path::Path;
use std::process::ExitCode;

use solution_reconciler::cli::{Cli, Commands, OutputFormatter, TerminalPrompter};
use solution_reconciler::config::{load_dotenv, Settings};
use solution_reconciler::error::Result;
use solution_reconciler::model::ResourceKind;
use solution_reconciler::reconciler::{ConfirmPolicy, Confirmer, SolutionManager};
use solution_reconciler::remote::HttpEngineClient;
use solution_reconciler::state::{open_store, SolutionLoader, SolutionStore};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_plan_error() {
                eprintln!("Fix the plan document and run the command again.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Plan { spec, state } => cmd_plan(&spec, state.as_deref(), &formatter).await,
        Commands::Apply { spec, state, yes } => cmd_apply(&spec, state.as_deref(), yes, &formatter).await,
        Commands::Destroy { state, yes } => cmd_destroy(state.as_deref(), yes, &formatter).await,
        Commands::Import { kind, id, spec, state } => {
            cmd_import(kind, &id, &spec, state.as_deref(), &formatter).await
        }
    }
}

/// Loads `.env` next to the plan and reads settings.
fn load_settings(spec: Option<&Path>, state: Option<&str>) -> Result<Settings> {
    let dir = spec
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    load_dotenv(dir)?;

    Ok(Settings::from_env()?.with_state(state))
}

/// Creates the engine client from settings.
fn create_engine_client(settings: &Settings) -> Result<HttpEngineClient> {
    let (url, key) = settings.engine_credentials()?;
    debug!("Using engine at {url}");
    HttpEngineClient::with_timeout(url, key, settings.timeout_secs)
}

/// Opens the state store for the given plan path.
async fn open_state_store(settings: &Settings, spec: Option<&Path>) -> Result<Box<dyn SolutionStore>> {
    let location = settings.state_location(spec);
    open_store(&location, settings.s3_region.as_deref()).await
}

/// Show what an apply would change.
async fn cmd_plan(spec: &Path, state: Option<&str>, formatter: &OutputFormatter) -> Result<()> {
    let settings = load_settings(Some(spec), state)?;
    let loader = SolutionLoader::new();
    let plan = loader.load_plan(spec).await?;

    let store = open_state_store(&settings, Some(spec)).await?;
    let current = loader.load_existing_state(store.as_ref()).await?;

    let client = create_engine_client(&settings)?;
    let prompter = TerminalPrompter::new();
    let manager = SolutionManager::new(&client, store.as_ref(), Confirmer::new(ConfirmPolicy::AlwaysAsk, &prompter))?
        .with_duplicate_threshold(settings.duplicate_threshold)
        .with_missing_remote(settings.missing_remote);

    let report = manager.plan(&plan, &current).await?;
    println!("{}", formatter.format_plan(&report)?);

    Ok(())
}

/// Converge the engine to the plan.
async fn cmd_apply(spec: &Path, state: Option<&str>, yes: bool, formatter: &OutputFormatter) -> Result<()> {
    let settings = load_settings(Some(spec), state)?;
    let loader = SolutionLoader::new();
    let plan = loader.load_plan(spec).await?;

    let store = open_state_store(&settings, Some(spec)).await?;
    let prompter = TerminalPrompter::new();
    let confirmer = Confirmer::new(ConfirmPolicy::from_flag(yes), &prompter);
    let current = loader.load_state(store.as_ref(), &plan, &confirmer).await?;

    let client = create_engine_client(&settings)?;
    let manager = SolutionManager::new(&client, store.as_ref(), confirmer)?
        .with_duplicate_threshold(settings.duplicate_threshold)
        .with_missing_remote(settings.missing_remote);

    info!("Applying {} to {}", spec.display(), store.location());
    let (_, summary) = manager.apply(&plan, &current).await?;
    println!("{}", formatter.format_summary("Apply", &summary)?);

    Ok(())
}

/// Delete every plan-owned resource.
async fn cmd_destroy(state: Option<&str>, yes: bool, formatter: &OutputFormatter) -> Result<()> {
    let settings = load_settings(None, state)?;
    let loader = SolutionLoader::new();

    let store = open_state_store(&settings, None).await?;
    if !store.exists().await? {
        eprintln!("No state found at {}. Nothing to destroy.", store.location());
        return Ok(());
    }
    let current = loader.load_existing_state(store.as_ref()).await?;

    let client = create_engine_client(&settings)?;
    let prompter = TerminalPrompter::new();
    let manager = SolutionManager::new(&client, store.as_ref(), Confirmer::new(ConfirmPolicy::from_flag(yes), &prompter))?;

    let (_, summary) = manager.destroy(current).await?;
    println!("{}", formatter.format_summary("Destroy", &summary)?);

    Ok(())
}

/// Adopt an existing engine resource into plan and state.
async fn cmd_import(
    kind: ResourceKind,
    id: &str,
    spec: &Path,
    state: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let settings = load_settings(Some(spec), state)?;
    let loader = SolutionLoader::new();
    let mut plan = loader.load_plan(spec).await?;

    let store = open_state_store(&settings, Some(spec)).await?;
    let mut current = loader.load_existing_state(store.as_ref()).await?;

    let client = create_engine_client(&settings)?;
    let prompter = TerminalPrompter::new();
    let manager = SolutionManager::new(&client, store.as_ref(), Confirmer::new(ConfirmPolicy::AutoYes, &prompter))?;

    let imported = manager.import(kind, id, &mut plan, &mut current).await?;
    if imported {
        loader.save_plan(spec, &plan).await?;
    }
    println!("{}", formatter.format_import(kind, id, imported)?);

    Ok(())
}
