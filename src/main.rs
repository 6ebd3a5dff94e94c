//! mlops-infra - Main entry point
//!
//! Parses the command line, layers the `.env` file under the process
//! environment and hands off to the orchestrator.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mlops_infra::cli::{Cli, Commands};
use mlops_infra::config::Overrides;
use mlops_infra::logic::resolver;
use mlops_infra::modules::{self, Module, ProjectLayout};
use mlops_infra::orchestrator::Orchestrator;
use mlops_infra::outputs::OutputStore;
use mlops_infra::preflight;
use mlops_infra::process_guard;
use mlops_infra::tool_runner::ProcessRunner;

/// Log to stderr; `RUST_LOG` overrides the default `info` level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    // Terraform must not keep running with a held state lock after we die
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut layout = ProjectLayout::new(&cli.project_root);
    if let Some(dir) = &cli.terraform_dir {
        layout = layout.with_terraform_dir(dir);
    }
    let env_file: PathBuf = cli
        .env_file
        .clone()
        .unwrap_or_else(|| layout.root.join(".env"));
    let overrides = Overrides::from_process_env()
        .with_env_file(&env_file)
        .with_context(|| format!("Failed to load {}", env_file.display()))?;
    debug!(ci = overrides.is_ci(), dry_run = cli.dry_run, "Configuration loaded");

    match &cli.command {
        Commands::Modules => {
            print_modules(overrides.is_ci());
            Ok(())
        }
        Commands::Vars { module } => {
            let outputs = OutputStore::new(&layout.terraform_dir);
            let resolved = resolver::resolve(*module, &overrides, &outputs)?;
            print!("{}", resolved.to_tfvars());
            Ok(())
        }
        Commands::Deploy { .. } => {
            let options = cli.command.deploy_options().context("not a deploy command")?;
            let runner = ProcessRunner::new(&overrides, cli.dry_run);
            let plan = options.plan(overrides.is_ci());
            if !plan.is_empty() {
                preflight::verify(&runner, &layout, &plan).into_result()?;
            }

            let mut orchestrator = Orchestrator::new(&layout, &overrides, &runner);
            let result = orchestrator.deploy(&options);
            print_report(&orchestrator);
            result.context("Deploy failed")?;
            info!("Deploy finished");
            Ok(())
        }
        Commands::Destroy { .. } => {
            let options = cli.command.destroy_options().context("not a destroy command")?;
            let runner = ProcessRunner::new(&overrides, cli.dry_run);
            preflight::verify(&runner, &layout, &options.plan()).into_result()?;

            let mut orchestrator = Orchestrator::new(&layout, &overrides, &runner);
            let result = orchestrator.destroy(&options);
            print_report(&orchestrator);
            result.context("Destroy failed")?;
            info!("Destroy finished");
            Ok(())
        }
    }
}

fn print_report(orchestrator: &Orchestrator<'_>) {
    let report = orchestrator.report();
    if !report.is_empty() {
        println!("{report}");
    }
}

fn print_modules(ci: bool) {
    let line = |module: Module| println!("  {:<34} {}", module.dir_name(), module.description());

    println!("Deploy order{}:", if ci { " (CI)" } else { "" });
    modules::deploy_plan(ci, None).into_iter().for_each(line);
    println!();
    println!("Destroy order (00_backend only with --destroy-backend):");
    modules::destroy_plan(true, None).into_iter().for_each(line);
}
