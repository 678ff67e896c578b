#![deny(clippy::pedantic, unsafe_code)]

//! ebs - build orchestrator for CMake, configure/make and toolkit packages
//!
//! Loads a package definition, resolves its build handler and drives it
//! through configure, build, install and sanity check.

mod cli;
mod display;
mod error;

use crate::cli::{BuildArgs, Cli, Commands, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use clap::Parser;
use ebs_builder::{HandlerRegistry, Orchestrator, ToolchainEnvironment};
use ebs_config::Config;
use ebs_errors::Error;
use ebs_types::{OutputFormat, PackageConfig};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.json, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting ebs v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: file (or defaults) < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(args) = cli.command.build_args() {
        apply_cli_config(&mut config, args);
    }

    let renderer = OutputRenderer::new(output_format(&config, &cli.global));

    match cli.command {
        Commands::Build(args) => {
            let package = PackageConfig::load_from_file(&args.package).await?;
            let source = source_root(&args).await?;
            info!(package = %package.full_name(), source = %source.display(), "building package");

            let orchestrator = Orchestrator::from_config(&config);
            let report = orchestrator
                .build_package(package, &source, ToolchainEnvironment::from_process())
                .await?;
            renderer.render_build_report(&report)?;
        }
        Commands::Plan(args) => {
            let package = PackageConfig::load_from_file(&args.package).await?;
            let source = source_root(&args).await?;

            let orchestrator = Orchestrator::from_config(&config);
            let plan = orchestrator
                .plan_cmake(&package, &source, ToolchainEnvironment::from_process())
                .await?;
            renderer.render_plan(&package, &plan)?;
        }
        Commands::Handlers => {
            renderer.render_handlers(&HandlerRegistry::new().names())?;
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Apply CLI flags on top of file and environment configuration
fn apply_cli_config(config: &mut Config, args: &BuildArgs) {
    if args.rpath {
        config.build.rpath = true;
    }
    if let Some(parallel) = args.parallel {
        config.build.parallel = parallel;
    }
    if let Some(path) = &args.install_path {
        config.paths.install_path = Some(path.clone());
    }
    if let Some(path) = &args.build_path {
        config.paths.build_path = Some(path.clone());
    }
}

fn output_format(config: &Config, global: &GlobalArgs) -> OutputFormat {
    if global.json {
        OutputFormat::Json
    } else {
        global.output.unwrap_or(config.general.default_output)
    }
}

/// Absolute path of the source tree
///
/// cmake receives the start directory as its source argument from inside a
/// separate build directory, so a relative path would resolve wrongly.
async fn source_root(args: &BuildArgs) -> Result<PathBuf, Error> {
    tokio::fs::canonicalize(&args.source)
        .await
        .map_err(|e| Error::io_with_path(&e, &args.source))
}

fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let default_level = if debug_enabled_flag { "debug" } else { "info" };
    let filter = if debug_enabled_flag {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    // Logs go to stderr so rendered results on stdout stay machine-readable
    if json_mode {
        let _ = tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init();
    }
}
