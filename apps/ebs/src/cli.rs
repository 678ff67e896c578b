//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use ebs_types::OutputFormat;
use std::path::PathBuf;

/// ebs - build orchestrator for CMake, configure/make and toolkit packages
#[derive(Parser)]
#[command(name = "ebs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build orchestrator for CMake, configure/make and toolkit packages")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Args)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (overrides the configured default)
    #[arg(long, global = true, value_enum, conflicts_with = "json")]
    pub output: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Configure, build, install and sanity check a package
    Build(BuildArgs),

    /// Print the cmake configure step for a CMakeMake package without running it
    Plan(BuildArgs),

    /// List registered build handlers
    Handlers,
}

/// Package selection and build option overrides
#[derive(Args)]
pub struct BuildArgs {
    /// Path to the package definition (.toml)
    pub package: PathBuf,

    /// Extracted source tree of the package
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Leave RPATH handling to the post-install step
    #[arg(long)]
    pub rpath: bool,

    /// Number of parallel make jobs
    #[arg(long, short = 'j', value_name = "N")]
    pub parallel: Option<usize>,

    /// Root for per-package install directories
    #[arg(long, value_name = "DIR")]
    pub install_path: Option<PathBuf>,

    /// Root for per-package build directories
    #[arg(long, value_name = "DIR")]
    pub build_path: Option<PathBuf>,
}

impl Commands {
    pub fn build_args(&self) -> Option<&BuildArgs> {
        match self {
            Self::Build(args) | Self::Plan(args) => Some(args),
            Self::Handlers => None,
        }
    }
}
