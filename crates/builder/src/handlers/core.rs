//! Core types and utilities for build handlers

use crate::environment::{run_shell, BuildDirectories, CommandOutput, ToolchainEnvironment};
use ebs_config::BuildOptions;
use ebs_errors::Error;
use ebs_types::{PackageConfig, SanityCheckPaths, ToolchainSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variables a module file should extend, mapped to install subdirectories
pub type ModuleRequirements = BTreeMap<String, Vec<PathBuf>>;

/// Subdirectories of an install prefix that usually belong on each search path
const MODULE_REQUIREMENT_GUESSES: [(&str, &[&str]); 6] = [
    ("PATH", &["bin"]),
    ("LD_LIBRARY_PATH", &["lib", "lib64"]),
    ("LIBRARY_PATH", &["lib", "lib64"]),
    ("CPATH", &["include"]),
    ("MANPATH", &["man", "share/man"]),
    ("PKG_CONFIG_PATH", &["lib/pkgconfig", "share/pkgconfig"]),
];

/// Per-package state shared by all lifecycle steps
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Absolute install prefix, must exist before configure
    pub install_dir: PathBuf,
    /// Scratch directory for this package
    pub build_dir: PathBuf,
    /// Root of the unpacked sources
    pub start_dir: PathBuf,
    /// Directory subprocesses run in; configure may move it into a separate build dir
    pub work_dir: PathBuf,
    /// Process-wide options, read-only
    pub options: BuildOptions,
    /// Toolchain the package is built with
    pub toolchain: ToolchainSpec,
    /// Variables visible to subprocesses of this package
    pub env: ToolchainEnvironment,
}

impl BuildContext {
    /// Create a context that builds in place in `start_dir`
    #[must_use]
    pub fn new(
        install_dir: PathBuf,
        build_dir: PathBuf,
        start_dir: PathBuf,
        options: BuildOptions,
    ) -> Self {
        Self {
            install_dir,
            build_dir,
            work_dir: start_dir.clone(),
            start_dir,
            options,
            toolchain: ToolchainSpec::default(),
            env: ToolchainEnvironment::new(),
        }
    }

    /// Create the context for a package from its prepared directories
    ///
    /// The package's `start_dir`, if any, is resolved against `source_root`,
    /// and the toolchain's flag variables are exported into `env`.
    #[must_use]
    pub fn for_package(
        dirs: &BuildDirectories,
        source_root: &Path,
        package: &PackageConfig,
        options: BuildOptions,
        mut env: ToolchainEnvironment,
    ) -> Self {
        let start_dir = match &package.start_dir {
            Some(sub) => source_root.join(sub),
            None => source_root.to_path_buf(),
        };
        env.apply_toolchain(&package.toolchain);

        Self::new(
            dirs.install_dir.clone(),
            dirs.build_dir.clone(),
            start_dir,
            options,
        )
        .with_toolchain(package.toolchain.clone())
        .with_env(env)
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain: ToolchainSpec) -> Self {
        self.toolchain = toolchain;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: ToolchainEnvironment) -> Self {
        self.env = env;
        self
    }

    /// Ordered values of a toolchain variable
    #[must_use]
    pub fn toolchain_variable(&self, name: &str) -> &[String] {
        self.toolchain.get_variable(name)
    }

    /// Run a command line in `work_dir` with this package's environment, logging everything
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be spawned.
    pub async fn run(&self, command: &str) -> Result<CommandOutput, Error> {
        run_shell(command, &self.work_dir, &self.env, true).await
    }
}

/// Outcome of a sanity check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanityCheckReport {
    /// Entries that were not satisfied, rendered as `a|b` for alternatives
    pub missing: Vec<String>,
}

impl SanityCheckReport {
    /// A report with nothing missing
    #[must_use]
    pub fn passed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check that every declared file and directory exists below `install_dir`
///
/// Files must be regular files and directories must be non-empty. An entry
/// with alternatives is satisfied by any one of them.
pub async fn check_sanity_paths(install_dir: &Path, paths: &SanityCheckPaths) -> SanityCheckReport {
    let mut missing = Vec::new();

    for entry in &paths.files {
        let mut found = false;
        for alt in entry.alternatives() {
            if is_file(&install_dir.join(alt)).await {
                found = true;
                break;
            }
        }
        if !found {
            missing.push(entry.to_string());
        }
    }

    for entry in &paths.dirs {
        let mut found = false;
        for alt in entry.alternatives() {
            if is_non_empty_dir(&install_dir.join(alt)).await {
                found = true;
                break;
            }
        }
        if !found {
            missing.push(entry.to_string());
        }
    }

    SanityCheckReport { missing }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

async fn is_non_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

/// Guess module requirements from the subdirectories present in `install_dir`
#[must_use]
pub fn guess_module_requirements(install_dir: &Path) -> ModuleRequirements {
    let mut reqs = ModuleRequirements::new();
    for (var, subdirs) in MODULE_REQUIREMENT_GUESSES {
        let present: Vec<PathBuf> = subdirs
            .iter()
            .map(PathBuf::from)
            .filter(|sub| install_dir.join(sub).is_dir())
            .collect();
        if !present.is_empty() {
            reqs.insert(var.to_string(), present);
        }
    }
    reqs
}
