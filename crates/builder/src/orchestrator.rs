//! Lifecycle orchestration
//!
//! Drives one package through `configure → build → install → sanity check`.
//! Steps run strictly in sequence and the first error aborts the package.

use crate::environment::{BuildDirectories, ToolchainEnvironment};
use crate::handlers::{
    BuildContext, BuildHandler, CMakeConfigurePlan, CMakeMakeHandler, HandlerRegistry,
};
use ebs_config::{BuildOptions, Config};
use ebs_errors::{BuildError, Error};
use ebs_types::{BuildReport, PackageConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One step of the build lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Configure,
    Build,
    Install,
    SanityCheck,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Build => write!(f, "build"),
            Self::Install => write!(f, "install"),
            Self::SanityCheck => write!(f, "sanity_check"),
        }
    }
}

/// Run every lifecycle step of `handler` against `ctx`
///
/// # Errors
///
/// Propagates the first step error unchanged; a sanity report with missing
/// paths becomes `BuildError::SanityCheckFailed`.
pub async fn run_lifecycle(
    handler: &dyn BuildHandler,
    ctx: &mut BuildContext,
) -> Result<BuildReport, Error> {
    let started = Instant::now();
    let package = handler.package();
    let full_name = package.full_name();

    log_step(&full_name, handler, LifecycleStep::Configure);
    let configure_output = handler.configure(ctx).await?.map(|out| out.stdout);

    log_step(&full_name, handler, LifecycleStep::Build);
    handler.build(ctx).await?;

    log_step(&full_name, handler, LifecycleStep::Install);
    handler.install(ctx).await?;

    log_step(&full_name, handler, LifecycleStep::SanityCheck);
    let report = handler.sanity_check(ctx).await?;
    if !report.is_ok() {
        return Err(BuildError::SanityCheckFailed {
            package: full_name,
            missing: report.missing,
        }
        .into());
    }

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(package = %full_name, duration_ms, "package built");

    Ok(BuildReport {
        package: package.name.clone(),
        version: package.version.clone(),
        handler: handler.name().to_string(),
        install_dir: ctx.install_dir.clone(),
        duration_ms,
        configure_output,
        module_requirements: handler.module_requirements(ctx),
    })
}

fn log_step(package: &str, handler: &dyn BuildHandler, step: LifecycleStep) {
    tracing::info!(package, handler = handler.name(), step = %step, "starting step");
}

/// Builds packages with the configured roots, options and handler registry
pub struct Orchestrator {
    registry: HandlerRegistry,
    options: BuildOptions,
    install_root: PathBuf,
    build_root: PathBuf,
}

impl Orchestrator {
    #[must_use]
    pub fn new(options: BuildOptions, install_root: PathBuf, build_root: PathBuf) -> Self {
        Self {
            registry: HandlerRegistry::new(),
            options,
            install_root,
            build_root,
        }
    }

    /// Create an orchestrator from the merged configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.build_options(),
            config.install_path(),
            config.build_path(),
        )
    }

    #[must_use]
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Build one package from its unpacked sources
    ///
    /// `env` is the environment the package's subprocesses start from,
    /// normally [`ToolchainEnvironment::from_process`].
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be prepared, no handler matches,
    /// or any lifecycle step fails.
    pub async fn build_package(
        &self,
        package: PackageConfig,
        source_root: &Path,
        env: ToolchainEnvironment,
    ) -> Result<BuildReport, Error> {
        let dirs = BuildDirectories::prepare(&self.install_root, &self.build_root, &package).await?;
        let mut ctx = BuildContext::for_package(&dirs, source_root, &package, self.options, env);

        let handler = self.registry.resolve(package, &ctx.start_dir).await?;

        run_lifecycle(handler.as_ref(), &mut ctx).await
    }

    /// Compute the cmake configure step for a package without running anything
    ///
    /// The package's handler is resolved first, detecting it for `auto`.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::NoConfigurePlan` if the package is not built with
    /// the cmake handler, or an error if the handler cannot be resolved or the
    /// directory roots cannot be made absolute.
    pub async fn plan_cmake(
        &self,
        package: &PackageConfig,
        source_root: &Path,
        env: ToolchainEnvironment,
    ) -> Result<CMakeConfigurePlan, Error> {
        let dirs = BuildDirectories::for_package(&self.install_root, &self.build_root, package)?;
        let ctx = BuildContext::for_package(&dirs, source_root, package, self.options, env);

        let handler = self.registry.resolve(package.clone(), &ctx.start_dir).await?;
        if !handler.name().eq_ignore_ascii_case(CMakeMakeHandler::NAME) {
            return Err(BuildError::NoConfigurePlan {
                package: package.full_name(),
                handler: handler.name().to_string(),
            }
            .into());
        }

        Ok(CMakeMakeHandler::new(package.clone()).plan(&ctx, None, None))
    }
}
