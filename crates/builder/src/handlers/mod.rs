//! Build handler abstraction and implementations
//!
//! Every build-system family (configure/make, CMake, nothing at all) is a
//! [`BuildHandler`]. The orchestrator only sees the trait, so a handler is
//! free to turn any step into a no-op.

use async_trait::async_trait;
use ebs_errors::{BuildError, Error};
use ebs_types::PackageConfig;
use std::path::Path;

mod cmake_make;
mod configure_make;
mod core;
mod toolkit;

pub use crate::environment::CommandOutput;
pub use cmake_make::{
    env_to_cmake_options, CMakeConfigurePlan, CMakeMakeHandler, ENV_TO_CMAKE_OPTIONS,
    SEPARATE_BUILD_DIR_NAME,
};
pub use configure_make::ConfigureMakeHandler;
pub use self::core::{
    check_sanity_paths, guess_module_requirements, BuildContext, ModuleRequirements,
    SanityCheckReport,
};
pub use toolkit::ToolkitHandler;

/// Lifecycle every package handler implements
#[async_trait]
pub trait BuildHandler: Send + Sync {
    /// Handler name as used in package definitions
    fn name(&self) -> &'static str;

    /// Package this handler builds
    fn package(&self) -> &PackageConfig;

    /// Configure phase; may move `ctx.work_dir` and export variables into `ctx.env`
    async fn configure(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error>;

    /// Build phase
    async fn build(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error>;

    /// Install phase
    async fn install(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error>;

    /// Verify the install directory after install
    async fn sanity_check(&self, ctx: &BuildContext) -> Result<SanityCheckReport, Error>;

    /// Environment variables the package's module file should extend
    fn module_requirements(&self, ctx: &BuildContext) -> ModuleRequirements;
}

/// Constructor for a boxed handler
pub type HandlerFactory = fn(PackageConfig) -> Box<dyn BuildHandler>;

/// Registry of available build handlers, keyed by name
pub struct HandlerRegistry {
    handlers: Vec<(&'static str, HandlerFactory)>,
}

impl HandlerRegistry {
    /// Create a new registry with all supported handlers
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: vec![
                (
                    ConfigureMakeHandler::NAME,
                    ConfigureMakeHandler::boxed as HandlerFactory,
                ),
                (CMakeMakeHandler::NAME, CMakeMakeHandler::boxed as HandlerFactory),
                (ToolkitHandler::NAME, ToolkitHandler::boxed as HandlerFactory),
            ],
        }
    }

    /// Register an additional handler; a later registration shadows an earlier one
    pub fn register(&mut self, name: &'static str, factory: HandlerFactory) {
        self.handlers.insert(0, (name, factory));
    }

    /// Names of all registered handlers
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for (name, _) in &self.handlers {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(*name);
            }
        }
        names
    }

    /// Instantiate a handler by name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownHandler` if no handler has that name.
    pub fn create(&self, name: &str, package: PackageConfig) -> Result<Box<dyn BuildHandler>, Error> {
        self.handlers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, factory)| factory(package))
            .ok_or_else(|| {
                BuildError::UnknownHandler {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Detect which handler fits an unpacked source tree
    ///
    /// # Errors
    ///
    /// Returns `BuildError::NoHandlerDetected` if neither a `CMakeLists.txt`
    /// nor a `configure` script is present.
    pub async fn detect(source_dir: &Path) -> Result<&'static str, Error> {
        if tokio::fs::try_exists(source_dir.join("CMakeLists.txt"))
            .await
            .unwrap_or(false)
        {
            return Ok(CMakeMakeHandler::NAME);
        }
        if tokio::fs::try_exists(source_dir.join("configure"))
            .await
            .unwrap_or(false)
        {
            return Ok(ConfigureMakeHandler::NAME);
        }

        Err(BuildError::NoHandlerDetected {
            path: source_dir.display().to_string(),
        }
        .into())
    }

    /// Instantiate the handler a package asks for, detecting it when set to `auto`
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or detection fails.
    pub async fn resolve(
        &self,
        package: PackageConfig,
        source_dir: &Path,
    ) -> Result<Box<dyn BuildHandler>, Error> {
        if package.easyblock.eq_ignore_ascii_case("auto") {
            let name = Self::detect(source_dir).await?;
            tracing::info!(
                package = %package.full_name(),
                handler = name,
                "detected build handler"
            );
            self.create(name, package)
        } else {
            let name = package.easyblock.clone();
            self.create(&name, package)
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
