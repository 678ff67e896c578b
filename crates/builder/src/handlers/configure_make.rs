//! Generic `configure && make && make install` handler

use super::core::{check_sanity_paths, guess_module_requirements};
use super::{BuildContext, BuildHandler, CommandOutput, ModuleRequirements, SanityCheckReport};
use crate::environment::join_command;
use async_trait::async_trait;
use ebs_errors::{BuildError, Error};
use ebs_types::{PackageConfig, SanityCheckPaths};

/// Handler for packages built with a `configure` script and make
///
/// Other make-based handlers wrap this one and override single steps.
pub struct ConfigureMakeHandler {
    cfg: PackageConfig,
}

impl ConfigureMakeHandler {
    pub const NAME: &'static str = "ConfigureMake";

    #[must_use]
    pub fn new(cfg: PackageConfig) -> Self {
        Self { cfg }
    }

    pub(crate) fn boxed(cfg: PackageConfig) -> Box<dyn BuildHandler> {
        Box::new(Self::new(cfg))
    }

    #[must_use]
    pub fn config(&self) -> &PackageConfig {
        &self.cfg
    }

    /// Effective number of make jobs
    #[must_use]
    pub fn parallel(&self, ctx: &BuildContext) -> usize {
        self.cfg.parallel.unwrap_or(ctx.options.parallel).max(1)
    }

    /// `<preconfigopts> ./configure --prefix=<installdir> <configopts>`
    #[must_use]
    pub fn configure_command(&self, ctx: &BuildContext) -> String {
        let prefix = format!("--prefix={}", ctx.install_dir.display());
        join_command([
            self.cfg.preconfigopts.as_str(),
            "./configure",
            prefix.as_str(),
            self.cfg.configopts.as_str(),
        ])
    }

    /// `<prebuildopts> make -j <n> <buildopts>`
    #[must_use]
    pub fn build_command(&self, ctx: &BuildContext) -> String {
        let parallel = self.parallel(ctx);
        let jobs = if parallel > 1 {
            format!("-j {parallel}")
        } else {
            String::new()
        };
        join_command([
            self.cfg.prebuildopts.as_str(),
            "make",
            jobs.as_str(),
            self.cfg.buildopts.as_str(),
        ])
    }

    /// `<preinstallopts> make install <installopts>`
    #[must_use]
    pub fn install_command(&self) -> String {
        join_command([
            self.cfg.preinstallopts.as_str(),
            "make install",
            self.cfg.installopts.as_str(),
        ])
    }

    /// Run a configuration command, failing the package on a non-zero exit
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingSourceDirectory` if the working directory is
    /// gone and `BuildError::ConfigurationCommand` if the command fails.
    pub async fn run_configure_command(
        &self,
        ctx: &BuildContext,
        command: &str,
    ) -> Result<CommandOutput, Error> {
        if !tokio::fs::metadata(&ctx.work_dir)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Err(BuildError::MissingSourceDirectory {
                path: ctx.work_dir.display().to_string(),
            }
            .into());
        }

        let output = ctx.run(command).await?;
        if !output.success() {
            return Err(BuildError::ConfigurationCommand {
                command: output.command.clone(),
                exit_code: output.exit_code,
                output: output.combined(),
            }
            .into());
        }
        Ok(output)
    }
}

#[async_trait]
impl BuildHandler for ConfigureMakeHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn package(&self) -> &PackageConfig {
        &self.cfg
    }

    async fn configure(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        let command = self.configure_command(ctx);
        self.run_configure_command(ctx, &command).await.map(Some)
    }

    async fn build(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        let output = ctx.run(&self.build_command(ctx)).await?;
        if !output.success() {
            return Err(BuildError::CompileFailed {
                message: format!(
                    "`{}` exited with {:?}: {}",
                    output.command,
                    output.exit_code,
                    output.combined()
                ),
            }
            .into());
        }
        Ok(Some(output))
    }

    async fn install(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        let output = ctx.run(&self.install_command()).await?;
        if !output.success() {
            return Err(BuildError::InstallFailed {
                message: format!(
                    "`{}` exited with {:?}: {}",
                    output.command,
                    output.exit_code,
                    output.combined()
                ),
            }
            .into());
        }
        Ok(Some(output))
    }

    async fn sanity_check(&self, ctx: &BuildContext) -> Result<SanityCheckReport, Error> {
        let paths = self
            .cfg
            .sanity_check_paths
            .clone()
            .unwrap_or_else(SanityCheckPaths::standard);
        Ok(check_sanity_paths(&ctx.install_dir, &paths).await)
    }

    fn module_requirements(&self, ctx: &BuildContext) -> ModuleRequirements {
        guess_module_requirements(&ctx.install_dir)
    }
}
