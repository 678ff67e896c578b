//! Compiler toolkit handler
//!
//! A toolkit has nothing to configure, compile or install; it only needs an
//! install directory so a module file can be generated for it.

use super::{BuildContext, BuildHandler, CommandOutput, ModuleRequirements, SanityCheckReport};
use crate::environment::create_dir;
use async_trait::async_trait;
use ebs_errors::Error;
use ebs_types::PackageConfig;

/// Handler whose lifecycle steps do nothing beyond creating the install directory
pub struct ToolkitHandler {
    cfg: PackageConfig,
}

impl ToolkitHandler {
    pub const NAME: &'static str = "Toolkit";

    #[must_use]
    pub fn new(cfg: PackageConfig) -> Self {
        Self { cfg }
    }

    pub(crate) fn boxed(cfg: PackageConfig) -> Box<dyn BuildHandler> {
        Box::new(Self::new(cfg))
    }
}

#[async_trait]
impl BuildHandler for ToolkitHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn package(&self) -> &PackageConfig {
        &self.cfg
    }

    async fn configure(&self, _ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        Ok(None)
    }

    async fn build(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        create_dir(&ctx.install_dir).await?;
        Ok(None)
    }

    async fn install(&self, _ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        Ok(None)
    }

    async fn sanity_check(&self, _ctx: &BuildContext) -> Result<SanityCheckReport, Error> {
        Ok(SanityCheckReport::passed())
    }

    fn module_requirements(&self, _ctx: &BuildContext) -> ModuleRequirements {
        ModuleRequirements::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ToolchainEnvironment;
    use ebs_config::BuildOptions;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lifecycle_only_creates_install_dir() {
        let temp = tempdir().unwrap();
        let install_dir = temp.path().join("software/icc/2018");
        let start_dir = temp.path().join("src");
        let mut ctx = BuildContext::new(
            install_dir.clone(),
            temp.path().join("build"),
            start_dir.clone(),
            BuildOptions::default(),
        );
        let before = ctx.env.clone();
        let handler = ToolkitHandler::new(PackageConfig::new("icc", "2018"));

        assert!(handler.configure(&mut ctx).await.unwrap().is_none());
        assert!(handler.build(&mut ctx).await.unwrap().is_none());
        assert!(handler.install(&mut ctx).await.unwrap().is_none());
        assert!(handler.sanity_check(&ctx).await.unwrap().is_ok());
        assert!(handler.module_requirements(&ctx).is_empty());

        assert!(install_dir.is_dir());
        assert!(std::fs::read_dir(&install_dir).unwrap().next().is_none());
        assert!(!start_dir.exists());
        assert!(!temp.path().join("build").exists());
        assert_eq!(ctx.work_dir, start_dir);
        assert_eq!(ctx.env, before);
        assert_eq!(ctx.env, ToolchainEnvironment::new());
    }

    #[tokio::test]
    async fn test_sanity_check_passes_without_install_dir() {
        let ctx = BuildContext::new(
            "/nonexistent/ebs/icc".into(),
            "/nonexistent/ebs/build".into(),
            "/nonexistent/ebs/src".into(),
            BuildOptions::default(),
        );
        let handler = ToolkitHandler::new(PackageConfig::new("icc", "2018"));
        assert!(handler.sanity_check(&ctx).await.unwrap().is_ok());
    }
}
