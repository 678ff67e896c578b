//! CMake handler
//!
//! Shares build, install and sanity check with [`ConfigureMakeHandler`] and
//! replaces only the configure step. The configure step is split into a pure
//! planning phase ([`CMakeMakeHandler::plan`]) and an execution phase that
//! applies the plan's side effects in order: search-path exports, build
//! directory creation, source validation, and finally the cmake invocation.

use super::configure_make::ConfigureMakeHandler;
use super::{BuildContext, BuildHandler, CommandOutput, ModuleRequirements, SanityCheckReport};
use crate::environment::{create_dir, join_command, ToolchainEnvironment};
use crate::paths::{join_paths, merge_search_paths};
use async_trait::async_trait;
use ebs_errors::{BuildError, Error};
use ebs_types::PackageConfig;
use std::path::{Path, PathBuf};

/// Directory created under the package build dir for out-of-source builds
pub const SEPARATE_BUILD_DIR_NAME: &str = "easybuild_obj";

/// Environment variables forwarded to cmake as cache definitions, in emission order
pub const ENV_TO_CMAKE_OPTIONS: [(&str, &str); 6] = [
    ("CC", "CMAKE_C_COMPILER"),
    ("CFLAGS", "CMAKE_C_FLAGS"),
    ("CXX", "CMAKE_CXX_COMPILER"),
    ("CXXFLAGS", "CMAKE_CXX_FLAGS"),
    ("F90", "CMAKE_Fortran_COMPILER"),
    ("FFLAGS", "CMAKE_Fortran_FLAGS"),
];

/// Map set environment variables to `-D<name>='<value>'` definitions
///
/// A variable set to the empty string still produces a definition, and so
/// does one whose value is not valid UTF-8.
#[must_use]
pub fn env_to_cmake_options(env: &ToolchainEnvironment) -> Vec<String> {
    ENV_TO_CMAKE_OPTIONS
        .iter()
        .filter_map(|(var, option)| {
            env.get_lossy(var)
                .map(|value| format!("-D{option}='{value}'"))
        })
        .collect()
}

/// Decisions of the cmake configure step, computed without side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeConfigurePlan {
    /// Value exported as `CMAKE_INCLUDE_PATH`
    pub include_paths: Vec<String>,
    /// Value exported as `CMAKE_LIBRARY_PATH`
    pub library_paths: Vec<String>,
    /// Build directory to create and run cmake in, if any
    pub build_dir: Option<PathBuf>,
    /// Source directory argument passed to cmake
    pub source_dir: String,
    /// Generated `-D` options, in order
    pub options: Vec<String>,
    /// Full command line
    pub command: String,
}

impl CMakeConfigurePlan {
    /// Variables the plan exports into the package environment
    #[must_use]
    pub fn exports(&self) -> [(&'static str, String); 2] {
        [
            ("CMAKE_INCLUDE_PATH", join_paths(&self.include_paths)),
            ("CMAKE_LIBRARY_PATH", join_paths(&self.library_paths)),
        ]
    }
}

/// Handler for packages configured with cmake and built with make
pub struct CMakeMakeHandler {
    inner: ConfigureMakeHandler,
}

impl CMakeMakeHandler {
    pub const NAME: &'static str = "CMakeMake";

    #[must_use]
    pub fn new(cfg: PackageConfig) -> Self {
        Self {
            inner: ConfigureMakeHandler::new(cfg),
        }
    }

    pub(crate) fn boxed(cfg: PackageConfig) -> Box<dyn BuildHandler> {
        Box::new(Self::new(cfg))
    }

    /// Compute the configure step for the given overrides
    ///
    /// `builddir` is resolved against `ctx.work_dir` when relative.
    #[must_use]
    pub fn plan(
        &self,
        ctx: &BuildContext,
        srcdir: Option<&str>,
        builddir: Option<&Path>,
    ) -> CMakeConfigurePlan {
        let cfg = self.inner.config();

        let include_paths = merge_search_paths(
            ctx.toolchain_variable("CPPFLAGS"),
            &ctx.env.split_paths("CPATH"),
        );
        let library_paths = merge_search_paths(
            ctx.toolchain_variable("LDFLAGS"),
            &ctx.env.split_paths("LD_LIBRARY_PATH"),
        );

        let build_dir = match builddir {
            Some(dir) => Some(ctx.work_dir.join(dir)),
            None if cfg.separate_build_dir => Some(ctx.build_dir.join(SEPARATE_BUILD_DIR_NAME)),
            None => None,
        };

        let default_srcdir = if build_dir.is_some() {
            ctx.start_dir.display().to_string()
        } else {
            ".".to_string()
        };

        let source_dir = srcdir
            .map(str::to_string)
            .or_else(|| cfg.srcdir.clone())
            .unwrap_or(default_srcdir);

        let mut options = vec![format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            ctx.install_dir.display()
        )];
        options.extend(env_to_cmake_options(&ctx.env));
        if ctx.options.rpath {
            // RPATHs are rewritten after install; cmake must not touch them
            options.push("-DCMAKE_SKIP_RPATH=ON".to_string());
        }
        options.push("-DCMAKE_VERBOSE_MAKEFILE=ON".to_string());

        let options_string = options.join(" ");
        let command = join_command([
            cfg.preconfigopts.as_str(),
            "cmake",
            options_string.as_str(),
            cfg.configopts.as_str(),
            source_dir.as_str(),
        ]);

        CMakeConfigurePlan {
            include_paths,
            library_paths,
            build_dir,
            source_dir,
            options,
            command,
        }
    }

    /// Configure with explicit source and build directory overrides
    ///
    /// Exports `CMAKE_INCLUDE_PATH` and `CMAKE_LIBRARY_PATH` into `ctx.env`
    /// and, when a build directory is used, moves `ctx.work_dir` into it.
    /// Both changes persist for the remaining steps of this package.
    ///
    /// # Errors
    ///
    /// Fails if the install directory is not an existing absolute path, the
    /// build directory cannot be created, the source directory does not exist,
    /// or cmake exits non-zero.
    pub async fn configure_with(
        &self,
        ctx: &mut BuildContext,
        srcdir: Option<&str>,
        builddir: Option<&Path>,
    ) -> Result<CommandOutput, Error> {
        validate_install_dir(&ctx.install_dir).await?;

        let plan = self.plan(ctx, srcdir, builddir);

        for (name, value) in plan.exports() {
            tracing::debug!(name, value = %value, "exporting search path");
            ctx.env.set(name, value);
        }

        if let Some(dir) = &plan.build_dir {
            create_dir(dir).await?;
            ctx.work_dir.clone_from(dir);
        }

        let source = ctx.work_dir.join(&plan.source_dir);
        if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_dir()) {
            return Err(BuildError::MissingSourceDirectory {
                path: source.display().to_string(),
            }
            .into());
        }

        tracing::info!(
            package = %self.inner.config().full_name(),
            work_dir = %ctx.work_dir.display(),
            source_dir = %plan.source_dir,
            "configuring with cmake"
        );

        self.inner.run_configure_command(ctx, &plan.command).await
    }
}

async fn validate_install_dir(install_dir: &Path) -> Result<(), Error> {
    let reason = if !install_dir.is_absolute() {
        "not an absolute path"
    } else if !tokio::fs::metadata(install_dir)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        "directory does not exist"
    } else {
        return Ok(());
    };

    Err(BuildError::InvalidInstallDir {
        path: install_dir.display().to_string(),
        reason: reason.to_string(),
    }
    .into())
}

#[async_trait]
impl BuildHandler for CMakeMakeHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn package(&self) -> &PackageConfig {
        self.inner.config()
    }

    async fn configure(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        self.configure_with(ctx, None, None).await.map(Some)
    }

    async fn build(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        self.inner.build(ctx).await
    }

    async fn install(&self, ctx: &mut BuildContext) -> Result<Option<CommandOutput>, Error> {
        self.inner.install(ctx).await
    }

    async fn sanity_check(&self, ctx: &BuildContext) -> Result<SanityCheckReport, Error> {
        self.inner.sanity_check(ctx).await
    }

    fn module_requirements(&self, ctx: &BuildContext) -> ModuleRequirements {
        self.inner.module_requirements(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PATH_SEPARATOR;
    use ebs_config::BuildOptions;
    use ebs_types::ToolchainSpec;
    use tempfile::tempdir;

    fn ctx(rpath: bool, env: ToolchainEnvironment) -> BuildContext {
        BuildContext::new(
            PathBuf::from("/opt/pkg"),
            PathBuf::from("/scratch/pkg"),
            PathBuf::from("/scratch/src/pkg-1.0"),
            BuildOptions { rpath, parallel: 1 },
        )
        .with_env(env)
    }

    fn handler(cfg: PackageConfig) -> CMakeMakeHandler {
        CMakeMakeHandler::new(cfg)
    }

    #[test]
    fn test_env_mapping_skips_unset() {
        let env = ToolchainEnvironment::from_vars([("CC", "gcc")]);
        let options = env_to_cmake_options(&env);
        assert_eq!(options, vec!["-DCMAKE_C_COMPILER='gcc'"]);
        assert!(!options.iter().any(|o| o.contains("CMAKE_CXX_COMPILER")));
    }

    #[test]
    fn test_env_mapping_keeps_empty_values() {
        let env = ToolchainEnvironment::from_vars([("CFLAGS", "")]);
        assert_eq!(env_to_cmake_options(&env), vec!["-DCMAKE_C_FLAGS=''"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_mapping_keeps_non_utf8_values() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let env = ToolchainEnvironment::from_vars([(
            OsString::from("CC"),
            OsString::from_vec(b"/opt/gcc-\xe9/bin/gcc".to_vec()),
        )]);
        let options = env_to_cmake_options(&env);
        assert_eq!(options.len(), 1);
        assert!(options[0].starts_with("-DCMAKE_C_COMPILER='/opt/gcc-"));
        assert!(options[0].ends_with("/bin/gcc'"));
    }

    #[test]
    fn test_env_mapping_table_order_and_quoting() {
        let env = ToolchainEnvironment::from_vars([
            ("FFLAGS", "-O2"),
            ("F90", "gfortran"),
            ("CXXFLAGS", "-O2 -g"),
            ("CXX", "g++"),
            ("CFLAGS", "-O3"),
            ("CC", "gcc"),
        ]);
        assert_eq!(
            env_to_cmake_options(&env),
            vec![
                "-DCMAKE_C_COMPILER='gcc'",
                "-DCMAKE_C_FLAGS='-O3'",
                "-DCMAKE_CXX_COMPILER='g++'",
                "-DCMAKE_CXX_FLAGS='-O2 -g'",
                "-DCMAKE_Fortran_COMPILER='gfortran'",
                "-DCMAKE_Fortran_FLAGS='-O2'",
            ]
        );
    }

    #[test]
    fn test_option_order_with_rpath() {
        let env = ToolchainEnvironment::from_vars([("CC", "gcc")]);
        let plan = handler(PackageConfig::new("pkg", "1.0")).plan(&ctx(true, env), None, None);
        assert_eq!(
            plan.options,
            vec![
                "-DCMAKE_INSTALL_PREFIX=/opt/pkg",
                "-DCMAKE_C_COMPILER='gcc'",
                "-DCMAKE_SKIP_RPATH=ON",
                "-DCMAKE_VERBOSE_MAKEFILE=ON",
            ]
        );
    }

    #[test]
    fn test_option_order_without_rpath() {
        let plan = handler(PackageConfig::new("pkg", "1.0")).plan(
            &ctx(false, ToolchainEnvironment::new()),
            None,
            None,
        );
        assert_eq!(
            plan.options,
            vec!["-DCMAKE_INSTALL_PREFIX=/opt/pkg", "-DCMAKE_VERBOSE_MAKEFILE=ON"]
        );
    }

    #[test]
    fn test_separate_build_dir() {
        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.separate_build_dir = true;
        let plan = handler(cfg).plan(&ctx(false, ToolchainEnvironment::new()), None, None);
        assert_eq!(
            plan.build_dir,
            Some(PathBuf::from("/scratch/pkg/easybuild_obj"))
        );
        assert_eq!(plan.source_dir, "/scratch/src/pkg-1.0");
        assert!(plan.command.ends_with(" /scratch/src/pkg-1.0"));
    }

    #[test]
    fn test_in_place_build() {
        let plan = handler(PackageConfig::new("pkg", "1.0")).plan(
            &ctx(false, ToolchainEnvironment::new()),
            None,
            None,
        );
        assert_eq!(plan.build_dir, None);
        assert_eq!(plan.source_dir, ".");
    }

    #[test]
    fn test_explicit_builddir_wins_over_separate_build_dir() {
        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.separate_build_dir = true;
        let plan = handler(cfg).plan(
            &ctx(false, ToolchainEnvironment::new()),
            None,
            Some(Path::new("/scratch/custom")),
        );
        assert_eq!(plan.build_dir, Some(PathBuf::from("/scratch/custom")));
        assert_eq!(plan.source_dir, "/scratch/src/pkg-1.0");
    }

    #[test]
    fn test_source_dir_precedence() {
        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.separate_build_dir = true;
        cfg.srcdir = Some("/from/config".into());
        let h = handler(cfg);
        let ctx = ctx(false, ToolchainEnvironment::new());

        assert_eq!(h.plan(&ctx, Some("/explicit"), None).source_dir, "/explicit");
        assert_eq!(h.plan(&ctx, None, None).source_dir, "/from/config");

        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.separate_build_dir = true;
        assert_eq!(
            handler(cfg).plan(&ctx, None, None).source_dir,
            "/scratch/src/pkg-1.0"
        );
    }

    #[test]
    fn test_search_paths_toolchain_first_and_deduplicated() {
        let env = ToolchainEnvironment::from_vars([
            (
                "CPATH",
                format!("/env/include{PATH_SEPARATOR}/tc/include"),
            ),
            ("LD_LIBRARY_PATH", String::new()),
        ]);
        let ctx = ctx(false, env).with_toolchain(
            ToolchainSpec::default()
                .with_variable("CPPFLAGS", ["/tc/include"])
                .with_variable("LDFLAGS", ["/tc/lib", "/tc/lib"]),
        );
        let plan = handler(PackageConfig::new("pkg", "1.0")).plan(&ctx, None, None);

        assert_eq!(plan.include_paths, vec!["/tc/include", "/env/include"]);
        assert_eq!(plan.library_paths, vec!["/tc/lib"]);

        let exports = plan.exports();
        assert_eq!(exports[0].0, "CMAKE_INCLUDE_PATH");
        assert_eq!(
            exports[0].1,
            format!("/tc/include{PATH_SEPARATOR}/env/include")
        );
        assert_eq!(exports[1], ("CMAKE_LIBRARY_PATH", "/tc/lib".to_string()));
    }

    #[test]
    fn test_unset_search_path_vars_export_empty() {
        let plan = handler(PackageConfig::new("pkg", "1.0")).plan(
            &ctx(false, ToolchainEnvironment::new()),
            None,
            None,
        );
        assert!(plan.include_paths.is_empty());
        assert_eq!(plan.exports()[0].1, "");
    }

    #[test]
    fn test_end_to_end_command() {
        let env = ToolchainEnvironment::from_vars([("CC", "gcc"), ("CXX", "g++")]);
        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.configopts = "-DFOO=1".into();
        let plan = handler(cfg).plan(&ctx(false, env), None, None);
        assert_eq!(
            plan.command,
            "cmake -DCMAKE_INSTALL_PREFIX=/opt/pkg -DCMAKE_C_COMPILER='gcc' \
             -DCMAKE_CXX_COMPILER='g++' -DCMAKE_VERBOSE_MAKEFILE=ON -DFOO=1 ."
        );
    }

    #[test]
    fn test_preconfigopts_come_first() {
        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.preconfigopts = "env CMAKE_PREFIX_PATH=/deps".into();
        let plan = handler(cfg).plan(&ctx(false, ToolchainEnvironment::new()), None, None);
        assert!(plan
            .command
            .starts_with("env CMAKE_PREFIX_PATH=/deps cmake -DCMAKE_INSTALL_PREFIX=/opt/pkg"));
    }

    #[tokio::test]
    async fn test_relative_install_dir_rejected() {
        let mut ctx = ctx(false, ToolchainEnvironment::new());
        ctx.install_dir = PathBuf::from("relative/prefix");
        let err = handler(PackageConfig::new("pkg", "1.0"))
            .configure_with(&mut ctx, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::InvalidInstallDir { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_source_dir_detected_before_running() {
        let temp = tempdir().unwrap();
        let install = temp.path().join("install");
        std::fs::create_dir_all(&install).unwrap();
        let mut ctx = BuildContext::new(
            install,
            temp.path().join("build"),
            temp.path().join("src"),
            BuildOptions::default(),
        );
        ctx.work_dir = temp.path().to_path_buf();

        let mut cfg = PackageConfig::new("pkg", "1.0");
        cfg.separate_build_dir = true;
        let err = handler(cfg)
            .configure_with(&mut ctx, None, None)
            .await
            .unwrap_err();

        match err {
            Error::Build(BuildError::MissingSourceDirectory { path }) => {
                assert!(path.ends_with("src"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // the build dir was still created and entered
        assert!(temp.path().join("build/easybuild_obj").is_dir());
        assert_eq!(ctx.work_dir, temp.path().join("build/easybuild_obj"));
        assert!(ctx.env.get("CMAKE_INCLUDE_PATH").is_some());
    }
}
