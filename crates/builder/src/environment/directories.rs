//! Install and build directory management

use ebs_errors::{BuildError, Error};
use ebs_types::PackageConfig;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Create a directory and its parents; succeeds if it already exists
///
/// # Errors
///
/// Returns `BuildError::DirectoryCreation` naming the attempted path.
pub async fn create_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path).await.map_err(|e| {
        BuildError::DirectoryCreation {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Per-package install and build directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirectories {
    /// Absolute install prefix, `<install root>/<name>/<version>`
    pub install_dir: PathBuf,
    /// Absolute scratch directory, `<build root>/<name>/<version>`
    pub build_dir: PathBuf,
}

impl BuildDirectories {
    /// Compute the directories for a package without touching the filesystem
    ///
    /// # Errors
    ///
    /// Returns an error if a relative root cannot be made absolute.
    pub fn for_package(
        install_root: &Path,
        build_root: &Path,
        package: &PackageConfig,
    ) -> Result<Self, Error> {
        let install_root =
            std::path::absolute(install_root).map_err(|e| Error::io_with_path(&e, install_root))?;
        let build_root =
            std::path::absolute(build_root).map_err(|e| Error::io_with_path(&e, build_root))?;

        Ok(Self {
            install_dir: install_root.join(&package.name).join(&package.version),
            build_dir: build_root.join(&package.name).join(&package.version),
        })
    }

    /// Compute and create the directories for a package
    ///
    /// # Errors
    ///
    /// Returns `BuildError::DirectoryCreation` if either directory cannot be created.
    pub async fn prepare(
        install_root: &Path,
        build_root: &Path,
        package: &PackageConfig,
    ) -> Result<Self, Error> {
        let dirs = Self::for_package(install_root, build_root, package)?;
        create_dir(&dirs.install_dir).await?;
        create_dir(&dirs.build_dir).await?;

        tracing::debug!(
            package = %package.full_name(),
            install_dir = %dirs.install_dir.display(),
            build_dir = %dirs.build_dir.display(),
            "prepared build directories"
        );

        Ok(dirs)
    }
}
