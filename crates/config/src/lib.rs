#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for ebs
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/ebs/config.toml)
//! - Environment variables
//! - CLI flags
//!
//! The merged result is exposed to build handlers as a read-only
//! [`BuildOptions`] value.

use ebs_errors::{ConfigError, Error};
use ebs_types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub default_output: OutputFormat,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Binaries get their RPATH rewritten by a post-install step
    #[serde(default)]
    pub rpath: bool,
    #[serde(default)]
    pub parallel: usize, // 0 = auto-detect
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub install_path: Option<PathBuf>,
    pub build_path: Option<PathBuf>,
}

/// Process-wide build options read by the handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// RPATH hardening is active; cmake must leave RPATH alone
    pub rpath: bool,
    /// Number of parallel make jobs, always at least 1
    pub parallel: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            rpath: false,
            parallel: 1,
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("ebs").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        tracing::debug!(path = %path.display(), "loading configuration");

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // EBS_OUTPUT
        if let Ok(output) = std::env::var("EBS_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "EBS_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // EBS_RPATH
        if let Ok(rpath) = std::env::var("EBS_RPATH") {
            self.build.rpath = match rpath.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "EBS_RPATH".to_string(),
                        value: rpath,
                    }
                    .into())
                }
            };
        }

        // EBS_PARALLEL
        if let Ok(jobs) = std::env::var("EBS_PARALLEL") {
            self.build.parallel = jobs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "EBS_PARALLEL".to_string(),
                value: jobs,
            })?;
        }

        if let Ok(path) = std::env::var("EBS_INSTALL_PATH") {
            self.paths.install_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("EBS_BUILD_PATH") {
            self.paths.build_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Get the install root (with default)
    #[must_use]
    pub fn install_path(&self) -> PathBuf {
        self.paths
            .install_path
            .clone()
            .unwrap_or_else(|| default_root().join("software"))
    }

    /// Get the build root (with default)
    #[must_use]
    pub fn build_path(&self) -> PathBuf {
        self.paths
            .build_path
            .clone()
            .unwrap_or_else(|| default_root().join("build"))
    }

    /// Resolve the effective number of parallel jobs
    #[must_use]
    pub fn parallel_jobs(&self) -> usize {
        if self.build.parallel == 0 {
            num_cpus::get().max(1)
        } else {
            self.build.parallel
        }
    }

    /// Snapshot of the options handlers consult during a build
    #[must_use]
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            rpath: self.build.rpath,
            parallel: self.parallel_jobs(),
        }
    }
}

fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".local")
        .join("ebs")
}
