//! Declarative package definitions
//!
//! A package file is a small TOML document naming the handler (`easyblock`)
//! that builds it, the toolchain it is built with, and the free-form option
//! strings spliced into the generated configure/make command lines.

use ebs_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Parameters for building one package, read-only once the build starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub version: String,
    /// Name of the handler that builds this package; `auto` detects it from the sources
    #[serde(default = "default_easyblock")]
    pub easyblock: String,
    #[serde(default)]
    pub toolchain: ToolchainSpec,
    /// Source directory handed to cmake, overriding the computed default
    #[serde(default)]
    pub srcdir: Option<String>,
    #[serde(default)]
    pub separate_build_dir: bool,
    /// Subdirectory of the extracted sources to start the build in
    #[serde(default)]
    pub start_dir: Option<String>,
    #[serde(default)]
    pub preconfigopts: String,
    #[serde(default)]
    pub configopts: String,
    #[serde(default)]
    pub prebuildopts: String,
    #[serde(default)]
    pub buildopts: String,
    #[serde(default)]
    pub preinstallopts: String,
    #[serde(default)]
    pub installopts: String,
    /// Parallelism override for this package
    #[serde(default)]
    pub parallel: Option<usize>,
    #[serde(default)]
    pub sanity_check_paths: Option<SanityCheckPaths>,
}

fn default_easyblock() -> String {
    "auto".to_string()
}

impl PackageConfig {
    /// Create a package definition with every optional field at its default
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            easyblock: default_easyblock(),
            toolchain: ToolchainSpec::default(),
            srcdir: None,
            separate_build_dir: false,
            start_dir: None,
            preconfigopts: String::new(),
            configopts: String::new(),
            prebuildopts: String::new(),
            buildopts: String::new(),
            preinstallopts: String::new(),
            installopts: String::new(),
            parallel: None,
            sanity_check_paths: None,
        }
    }

    /// `name-version`, used for log fields and directory names
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Parse a package definition from TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the document is not a valid package definition.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load a package definition from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Self::from_toml_str(&contents)
    }
}

/// Description of the compiler toolchain a package is built with
///
/// `variables` maps a toolchain variable (`CPPFLAGS`, `LDFLAGS`, `CC`, ...) to
/// its ordered list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSpec {
    #[serde(default = "default_toolchain_name")]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Vec<String>>,
}

fn default_toolchain_name() -> String {
    "system".to_string()
}

impl Default for ToolchainSpec {
    fn default() -> Self {
        Self {
            name: default_toolchain_name(),
            version: None,
            variables: BTreeMap::new(),
        }
    }
}

impl ToolchainSpec {
    /// Ordered values of a toolchain variable; empty when the toolchain does not define it
    #[must_use]
    pub fn get_variable(&self, name: &str) -> &[String] {
        self.variables.get(name).map_or(&[], Vec::as_slice)
    }

    /// Builder-style helper for setting a variable
    #[must_use]
    pub fn with_variable<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// A relative path that must exist after install, or a set of alternatives of
/// which at least one must exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathCandidate {
    Single(String),
    AnyOf(Vec<String>),
}

impl PathCandidate {
    /// All alternatives, in declaration order
    #[must_use]
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            Self::Single(path) => vec![path.as_str()],
            Self::AnyOf(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for PathCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alternatives().join("|"))
    }
}

/// Paths checked relative to the install directory after the install step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityCheckPaths {
    #[serde(default)]
    pub files: Vec<PathCandidate>,
    #[serde(default)]
    pub dirs: Vec<PathCandidate>,
}

impl SanityCheckPaths {
    /// Paths checked when a package does not declare its own: a `bin` directory
    /// and a `lib` or `lib64` directory
    #[must_use]
    pub fn standard() -> Self {
        Self {
            files: Vec::new(),
            dirs: vec![
                PathCandidate::Single("bin".to_string()),
                PathCandidate::AnyOf(vec!["lib".to_string(), "lib64".to_string()]),
            ],
        }
    }
}
