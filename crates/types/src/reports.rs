//! Report type definitions for build runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Build report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildReport {
    /// Package that was built
    pub package: String,
    /// Version that was built
    pub version: String,
    /// Handler that drove the lifecycle
    pub handler: String,
    /// Installation directory
    pub install_dir: PathBuf,
    /// Build duration
    pub duration_ms: u64,
    /// Captured stdout of the configure step, if it ran a command
    pub configure_output: Option<String>,
    /// Environment variables the package's module file should extend
    pub module_requirements: BTreeMap<String, Vec<PathBuf>>,
}
