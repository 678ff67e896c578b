//! Explicit environment for build subprocesses
//!
//! Handlers never read or write the host process environment directly. A
//! [`ToolchainEnvironment`] is snapshotted once per package and every
//! subprocess is spawned with exactly this set of variables, so exports made
//! by one package's configure step stay with that package.

use crate::paths::PATH_SEPARATOR;
use ebs_types::ToolchainSpec;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Toolchain variables exported as space-joined strings
const EXPORTED_TOOLCHAIN_VARS: [&str; 8] = [
    "CC", "CXX", "F90", "CFLAGS", "CXXFLAGS", "FFLAGS", "CPPFLAGS", "LDFLAGS",
];

/// Environment variables visible to one package's build subprocesses
///
/// Names and values are kept as raw OS strings so subprocesses receive them
/// byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ToolchainEnvironment {
    /// Create an empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Build an environment from explicit pairs
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a variable, `None` when unset or not valid UTF-8
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_os(name).and_then(OsStr::to_str)
    }

    #[must_use]
    pub fn get_os(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(name)).map(OsString::as_os_str)
    }

    /// Value of a set variable for use in a command line
    ///
    /// Invalid UTF-8 is replaced, so a set variable is never reported as unset.
    #[must_use]
    pub fn get_lossy(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get_os(name).map(OsStr::to_string_lossy)
    }

    pub fn set(&mut self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<OsString> {
        self.vars.remove(OsStr::new(name))
    }

    /// All variables, sorted by name
    #[must_use]
    pub fn vars(&self) -> &BTreeMap<OsString, OsString> {
        &self.vars
    }

    /// Split a path-list variable on the platform separator
    ///
    /// An unset variable yields a single empty entry, mirroring how an empty
    /// string splits.
    #[must_use]
    pub fn split_paths(&self, name: &str) -> Vec<String> {
        self.get_lossy(name)
            .unwrap_or_default()
            .split(PATH_SEPARATOR)
            .map(str::to_string)
            .collect()
    }

    /// Export the compiler and flag variables a toolchain defines
    pub fn apply_toolchain(&mut self, toolchain: &ToolchainSpec) {
        for name in EXPORTED_TOOLCHAIN_VARS {
            if let Some(values) = toolchain.variables.get(name) {
                self.set(name, values.join(" "));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_unset_yields_single_empty_entry() {
        let env = ToolchainEnvironment::new();
        assert_eq!(env.split_paths("CPATH"), vec![String::new()]);
    }

    #[test]
    fn test_split_paths() {
        let env = ToolchainEnvironment::from_vars([(
            "LD_LIBRARY_PATH",
            format!("/a/lib{PATH_SEPARATOR}/b/lib"),
        )]);
        assert_eq!(env.split_paths("LD_LIBRARY_PATH"), vec!["/a/lib", "/b/lib"]);
    }

    #[test]
    fn test_apply_toolchain_exports_flags_only() {
        let toolchain = ToolchainSpec::default()
            .with_variable("CC", ["gcc"])
            .with_variable("CFLAGS", ["-O2", "-march=native"])
            .with_variable("LIBBLAS", ["-lopenblas"]);
        let mut env = ToolchainEnvironment::new();
        env.apply_toolchain(&toolchain);

        assert_eq!(env.get("CC"), Some("gcc"));
        assert_eq!(env.get("CFLAGS"), Some("-O2 -march=native"));
        assert_eq!(env.get("LIBBLAS"), None);
    }

    #[test]
    fn test_set_and_remove() {
        let mut env = ToolchainEnvironment::new();
        env.set("CXX", "g++");
        assert_eq!(env.get("CXX"), Some("g++"));
        assert_eq!(env.remove("CXX"), Some(OsString::from("g++")));
        assert!(env.get("CXX").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_values_are_kept() {
        use std::os::unix::ffi::OsStringExt;

        let cc = OsString::from_vec(b"/opt/gcc-\xe9/bin/gcc".to_vec());
        let env = ToolchainEnvironment::from_vars([
            (OsString::from("CC"), cc.clone()),
            (
                OsString::from("LD_LIBRARY_PATH"),
                OsString::from_vec(b"/opt/lib\xe9:/usr/lib".to_vec()),
            ),
        ]);

        assert_eq!(env.get("CC"), None);
        assert_eq!(env.get_os("CC"), Some(cc.as_os_str()));
        assert_eq!(env.get_lossy("CC").as_deref(), Some("/opt/gcc-\u{fffd}/bin/gcc"));
        assert_eq!(
            env.split_paths("LD_LIBRARY_PATH"),
            vec!["/opt/lib\u{fffd}", "/usr/lib"]
        );
    }
}
