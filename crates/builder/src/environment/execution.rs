//! Shell command execution for lifecycle steps

use super::variables::ToolchainEnvironment;
use ebs_errors::{BuildError, Error};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const SHELL: &str = "/bin/sh";

/// Captured result of a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Full command line as handed to the shell
    pub command: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, for error reports
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Join command-line fragments with single spaces, skipping blank fragments
#[must_use]
pub fn join_command<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command line through the shell and capture its output
///
/// The subprocess sees exactly the variables in `env`. The invocation is
/// always logged; with `log_all` the captured output is logged as well.
/// A non-zero exit is not an error here, callers decide what it means for
/// their step.
///
/// # Errors
///
/// Returns `BuildError::CommandSpawn` if the shell cannot be started.
pub async fn run_shell(
    command: &str,
    work_dir: &Path,
    env: &ToolchainEnvironment,
    log_all: bool,
) -> Result<CommandOutput, Error> {
    tracing::info!(
        command,
        work_dir = %work_dir.display(),
        "running command"
    );

    let output = Command::new(SHELL)
        .arg("-c")
        .arg(command)
        .current_dir(work_dir)
        .env_clear()
        .envs(env.vars())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| BuildError::CommandSpawn {
            command: command.to_string(),
            message: e.to_string(),
        })?;

    let result = CommandOutput {
        command: command.to_string(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success() {
        tracing::error!(
            command,
            exit_code = ?result.exit_code,
            stderr = %result.stderr,
            "command failed"
        );
    } else if log_all {
        tracing::debug!(
            command,
            stdout = %result.stdout,
            stderr = %result.stderr,
            "command finished"
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn base_env() -> ToolchainEnvironment {
        ToolchainEnvironment::from_vars([("PATH", "/usr/bin:/bin")])
    }

    #[test]
    fn test_join_command_skips_blank_parts() {
        assert_eq!(join_command(["", "cmake", "-DA=1", " ", "."]), "cmake -DA=1 .");
        assert_eq!(
            join_command(["env X=1 ", "make", "-j 4"]),
            "env X=1 make -j 4"
        );
    }

    #[tokio::test]
    async fn test_run_shell_captures_output_in_work_dir() {
        let temp = tempdir().unwrap();
        let out = run_shell("pwd; echo oops >&2", temp.path(), &base_env(), true)
            .await
            .unwrap();
        assert!(out.success());
        let expected = temp.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(out.stdout.trim()).canonicalize().unwrap(),
            expected
        );
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_shell_sees_only_given_env() {
        let temp = tempdir().unwrap();
        let mut env = base_env();
        env.set("CMAKE_INCLUDE_PATH", "/x/include");
        let out = run_shell(
            "echo \"$CMAKE_INCLUDE_PATH|${HOME:-unset}\"",
            temp.path(),
            &env,
            false,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "/x/include|unset");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_shell_passes_raw_bytes() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let temp = tempdir().unwrap();
        let mut env = base_env();
        env.set(
            "LD_LIBRARY_PATH",
            OsString::from_vec(b"/opt/lib\xe9".to_vec()),
        );
        let out = run_shell(
            "[ \"$LD_LIBRARY_PATH\" = \"$(printf '/opt/lib\\351')\" ]",
            temp.path(),
            &env,
            false,
        )
        .await
        .unwrap();
        assert!(out.success(), "{}", out.combined());
    }

    #[tokio::test]
    async fn test_run_shell_reports_exit_code() {
        let temp = tempdir().unwrap();
        let out = run_shell("echo partial; exit 3", temp.path(), &base_env(), true)
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.combined().trim(), "partial");
    }
}
