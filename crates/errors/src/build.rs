//! Build lifecycle error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("failed to create directory {path}: {message}")]
    DirectoryCreation { path: String, message: String },

    #[error("configuration command `{command}` failed with exit code {exit_code:?}: {output}")]
    ConfigurationCommand {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("source directory does not exist: {path}")]
    MissingSourceDirectory { path: String },

    #[error("invalid install directory {path}: {reason}")]
    InvalidInstallDir { path: String, reason: String },

    #[error("compile failed: {message}")]
    CompileFailed { message: String },

    #[error("install failed: {message}")]
    InstallFailed { message: String },

    #[error("sanity check failed for {package}: missing {}", missing.join(", "))]
    SanityCheckFailed {
        package: String,
        missing: Vec<String>,
    },

    #[error("failed to spawn `{command}`: {message}")]
    CommandSpawn { command: String, message: String },

    #[error("unknown build handler: {name}")]
    UnknownHandler { name: String },

    #[error("no build handler detected in {path}")]
    NoHandlerDetected { path: String },

    #[error("{package} is built with {handler}, which has no cmake configure step")]
    NoConfigurePlan { package: String, handler: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DirectoryCreation { .. } => {
                Some("Check permissions on the build and install roots.")
            }
            Self::ConfigurationCommand { .. } => Some(
                "Inspect the cmake/configure output above; missing dependencies and bad options are the usual cause.",
            ),
            Self::MissingSourceDirectory { .. } => {
                Some("Check `srcdir` and `start_dir` in the package definition.")
            }
            Self::InvalidInstallDir { .. } => {
                Some("Use an absolute install root in the configuration file.")
            }
            Self::SanityCheckFailed { .. } => {
                Some("Adjust `sanity_check_paths` or fix the install step of the package.")
            }
            Self::UnknownHandler { .. } | Self::NoHandlerDetected { .. } => {
                Some("Set `easyblock` to one of the names listed by `ebs handlers`.")
            }
            Self::NoConfigurePlan { .. } => {
                Some("`ebs plan` only previews packages built with CMakeMake.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DirectoryCreation { .. } => "build.directory_creation",
            Self::ConfigurationCommand { .. } => "build.configuration_command",
            Self::MissingSourceDirectory { .. } => "build.missing_source_directory",
            Self::InvalidInstallDir { .. } => "build.invalid_install_dir",
            Self::CompileFailed { .. } => "build.compile_failed",
            Self::InstallFailed { .. } => "build.install_failed",
            Self::SanityCheckFailed { .. } => "build.sanity_check_failed",
            Self::CommandSpawn { .. } => "build.command_spawn",
            Self::UnknownHandler { .. } => "build.unknown_handler",
            Self::NoHandlerDetected { .. } => "build.no_handler_detected",
            Self::NoConfigurePlan { .. } => "build.no_configure_plan",
        };
        Some(code)
    }
}
