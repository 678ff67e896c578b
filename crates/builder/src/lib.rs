#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]
//! Pluggable build-step orchestration for ebs
//!
//! A package is built by a [`BuildHandler`] chosen from the
//! [`HandlerRegistry`] and driven through configure, build, install and
//! sanity check by the [`Orchestrator`]. Each package gets its own
//! [`BuildContext`]; subprocesses inherit only that context's
//! [`ToolchainEnvironment`] and working directory, so builds never mutate
//! process-wide state.

mod environment;
mod handlers;
mod orchestrator;
pub mod paths;

pub use environment::{
    create_dir, join_command, run_shell, BuildDirectories, CommandOutput, ToolchainEnvironment,
};
pub use handlers::{
    check_sanity_paths, env_to_cmake_options, guess_module_requirements, BuildContext,
    BuildHandler, CMakeConfigurePlan, CMakeMakeHandler, ConfigureMakeHandler, HandlerFactory,
    HandlerRegistry, ModuleRequirements, SanityCheckReport, ToolkitHandler, ENV_TO_CMAKE_OPTIONS,
    SEPARATE_BUILD_DIR_NAME,
};
pub use orchestrator::{run_lifecycle, LifecycleStep, Orchestrator};
pub use paths::{merge_search_paths, unique_paths};
