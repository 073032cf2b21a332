//! Error taxonomy for the preflight and launch phases.
//!
//! Runtime death of a supervised child is not an error type: the monitor
//! reports it as an outcome and the session ends through the reaper. Output
//! stream errors are local to their consumer task and never escalate.

use crate::supervisor::ServiceName;
use std::{path::PathBuf, process::ExitStatus};
use thiserror::Error;

/// A problem found before any process is started. Nothing needs reaping when
/// one of these aborts the run.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("{name} directory not found: {path}")]
    MissingDirectory { name: ServiceName, path: PathBuf },

    #[error("{name} package.json not found in {path}")]
    MissingManifest { name: ServiceName, path: PathBuf },

    #[error("required tool `{tool}` not found on PATH")]
    MissingTool { tool: &'static str },

    #[error("dependencies are missing and the operator declined to continue")]
    Declined,

    #[error("failed to read operator confirmation")]
    Prompt(#[from] dialoguer::Error),
}

/// A child failed to come up. Anything launched before the failure is reaped
/// before the program exits.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{name}: start command is empty")]
    EmptyCommand { name: ServiceName },

    #[error("{name}: failed to spawn `{command}`: {source}")]
    Spawn {
        name: ServiceName,
        command: String,
        source: std::io::Error,
    },

    #[error("{name}: exited during the settle window ({status})")]
    ExitedDuringSettle {
        name: ServiceName,
        status: ExitStatus,
    },

    #[error("{name}: failed to poll child status: {source}")]
    Poll {
        name: ServiceName,
        source: std::io::Error,
    },
}
