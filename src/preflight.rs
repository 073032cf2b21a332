//! Preflight checks
//!
//! Everything here runs before any service process exists, so a failure
//! aborts the program with nothing to reap. Structure problems (missing
//! directory or manifest) and missing tools are fatal; missing installed
//! dependencies only warn and ask the operator whether to continue.

use crate::{cli::config::RuntimeConfig, error::PreflightError, supervisor::ServiceName};
use dialoguer::Confirm;
use std::path::PathBuf;
use tracing::{info, warn};

/// One directory to be vetted before launch.
#[derive(Debug, Clone)]
pub struct PreflightTarget {
    pub name: ServiceName,
    pub dir: PathBuf,
}

/// The two directories named by the runtime configuration.
pub fn targets(config: &RuntimeConfig) -> Vec<PreflightTarget> {
    vec![
        PreflightTarget {
            name: ServiceName::Backend,
            dir: config.backend.dir.clone(),
        },
        PreflightTarget {
            name: ServiceName::Frontend,
            dir: config.frontend.dir.clone(),
        },
    ]
}

/// Verify both working directories exist and carry a package.json.
pub fn check_structure(targets: &[PreflightTarget]) -> Result<(), PreflightError> {
    info!("Checking project structure...");
    for target in targets {
        if !target.dir.is_dir() {
            return Err(PreflightError::MissingDirectory {
                name: target.name,
                path: target.dir.clone(),
            });
        }
        if !target.dir.join("package.json").is_file() {
            return Err(PreflightError::MissingManifest {
                name: target.name,
                path: target.dir.clone(),
            });
        }
    }
    info!("Project structure verified");
    Ok(())
}

/// Verify the node/npm toolchain is on PATH.
pub fn check_tools() -> Result<(), PreflightError> {
    for tool in ["node", "npm"] {
        let probe = std::process::Command::new(tool)
            .arg("--version")
            .output();
        match probe {
            Ok(output) if output.status.success() => {}
            _ => return Err(PreflightError::MissingTool { tool }),
        }
    }
    Ok(())
}

/// Services whose node_modules directory is absent.
pub fn missing_dependencies(targets: &[PreflightTarget]) -> Vec<&PreflightTarget> {
    targets
        .iter()
        .filter(|target| !target.dir.join("node_modules").is_dir())
        .collect()
}

/// Warn about missing dependencies and ask the operator whether to proceed
/// anyway. `assume_yes` skips the prompt (for unattended runs).
pub fn confirm_missing_dependencies(
    missing: &[&PreflightTarget],
    assume_yes: bool,
) -> Result<(), PreflightError> {
    let names: Vec<_> = missing.iter().map(|t| t.name.label()).collect();
    warn!("Missing dependencies in: {}", names.join(", "));
    warn!("Run the following commands to install dependencies:");
    for target in missing {
        warn!("  cd {} && npm install", target.dir.display());
    }

    if assume_yes {
        warn!("Continuing anyway (--yes)");
        return Ok(());
    }

    let proceed = Confirm::new()
        .with_prompt("Continue anyway?")
        .default(false)
        .interact()?;
    if proceed {
        Ok(())
    } else {
        Err(PreflightError::Declined)
    }
}
