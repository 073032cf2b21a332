//! Supervised service types

use std::{fmt, path::PathBuf, time::Duration};
use tokio::process::Child;

/// Logical name of a supervised service. The set is fixed: this tool
/// supervises exactly one backend and one frontend per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
    Backend,
    Frontend,
}

impl ServiceName {
    /// Lowercase label used for output attribution and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceName::Backend => "backend",
            ServiceName::Frontend => "frontend",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything needed to launch one service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: ServiceName,
    /// Start command as an argument vector.
    pub command: Vec<String>,
    /// Working directory the command runs in. Verified by preflight, not
    /// re-verified at launch.
    pub dir: PathBuf,
    /// Environment overlay merged onto the inherited environment; overlay
    /// keys win.
    pub env: Vec<(String, String)>,
    /// Fixed wait after spawning before liveness is sampled once.
    pub settle_delay: Duration,
}

/// Lifecycle state of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Declared but not yet launched.
    Pending,
    /// Survived its settle delay.
    Running,
    /// Terminated by the supervisor.
    Stopped,
    /// Exited on its own, either during the settle window or while being
    /// monitored.
    Failed,
}

/// One supervised child. The supervisor owns the process handle exclusively;
/// at most one live handle exists per logical name.
#[derive(Debug)]
pub struct ManagedService {
    pub spec: ServiceSpec,
    pub child: Option<Child>,
    pub state: ServiceState,
}

impl ManagedService {
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            child: None,
            state: ServiceState::Pending,
        }
    }

    pub fn name(&self) -> ServiceName {
        self.spec.name
    }

    /// OS pid of the live child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }
}
