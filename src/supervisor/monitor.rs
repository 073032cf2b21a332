//! Liveness monitoring
//!
//! Once both services are running, one loop polls their handles at a fixed
//! cadence while listening for termination signals. Either child exiting is
//! fatal for the whole session: the two services are tightly coupled (the
//! frontend is configured against the backend's address), so a survivor is
//! not kept alive alone.
//!
//! The loop only reports why it stopped. The caller runs the reaper; the
//! signal handler itself never performs cleanup.

use super::{service::ServiceState, Supervisor};
use std::process::ExitStatus;
use tracing::{error, info, warn};

/// Registered SIGINT/SIGTERM streams.
///
/// Created before the first child is spawned: from that point on a signal
/// must route through the reaper, so no phase of the run may be left with
/// the default disposition.
#[cfg(unix)]
pub struct TerminationSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn new() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        Self {
            sigint: signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler"),
            sigterm: signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler"),
        }
    }

    /// Wait for the next termination signal; returns its name for logging.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }
}

/// Windows fallback: Ctrl-C is the only termination signal.
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn new() -> Self {
        Self
    }

    pub async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl-C"
    }
}

impl Default for TerminationSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the monitor loop ended.
#[derive(Debug)]
pub enum MonitorOutcome {
    /// A termination signal arrived. Shutting down on request is a clean
    /// exit.
    Interrupted,
    /// A previously running child exited on its own.
    ServiceExited {
        name: super::ServiceName,
        status: ExitStatus,
    },
}

/// Poll both services until a termination signal arrives or one of them
/// dies. Responds to a signal within one poll interval; never busy-spins.
pub async fn run(
    supervisor: &mut Supervisor,
    signals: &mut TerminationSignals,
) -> MonitorOutcome {
    let mut poll = tokio::time::interval(supervisor.settings().poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = signals.recv() => {
                info!("Received {signal}, shutting down servers...");
                return MonitorOutcome::Interrupted;
            }
            _ = poll.tick() => {
                if let Some(outcome) = poll_services(supervisor) {
                    return outcome;
                }
            }
        }
    }
}

/// Sample every running handle once. Returns the fatal outcome if a child
/// has exited.
fn poll_services(supervisor: &mut Supervisor) -> Option<MonitorOutcome> {
    for service in supervisor.services_mut() {
        if !service.is_running() {
            continue;
        }
        let Some(child) = service.child.as_mut() else {
            continue;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                service.state = ServiceState::Failed;
                let name = service.name();
                error!("{name} process died ({status})");
                return Some(MonitorOutcome::ServiceExited { name, status });
            }
            Ok(None) => {}
            Err(e) => {
                // Transient poll failure; keep watching.
                warn!("{}: failed to poll child status: {e}", service.name());
            }
        }
    }
    None
}
