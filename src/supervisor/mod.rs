//! Process lifecycle supervision
//!
//! The supervisor owns the two managed services, launches them in order,
//! watches their liveness, and tears them down exactly once. All mutable
//! state lives in the [`Supervisor`] context passed explicitly to each
//! component; the only synchronized datum is the shutdown-in-progress flag.

pub mod launcher;
pub mod monitor;
pub mod output;
pub mod reaper;
pub mod service;

pub use monitor::{MonitorOutcome, TerminationSignals};
pub use output::OutputLine;
pub use service::{ManagedService, ServiceName, ServiceSpec, ServiceState};

use crate::error::LaunchError;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::sync::mpsc::UnboundedSender;

/// Tunables shared by the monitor and the reaper.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Wait after a graceful stop request before escalating to SIGKILL.
    pub grace_period: Duration,
    /// Liveness poll cadence.
    pub poll_interval: Duration,
    /// Output lines containing any of these markers are suppressed.
    pub noise_markers: Vec<String>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            noise_markers: Vec::new(),
        }
    }
}

/// Owned context for one supervised run.
pub struct Supervisor {
    services: Vec<ManagedService>,
    settings: SupervisorSettings,
    output_tx: UnboundedSender<OutputLine>,
    shutdown_started: AtomicBool,
}

impl Supervisor {
    /// Build a supervisor over the given specs. Specs are launched in the
    /// order given; nothing is spawned yet.
    pub fn new(
        specs: Vec<ServiceSpec>,
        settings: SupervisorSettings,
        output_tx: UnboundedSender<OutputLine>,
    ) -> Self {
        Self {
            services: specs.into_iter().map(ManagedService::new).collect(),
            settings,
            output_tx,
            shutdown_started: AtomicBool::new(false),
        }
    }

    /// Launch every service in declaration order. The first failure aborts
    /// the sequence, so a later service is never attempted unless all
    /// earlier ones reported running.
    pub async fn launch_all(&mut self) -> Result<(), LaunchError> {
        for index in 0..self.services.len() {
            launcher::launch(
                &mut self.services[index],
                &self.output_tx,
                &self.settings.noise_markers,
            )
            .await?;
        }
        Ok(())
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn services(&self) -> &[ManagedService] {
        &self.services
    }

    pub fn service(&self, name: ServiceName) -> Option<&ManagedService> {
        self.services.iter().find(|service| service.name() == name)
    }

    pub(crate) fn services_mut(&mut self) -> &mut [ManagedService] {
        &mut self.services
    }

    /// Number of process handles still owned by the supervisor.
    pub fn live_handles(&self) -> usize {
        self.services
            .iter()
            .filter(|service| service.child.is_some())
            .count()
    }

    /// Atomically claim the shutdown sequence. Only the first caller gets
    /// `true`; everyone after that is a no-op.
    pub(crate) fn begin_shutdown(&self) -> bool {
        !self.shutdown_started.swap(true, Ordering::SeqCst)
    }

    /// Whether a shutdown has been started (by any path).
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_started.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    fn spec(name: ServiceName, command: &[&str], settle_ms: u64) -> ServiceSpec {
        ServiceSpec {
            name,
            command: command.iter().map(|s| s.to_string()).collect(),
            dir: PathBuf::from("."),
            env: vec![],
            settle_delay: Duration::from_millis(settle_ms),
        }
    }

    #[tokio::test]
    async fn launch_all_stops_at_the_first_failure() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![
                spec(ServiceName::Backend, &["false"], 100),
                spec(ServiceName::Frontend, &["sleep", "5"], 10),
            ],
            SupervisorSettings::default(),
            tx,
        );

        assert!(supervisor.launch_all().await.is_err());

        let frontend = supervisor.service(ServiceName::Frontend).unwrap();
        assert_eq!(frontend.state, ServiceState::Pending);
        assert!(frontend.child.is_none());
    }

    #[tokio::test]
    async fn launch_all_brings_both_services_up_in_order() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![
                spec(ServiceName::Backend, &["sleep", "5"], 50),
                spec(ServiceName::Frontend, &["sleep", "5"], 50),
            ],
            SupervisorSettings::default(),
            tx,
        );

        supervisor.launch_all().await.unwrap();
        assert!(supervisor.services().iter().all(ManagedService::is_running));
        assert_eq!(supervisor.live_handles(), 2);

        reaper::shutdown(&mut supervisor).await;
    }

    #[test]
    fn begin_shutdown_is_claimed_exactly_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(vec![], SupervisorSettings::default(), tx);

        assert!(!supervisor.is_shutting_down());
        assert!(supervisor.begin_shutdown());
        assert!(!supervisor.begin_shutdown());
        assert!(supervisor.is_shutting_down());
    }

    #[test]
    fn concurrent_shutdown_claims_have_a_single_winner() {
        use std::sync::{atomic::AtomicUsize, Arc};

        let (tx, _rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Supervisor::new(vec![], SupervisorSettings::default(), tx));
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let supervisor = Arc::clone(&supervisor);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if supervisor.begin_shutdown() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(supervisor.is_shutting_down());
    }
}
