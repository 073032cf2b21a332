//! Shutdown and reaping
//!
//! The reaper terminates every child the supervisor still holds a handle to,
//! escalating from a graceful stop request to SIGKILL after the grace
//! period. It runs exactly once per supervised run regardless of which exit
//! path invokes it; later calls are no-ops.

use super::{
    service::{ManagedService, ServiceState},
    Supervisor,
};
use futures::future::join_all;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Terminate all currently live children. Idempotent; the first caller
/// performs the whole sequence, everyone after that returns immediately.
/// Children that already exited are skipped. The two services are stopped
/// concurrently -- no ordering is guaranteed between them.
pub async fn shutdown(supervisor: &mut Supervisor) {
    if !supervisor.begin_shutdown() {
        debug!("Shutdown already in progress, ignoring");
        return;
    }

    info!("Shutting down servers...");
    let grace = supervisor.settings().grace_period;
    join_all(
        supervisor
            .services_mut()
            .iter_mut()
            .map(|service| stop_service(service, grace)),
    )
    .await;
    info!("Cleanup completed");
}

/// Stop one service: skip if already dead, otherwise request a graceful
/// stop, wait up to the grace period, then kill.
async fn stop_service(service: &mut ManagedService, grace: Duration) {
    let Some(mut child) = service.child.take() else {
        return;
    };
    let name = service.name();

    match child.try_wait() {
        Ok(Some(status)) => {
            // Crash case: no termination request is sent to a dead handle.
            debug!("{name} already exited ({status}), nothing to terminate");
            if service.state == ServiceState::Running {
                service.state = ServiceState::Failed;
            }
            return;
        }
        Ok(None) => {}
        Err(e) => {
            warn!("{name}: failed to poll child before termination: {e}");
        }
    }

    info!("Stopping {name} server...");
    request_graceful_stop(name, &mut child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!("{name} exited gracefully ({status})");
        }
        Ok(Err(e)) => {
            warn!("{name}: failed waiting for exit: {e}");
        }
        Err(_) => {
            warn!("{name} did not exit within the grace period, killing");
            // No further wait: the runtime reaps the killed child in the
            // background, and kill_on_drop backstops a failed kill.
            let _ = child.start_kill();
        }
    }
    service.state = ServiceState::Stopped;
}

#[cfg(unix)]
fn request_graceful_stop(name: super::ServiceName, child: &mut Child) {
    use nix::{
        sys::signal::{kill, Signal},
        unistd::Pid,
    };

    let Some(pid) = child.id() else {
        return;
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => debug!("Sent SIGTERM to {name} (PID {pid})"),
        Err(e) => warn!("Failed to send SIGTERM to {name} (PID {pid}): {e}"),
    }
}

/// There is no graceful stop on Windows; killing is the stop request.
#[cfg(not(unix))]
fn request_graceful_stop(name: super::ServiceName, child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill {name}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::{ServiceName, ServiceSpec, SupervisorSettings};
    use nix::{sys::signal, unistd::Pid};
    use std::{path::PathBuf, time::Instant};
    use tokio::sync::mpsc;

    fn spec(name: ServiceName, command: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name,
            command: command.iter().map(|s| s.to_string()).collect(),
            dir: PathBuf::from("."),
            env: vec![],
            settle_delay: Duration::from_millis(50),
        }
    }

    fn settings(grace_ms: u64) -> SupervisorSettings {
        SupervisorSettings {
            grace_period: Duration::from_millis(grace_ms),
            ..Default::default()
        }
    }

    /// Wait until the pid is gone (fully reaped), up to a bound.
    async fn assert_eventually_dead(pid: u32) {
        for _ in 0..50 {
            if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("PID {pid} still alive");
    }

    #[tokio::test]
    async fn graceful_children_are_not_force_killed() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![
                spec(ServiceName::Backend, &["sleep", "10"]),
                spec(ServiceName::Frontend, &["sleep", "10"]),
            ],
            settings(2000),
            tx,
        );
        supervisor.launch_all().await.unwrap();
        let pids: Vec<_> = supervisor
            .services()
            .iter()
            .map(|s| s.pid().unwrap())
            .collect();

        let start = Instant::now();
        shutdown(&mut supervisor).await;

        // sleep dies on SIGTERM, well inside the grace period.
        assert!(start.elapsed() < Duration::from_millis(1500));
        assert_eq!(supervisor.live_handles(), 0);
        for pid in pids {
            assert_eventually_dead(pid).await;
        }
    }

    #[tokio::test]
    async fn stubborn_children_are_killed_after_the_grace_period() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![spec(
                ServiceName::Backend,
                &["sh", "-c", "trap '' TERM; while true; do sleep 0.05; done"],
            )],
            settings(300),
            tx,
        );
        supervisor.launch_all().await.unwrap();
        let pid = supervisor.services()[0].pid().unwrap();

        let start = Instant::now();
        shutdown(&mut supervisor).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(300), "escalated too early");
        assert!(elapsed < Duration::from_secs(2));
        assert_eq!(supervisor.live_handles(), 0);
        assert_eventually_dead(pid).await;
    }

    #[tokio::test]
    async fn already_exited_children_are_skipped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![spec(ServiceName::Backend, &["sleep", "5"])],
            settings(5000),
            tx,
        );
        supervisor.launch_all().await.unwrap();

        // Let the child die before the reaper runs.
        let pid = supervisor.services()[0].pid().unwrap();
        signal::kill(Pid::from_raw(pid as i32), signal::Signal::SIGKILL).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let start = Instant::now();
        shutdown(&mut supervisor).await;

        // No termination request, no grace wait.
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(supervisor.live_handles(), 0);
    }

    #[tokio::test]
    async fn second_shutdown_performs_no_termination() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![spec(ServiceName::Backend, &["sleep", "10"])],
            settings(1000),
            tx,
        );
        supervisor.launch_all().await.unwrap();
        shutdown(&mut supervisor).await;
        assert_eq!(supervisor.live_handles(), 0);

        // Plant a fresh child behind the reaper's back; a second call must
        // not touch it.
        let child = tokio::process::Command::new("sleep")
            .arg("10")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        supervisor.services_mut()[0].child = Some(child);

        shutdown(&mut supervisor).await;
        let planted = supervisor.services_mut()[0].child.as_mut().unwrap();
        assert!(planted.try_wait().unwrap().is_none(), "child was reaped twice");
    }

    #[tokio::test]
    async fn concurrent_shutdown_calls_terminate_once() {
        use std::sync::Arc;

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(
            vec![spec(ServiceName::Backend, &["sleep", "10"])],
            settings(1000),
            tx,
        );
        supervisor.launch_all().await.unwrap();
        let pid = supervisor.services()[0].pid().unwrap();
        let supervisor = Arc::new(tokio::sync::Mutex::new(supervisor));

        // Two callers race for the claim; both must complete cleanly.
        let first = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { shutdown(&mut *supervisor.lock().await).await }
        });
        let second = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { shutdown(&mut *supervisor.lock().await).await }
        });
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        let mut supervisor = supervisor.lock().await;
        assert_eq!(supervisor.live_handles(), 0);
        assert_eventually_dead(pid).await;

        // The claim from the winning caller persists: a later call still
        // performs no termination.
        let child = tokio::process::Command::new("sleep")
            .arg("10")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        supervisor.services_mut()[0].child = Some(child);
        shutdown(&mut supervisor).await;
        let planted = supervisor.services_mut()[0].child.as_mut().unwrap();
        assert!(planted.try_wait().unwrap().is_none(), "child was reaped twice");
    }

    #[tokio::test]
    async fn shutdown_on_an_empty_set_is_fine() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor::new(vec![], SupervisorSettings::default(), tx);
        shutdown(&mut supervisor).await;
        assert_eq!(supervisor.live_handles(), 0);
    }
}
