//! Service launcher
//!
//! Spawning does not wait for the child's own readiness. Each service gets a
//! fixed settle delay after which liveness is sampled exactly once: still
//! alive means the launch is reported as running, already exited means it
//! failed. A slow starter can be misreported as failed and a crash just past
//! the delay is only caught later by the monitor; the fixed-delay policy is
//! kept because the alternatives change observable startup timing.

use super::{
    output::{self, OutputLine},
    service::{ManagedService, ServiceState},
};
use crate::error::LaunchError;
use std::process::Stdio;
use tokio::{process::Command, sync::mpsc::UnboundedSender};
use tracing::{debug, info};

/// Spawn one service, wire up its output consumer, and sample liveness after
/// the settle delay.
///
/// The consumer task is registered before liveness is sampled so output from
/// an early failure is still captured.
pub async fn launch(
    service: &mut ManagedService,
    output_tx: &UnboundedSender<OutputLine>,
    noise_markers: &[String],
) -> Result<(), LaunchError> {
    let name = service.name();
    let spec = &service.spec;

    let (program, args) = spec
        .command
        .split_first()
        .ok_or(LaunchError::EmptyCommand { name })?;

    info!("Starting {} server in {}...", name, spec.dir.display());
    debug!("{name}: command {:?}, env overlay {:?}", spec.command, spec.env);

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&spec.dir)
        .envs(spec.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
        name,
        command: spec.command.join(" "),
        source,
    })?;
    debug!("{name}: spawned with PID {:?}", child.id());

    // Pipes are always present: both were requested above and the child has
    // not been waited on yet.
    if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
        output::spawn_consumer(name, stdout, stderr, output_tx.clone(), noise_markers.to_vec());
    }

    let settle_delay = spec.settle_delay;

    // Stow the handle before sleeping: if the caller is cancelled by a
    // termination signal mid-settle, the reaper must still find this child.
    service.child = Some(child);

    tokio::time::sleep(settle_delay).await;

    let Some(child) = service.child.as_mut() else {
        // The handle is only taken by the reaper, which cannot run while the
        // caller holds this exclusive borrow.
        return Ok(());
    };
    match child.try_wait() {
        Ok(None) => {
            service.state = ServiceState::Running;
            info!("{name} server started successfully");
            Ok(())
        }
        Ok(Some(status)) => {
            service.state = ServiceState::Failed;
            Err(LaunchError::ExitedDuringSettle { name, status })
        }
        Err(source) => {
            service.state = ServiceState::Failed;
            Err(LaunchError::Poll { name, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::service::{ServiceName, ServiceSpec};
    use std::{path::PathBuf, time::Duration};
    use tokio::sync::mpsc;

    fn spec(command: &[&str], settle: Duration) -> ServiceSpec {
        ServiceSpec {
            name: ServiceName::Backend,
            command: command.iter().map(|s| s.to_string()).collect(),
            dir: PathBuf::from("."),
            env: vec![],
            settle_delay: settle,
        }
    }

    #[tokio::test]
    async fn child_alive_after_settle_is_running() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut service =
            ManagedService::new(spec(&["sleep", "5"], Duration::from_millis(100)));

        launch(&mut service, &tx, &[]).await.unwrap();
        assert_eq!(service.state, ServiceState::Running);
        assert!(service.pid().is_some());

        // kill_on_drop cleans the sleep up when the handle is dropped.
    }

    #[tokio::test]
    async fn child_exiting_within_settle_is_failed() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut service =
            ManagedService::new(spec(&["sh", "-c", "exit 3"], Duration::from_millis(200)));

        let err = launch(&mut service, &tx, &[]).await.unwrap_err();
        assert!(matches!(err, LaunchError::ExitedDuringSettle { .. }));
        assert_eq!(service.state, ServiceState::Failed);
    }

    #[tokio::test]
    async fn unspawnable_command_reports_spawn_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut service = ManagedService::new(spec(
            &["definitely-not-a-real-binary-7f3a"],
            Duration::from_millis(10),
        ));

        let err = launch(&mut service, &tx, &[]).await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert_eq!(service.state, ServiceState::Pending);
        assert!(service.child.is_none());
    }

    #[tokio::test]
    async fn early_failure_output_is_still_captured() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut service = ManagedService::new(spec(
            &["sh", "-c", "echo address already in use; exit 1"],
            Duration::from_millis(200),
        ));

        let err = launch(&mut service, &tx, &[]).await.unwrap_err();
        assert!(matches!(err, LaunchError::ExitedDuringSettle { .. }));

        let line = rx.recv().await.unwrap();
        assert_eq!(line.text, "address already in use");
    }
}
