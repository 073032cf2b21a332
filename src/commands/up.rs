//! The `up` command: preflight, launch both servers, supervise until a
//! signal or a child death, then reap.

use super::common::build_tokio_runtime;
use crate::{
    cli::{
        config::{load_runtime_config, RuntimeConfig},
        options::UpArgs,
    },
    preflight,
    supervisor::{monitor, output, reaper, MonitorOutcome, Supervisor},
};
use eyre::eyre;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// How long to wait for the printer task to flush trailing child output
/// after the reaper has run.
const OUTPUT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

pub fn handle_up(args: &UpArgs) -> eyre::Result<()> {
    let config = load_runtime_config(&args.common)?;

    // Preflight gates launch; a failure here aborts before any process
    // exists, so there is nothing to reap.
    let targets = preflight::targets(&config);
    preflight::check_structure(&targets)?;
    preflight::check_tools()?;
    let missing = preflight::missing_dependencies(&targets);
    if missing.is_empty() {
        info!("Dependencies verified");
    } else {
        preflight::confirm_missing_dependencies(&missing, args.yes)?;
    }

    let runtime = build_tokio_runtime()?;
    runtime.block_on(supervise(config))
}

/// Launch, monitor, and reap. Every exit path from here routes through the
/// reaper, so no child outlives the supervisor.
async fn supervise(config: RuntimeConfig) -> eyre::Result<()> {
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let printer = output::spawn_printer(output_rx);

    // Signal streams exist before the first spawn: a SIGTERM landing during
    // a settle delay must reap whatever is already running, not kill this
    // process with children still attached.
    let mut signals = monitor::TerminationSignals::new();

    let mut supervisor = Supervisor::new(
        config.service_specs(),
        config.supervisor_settings(),
        output_tx,
    );

    let launched = tokio::select! {
        result = supervisor.launch_all() => Some(result),
        signal = signals.recv() => {
            info!("Received {signal} during startup, shutting down servers...");
            None
        }
    };
    let Some(launch_result) = launched else {
        reaper::shutdown(&mut supervisor).await;
        flush_output(supervisor, printer).await;
        info!("Shutdown complete");
        return Ok(());
    };
    if let Err(err) = launch_result {
        error!("Launch failed: {err}");
        reaper::shutdown(&mut supervisor).await;
        flush_output(supervisor, printer).await;
        return Err(err.into());
    }

    print_status(&config);

    let outcome = monitor::run(&mut supervisor, &mut signals).await;
    reaper::shutdown(&mut supervisor).await;
    flush_output(supervisor, printer).await;

    match outcome {
        MonitorOutcome::Interrupted => {
            info!("Shutdown complete");
            Ok(())
        }
        MonitorOutcome::ServiceExited { name, status } => {
            Err(eyre!("{name} server exited unexpectedly ({status})"))
        }
    }
}

/// Drop the supervisor (and with it the last in-process sender) and give the
/// printer a moment to drain whatever the consumers forwarded before their
/// streams closed.
async fn flush_output(supervisor: Supervisor, printer: tokio::task::JoinHandle<()>) {
    drop(supervisor);
    let _ = tokio::time::timeout(OUTPUT_FLUSH_TIMEOUT, printer).await;
}

fn print_status(config: &RuntimeConfig) {
    info!("Development servers are running!");
    info!("Frontend:  http://localhost:{}", config.frontend.port);
    info!("Backend:   http://localhost:{}", config.backend.port);
    info!("Health:    http://localhost:{}/health", config.backend.port);
    info!("API docs:  {}", config.api_base_url());
    info!("Press Ctrl-C to stop both servers");
}
