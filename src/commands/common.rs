//! Shared utilities for command handlers

use tracing::debug;

/// Build a Tokio multi-thread runtime with adaptive thread pool
/// configuration. The workload is a handful of mostly-idle tasks, so the
/// worker count is the CPU count capped at 8.
pub(crate) fn build_tokio_runtime() -> eyre::Result<tokio::runtime::Runtime> {
    let worker_threads = std::cmp::min(num_cpus::get(), 8);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("devpair-worker")
        .enable_all()
        .build()?;
    debug!("Tokio runtime created ({worker_threads} worker threads)");
    Ok(runtime)
}
