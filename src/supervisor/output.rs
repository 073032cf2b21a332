//! Child output streaming
//!
//! One consumer task per service owns both piped streams and forwards
//! surfaced lines into a single channel. A lone printer task drains that
//! channel, so lines from concurrent services never interleave mid-line.
//!
//! A closed or failed stream ends its consumer silently: streams close as a
//! matter of course when the child exits, and that event is the monitor's to
//! report, not the consumer's.

use super::service::ServiceName;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{ChildStderr, ChildStdout},
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

/// One line of child output attributed to its service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub name: ServiceName,
    pub text: String,
}

/// Decide whether a raw line is surfaced. Returns the trimmed text to relay,
/// or `None` for whitespace-only lines and lines containing a noise marker.
///
/// Matching is case-insensitive on the line side; `noise_markers` must
/// already be lowercase. [`spawn_consumer`] lowercases them once per
/// service, not once per line.
pub fn surfaced<'a>(line: &'a str, noise_markers: &[String]) -> Option<&'a str> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    if noise_markers
        .iter()
        .any(|marker| lower.contains(marker.as_str()))
    {
        return None;
    }
    Some(text)
}

/// Spawn the consumer task for one service's combined output.
///
/// The task reads stdout and stderr line-by-line, drops noise, and sends the
/// rest as labeled [`OutputLine`]s. It ends on its own when both streams
/// close or when the printer side goes away.
pub fn spawn_consumer(
    name: ServiceName,
    stdout: ChildStdout,
    stderr: ChildStderr,
    tx: UnboundedSender<OutputLine>,
    noise_markers: Vec<String>,
) -> JoinHandle<()> {
    // Lowercase the markers up front; the per-line loop only lowercases the
    // line itself.
    let noise_markers: Vec<String> = noise_markers
        .iter()
        .map(|marker| marker.to_lowercase())
        .collect();

    tokio::spawn(async move {
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            let line = tokio::select! {
                result = out_lines.next_line(), if out_open => match result {
                    Ok(Some(line)) => Some(line),
                    // EOF or read error both just mean this stream is done.
                    Ok(None) | Err(_) => {
                        out_open = false;
                        None
                    }
                },
                result = err_lines.next_line(), if err_open => match result {
                    Ok(Some(line)) => Some(line),
                    Ok(None) | Err(_) => {
                        err_open = false;
                        None
                    }
                },
            };

            let Some(line) = line else { continue };
            let Some(text) = surfaced(&line, &noise_markers) else {
                continue;
            };
            let message = OutputLine {
                name,
                text: text.to_string(),
            };
            if tx.send(message).is_err() {
                break;
            }
        }
    })
}

/// Spawn the single printer task that serializes all relayed output. Ends
/// when every sender handle has been dropped.
pub fn spawn_printer(mut rx: UnboundedReceiver<OutputLine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("[{}] {}", line.name, line.text);
        }
    })
}
