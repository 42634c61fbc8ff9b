//! Terminal output shared by the command handlers

use anyhow::{Context, Result};
use colored::*;
use docket_core::domain::ExecutionStatus;
use docket_tracker::{
    Notice, NoticeLevel, Notifier, PollOutcome, PollingMonitor, StatusSource, TrackerConfig,
};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Prints notices to stderr as colored one-liners
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let line = match notice.level {
            NoticeLevel::Success => format!("✓ {}", notice.message).green(),
            NoticeLevel::Info => notice.message.cyan(),
            NoticeLevel::Warning => format!("⚠ {}", notice.message).yellow(),
            NoticeLevel::Error => format!("✗ {}", notice.message).red(),
        };
        eprintln!("{}", line);
    }

    fn redirect_to_login(&self) {
        eprintln!(
            "{}",
            "  Sign in again and pass the new token with --token or DOCKET_TOKEN".dimmed()
        );
    }
}

/// Colorize an execution status for display
pub fn colorize_status(status: ExecutionStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        ExecutionStatus::Pending => status_str.yellow(),
        ExecutionStatus::Running | ExecutionStatus::Processing => status_str.cyan(),
        ExecutionStatus::Completed => status_str.green(),
        ExecutionStatus::Failed => status_str.red(),
        ExecutionStatus::Canceled => status_str.dimmed(),
    }
}

/// Render a progress percentage as a fixed-width bar
pub fn progress_bar(percent: u8) -> String {
    const WIDTH: usize = 30;
    let filled = usize::from(percent.min(100)) * WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "█".repeat(filled),
        "░".repeat(WIDTH - filled),
        percent
    )
}

/// Follow `id` until its outcome arrives, calling `on_update` for every
/// new snapshot
///
/// Returns `None` if the user interrupted the watch.
pub async fn watch<S, F>(
    source: Arc<S>,
    config: &TrackerConfig,
    id: &str,
    mut on_update: F,
) -> Result<Option<PollOutcome<S::Snapshot>>>
where
    S: StatusSource,
    F: FnMut(&S::Snapshot),
{
    let monitor = PollingMonitor::new(source, config);
    let (tx, mut rx) = oneshot::channel();
    let subscription = monitor.subscribe(id, monitor.default_interval(), move |outcome| {
        let _ = tx.send(outcome);
    });
    let mut updates = subscription.updates();

    loop {
        tokio::select! {
            biased;
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    on_update(&snapshot);
                }
            }
            outcome = &mut rx => {
                return outcome.map(Some).context("Polling stopped without an outcome");
            }
            _ = tokio::signal::ctrl_c() => {
                subscription.cancel();
                eprintln!("{}", "Stopped watching".dimmed());
                return Ok(None);
            }
        }
    }

    rx.await
        .map(Some)
        .context("Polling stopped without an outcome")
}
