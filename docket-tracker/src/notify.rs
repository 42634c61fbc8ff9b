//! User-facing notifications
//!
//! Rendering is external; trackers only emit [`Notice`]s and, on
//! authentication failures, ask for a navigation to the login entry point.

use docket_client::ClientError;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A toast-style message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Map an error class onto what the user should read
    pub fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Authentication(_) => {
                Self::error("Your session has expired. Please sign in again.")
            }
            ClientError::Validation(message) => Self::new(NoticeLevel::Warning, message.clone()),
            ClientError::Transport(_) => Self::error("Could not reach the pipeline service"),
            ClientError::Decode(_) | ClientError::InvariantViolation(_) => {
                Self::error("Unexpected response from the pipeline service")
            }
            ClientError::Remote { message, .. } => Self::error(message.clone()),
        }
    }
}

/// Sink for user-facing notices and the login redirect side effect
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn redirect_to_login(&self);
}

/// Notifier that mirrors notices into tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }

    fn redirect_to_login(&self) {
        tracing::warn!("Authentication required; redirecting to login");
    }
}

/// Surface `err` to the user.
///
/// Authentication errors additionally schedule a login redirect after
/// `redirect_delay`, so an in-flight render is not interrupted.
pub fn report_error(notifier: &Arc<dyn Notifier>, err: &ClientError, redirect_delay: Duration) {
    notifier.notify(Notice::from_error(err));

    if err.is_authentication() {
        let notifier = Arc::clone(notifier);
        tokio::spawn(async move {
            tokio::time::sleep(redirect_delay).await;
            notifier.redirect_to_login();
        });
    }
}
