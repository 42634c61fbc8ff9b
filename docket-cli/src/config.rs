//! Configuration module
//!
//! Resolved CLI settings and the collaborators built from them.

use docket_client::{PipelineClient, SessionHandle};
use docket_tracker::TrackerConfig;
use std::sync::Arc;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracker tunables, including the service URL
    pub tracker: TrackerConfig,
    /// Bearer token; without one every request fails locally
    pub token: Option<String>,
}

impl Config {
    /// Session for this invocation
    ///
    /// A CLI run never waits on a sign-in flow, so the session is either
    /// authenticated from the start or signed out.
    pub fn session(&self) -> SessionHandle {
        match &self.token {
            Some(token) => SessionHandle::authenticated(token.clone()),
            None => {
                let session = SessionHandle::new();
                session.sign_out();
                session
            }
        }
    }

    pub fn client(&self) -> Arc<PipelineClient> {
        Arc::new(PipelineClient::new(
            self.tracker.api_url.clone(),
            Arc::new(self.session()),
        ))
    }
}
