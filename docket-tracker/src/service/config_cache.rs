//! Pipeline configuration cache
//!
//! Loads the config list once per authenticated session. Load attempts are
//! capped; once the cap is reached further loads return the last error
//! without touching the network until the session changes or a mutation
//! forces a reload.

use docket_client::{AuthStatus, ClientError, Result, Session};
use docket_core::domain::PipelineConfig;
use docket_core::dto::pipeline::PipelineConfigDraft;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::notify::{Notice, Notifier, report_error};
use crate::repository::ConfigRepository;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Where the cache is in its load lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(ClientError),
}

/// Explicit cache state, owned by one [`ConfigCache`] instance
#[derive(Debug, Clone, PartialEq)]
pub struct CacheState {
    /// Consecutive failed load attempts
    pub attempts: u32,
    pub loaded_once: bool,
    pub status: LoadStatus,
    pub configs: Arc<Vec<PipelineConfig>>,
    /// Last authentication status the cache reacted to
    pub auth: AuthStatus,
}

impl CacheState {
    fn new(auth: AuthStatus) -> Self {
        Self {
            attempts: 0,
            loaded_once: false,
            status: LoadStatus::Idle,
            configs: Arc::new(Vec::new()),
            auth,
        }
    }

    /// Forget the cached list so the next load fetches again
    fn invalidate(&mut self) {
        self.configs = Arc::new(Vec::new());
        self.loaded_once = false;
    }

    fn last_error(&self) -> Option<ClientError> {
        match &self.status {
            LoadStatus::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }
}

pub struct ConfigCache {
    repository: Arc<dyn ConfigRepository>,
    session: Arc<dyn Session>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<CacheState>,
    /// Serializes loads so concurrent callers share one request
    load_lock: tokio::sync::Mutex<()>,
    max_attempts: u32,
    backoff: Duration,
    redirect_delay: Duration,
}

impl ConfigCache {
    pub fn new(
        repository: Arc<dyn ConfigRepository>,
        session: Arc<dyn Session>,
        notifier: Arc<dyn Notifier>,
        config: &TrackerConfig,
    ) -> Self {
        let auth = session.status();
        Self {
            repository,
            session,
            notifier,
            state: Mutex::new(CacheState::new(auth)),
            load_lock: tokio::sync::Mutex::new(()),
            max_attempts: config.max_load_attempts.max(1),
            backoff: config.load_backoff,
            redirect_delay: config.login_redirect_delay,
        }
    }

    /// Load the config list, gated by the session's authentication status
    ///
    /// - `Loading`: no-op, returns whatever is cached
    /// - `Unauthenticated`: clears the cache and returns an empty list
    /// - `Authenticated`: fetches unless already loaded or out of attempts
    pub async fn load(&self) -> Result<Arc<Vec<PipelineConfig>>> {
        let _load = self.load_lock.lock().await;
        self.load_locked(false).await
    }

    /// Load bypassing the loaded-once guard and the attempt counter
    ///
    /// Waits for any load already in flight, then always issues a new request
    /// while authenticated.
    pub async fn reload(&self) -> Result<Arc<Vec<PipelineConfig>>> {
        let _load = self.load_lock.lock().await;
        self.load_locked(true).await
    }

    /// Body of [`load`](Self::load); the caller holds `load_lock`
    async fn load_locked(&self, force: bool) -> Result<Arc<Vec<PipelineConfig>>> {
        let auth = self.session.status();
        self.on_auth_status(auth);

        match auth {
            AuthStatus::Loading => {
                debug!("Session still loading, deferring config load");
                return Ok(self.configs());
            }
            AuthStatus::Unauthenticated => return Ok(self.configs()),
            AuthStatus::Authenticated => {}
        }

        {
            let mut state = self.lock_state();
            if force {
                state.loaded_once = false;
                state.attempts = 0;
            }
            if state.loaded_once {
                return Ok(Arc::clone(&state.configs));
            }
            if state.attempts >= self.max_attempts {
                debug!(attempts = state.attempts, "Config load attempts exhausted");
                return Err(state.last_error().unwrap_or_else(|| {
                    ClientError::Transport("config load attempts exhausted".to_string())
                }));
            }
        }

        self.fetch().await
    }

    /// Repeat [`load`](Self::load) with exponential backoff until it
    /// succeeds or the attempt cap is reached
    pub async fn ensure_loaded(&self) -> Result<Arc<Vec<PipelineConfig>>> {
        let mut delay = self.backoff;

        loop {
            match self.load().await {
                Ok(configs) => return Ok(configs),
                Err(err) => {
                    if self.is_exhausted() {
                        return Err(err);
                    }
                    warn!("Config load failed, retrying in {:?}: {}", delay, err);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// React to an authentication status change
    ///
    /// Leaving `Authenticated` resets the loaded-once flag and the attempt
    /// counter; `Unauthenticated` also empties the cache.
    pub fn on_auth_status(&self, status: AuthStatus) {
        let mut state = self.lock_state();
        let previous = state.auth;
        state.auth = status;

        if previous == AuthStatus::Authenticated && status != AuthStatus::Authenticated {
            info!(?status, "Session left authenticated state, resetting config cache");
            state.loaded_once = false;
            state.attempts = 0;
            state.status = LoadStatus::Idle;
        }

        if status == AuthStatus::Unauthenticated && !state.configs.is_empty() {
            state.configs = Arc::new(Vec::new());
            state.status = LoadStatus::Idle;
        }
    }

    /// Follow session status changes, loading whenever it becomes authenticated
    pub fn watch_session(
        self: &Arc<Self>,
        mut statuses: watch::Receiver<AuthStatus>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                let status = *statuses.borrow_and_update();
                cache.on_auth_status(status);

                if status == AuthStatus::Authenticated {
                    if let Err(e) = cache.load().await {
                        debug!("Config load after sign-in failed: {}", e);
                    }
                }

                if statuses.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Create a config, then force a fresh load
    pub async fn create(&self, draft: PipelineConfigDraft) -> Result<PipelineConfig> {
        let result = match validate_draft(&draft) {
            Ok(()) => self.repository.create(&draft).await,
            Err(err) => Err(err),
        };
        let created = self.settle(result)?;

        info!(config_id = %created.id, name = %created.name, "Created pipeline config");
        self.notifier.notify(Notice::success(format!(
            "Pipeline \"{}\" created",
            created.name
        )));
        self.refresh_after_mutation().await;
        Ok(created)
    }

    /// Replace a config, then force a fresh load
    pub async fn update(&self, config_id: &str, draft: PipelineConfigDraft) -> Result<PipelineConfig> {
        let result = match validate_id(config_id).and_then(|()| validate_draft(&draft)) {
            Ok(()) => self.repository.update(config_id, &draft).await,
            Err(err) => Err(err),
        };
        let updated = self.settle(result)?;

        info!(config_id, name = %updated.name, "Updated pipeline config");
        self.notifier.notify(Notice::success(format!(
            "Pipeline \"{}\" updated",
            updated.name
        )));
        self.refresh_after_mutation().await;
        Ok(updated)
    }

    /// Delete a config, then force a fresh load
    pub async fn delete(&self, config_id: &str) -> Result<()> {
        let result = match validate_id(config_id) {
            Ok(()) => self.repository.delete(config_id).await,
            Err(err) => Err(err),
        };
        self.settle(result)?;

        info!(config_id, "Deleted pipeline config");
        self.notifier.notify(Notice::success("Pipeline deleted"));
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Read-only view of the cached configs
    pub fn configs(&self) -> Arc<Vec<PipelineConfig>> {
        Arc::clone(&self.lock_state().configs)
    }

    pub fn get(&self, config_id: &str) -> Option<PipelineConfig> {
        self.lock_state()
            .configs
            .iter()
            .find(|config| config.id == config_id)
            .cloned()
    }

    /// Cached configs able to process documents of `document_type`
    pub fn compatible(&self, document_type: &str) -> Vec<PipelineConfig> {
        self.lock_state()
            .configs
            .iter()
            .filter(|config| config.accepts(document_type))
            .cloned()
            .collect()
    }

    /// Snapshot of the cache state
    pub fn state(&self) -> CacheState {
        self.lock_state().clone()
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock_state().attempts >= self.max_attempts
    }

    async fn fetch(&self) -> Result<Arc<Vec<PipelineConfig>>> {
        self.lock_state().status = LoadStatus::Loading;
        debug!("Fetching pipeline configs");

        let result = self.repository.list().await;

        // The session may have ended while the request was in flight
        if self.session.status() != AuthStatus::Authenticated {
            debug!("Session changed during config load, dropping response");
            self.on_auth_status(self.session.status());
            return Ok(self.configs());
        }

        match result {
            Ok(configs) => {
                let configs = Arc::new(configs);
                {
                    let mut state = self.lock_state();
                    state.configs = Arc::clone(&configs);
                    state.loaded_once = true;
                    state.attempts = 0;
                    state.status = LoadStatus::Ready;
                }
                info!(count = configs.len(), "Loaded pipeline configs");
                self.notifier.notify(Notice::info(format!(
                    "Loaded {} pipeline configurations",
                    configs.len()
                )));
                Ok(configs)
            }
            Err(err) => {
                let attempts = {
                    let mut state = self.lock_state();
                    // Only transport and server errors are worth another attempt
                    state.attempts = if err.is_retryable() {
                        state.attempts + 1
                    } else {
                        self.max_attempts
                    };
                    state.status = LoadStatus::Failed(err.clone());
                    if err.is_authentication() {
                        state.invalidate();
                    }
                    state.attempts
                };

                if attempts >= self.max_attempts {
                    error!(attempts, "Giving up loading pipeline configs: {}", err);
                } else {
                    warn!(
                        "Failed to load pipeline configs (attempt {}/{}): {}",
                        attempts, self.max_attempts, err
                    );
                }
                report_error(&self.notifier, &err, self.redirect_delay);
                Err(err)
            }
        }
    }

    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.reload().await {
            warn!("Failed to refresh pipeline configs after change: {}", e);
        }
    }

    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            if err.is_authentication() {
                warn!("Session rejected by the pipeline service, dropping cached configs");
                self.lock_state().invalidate();
            }
            report_error(&self.notifier, err, self.redirect_delay);
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_id(config_id: &str) -> Result<()> {
    if config_id.trim().is_empty() {
        return Err(ClientError::validation("select a pipeline first"));
    }
    Ok(())
}

fn validate_draft(draft: &PipelineConfigDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(ClientError::validation("pipeline name is required"));
    }
    if draft.pipeline_type.trim().is_empty() {
        return Err(ClientError::validation("pipeline type is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeConfigs, RecordingNotifier, config};
    use assert_matches::assert_matches;
    use docket_client::SessionHandle;

    struct Harness {
        cache: Arc<ConfigCache>,
        fake: Arc<FakeConfigs>,
        session: SessionHandle,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(session: SessionHandle) -> Harness {
        let fake = Arc::new(FakeConfigs::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let cache = Arc::new(ConfigCache::new(
            fake.clone(),
            Arc::new(session.clone()),
            notifier.clone(),
            &TrackerConfig::default(),
        ));
        Harness {
            cache,
            fake,
            session,
            notifier,
        }
    }

    fn draft(name: &str) -> PipelineConfigDraft {
        PipelineConfigDraft {
            name: name.to_string(),
            pipeline_type: "invoice".to_string(),
            description: None,
            steps: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_load_is_noop_while_session_loading() {
        let h = harness(SessionHandle::new());

        let configs = h.cache.load().await.unwrap();

        assert!(configs.is_empty());
        assert_eq!(h.fake.list.calls(), 0);
    }

    #[tokio::test]
    async fn test_loads_once_per_session() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);

        assert_eq!(h.cache.load().await.unwrap().len(), 1);
        assert_eq!(h.cache.load().await.unwrap().len(), 1);

        assert_eq!(h.fake.list.calls(), 1);
        let state = h.cache.state();
        assert!(state.loaded_once);
        assert_eq!(state.status, LoadStatus::Ready);
    }

    #[tokio::test]
    async fn test_fourth_load_after_three_failures_makes_no_request() {
        let h = harness(SessionHandle::authenticated("token"));
        for _ in 0..3 {
            h.fake.list.err(ClientError::remote(503, "unavailable"));
        }

        for _ in 0..3 {
            assert!(h.cache.load().await.is_err());
        }
        let err = h.cache.load().await.unwrap_err();

        assert_eq!(err, ClientError::remote(503, "unavailable"));
        assert_eq!(h.fake.list.calls(), 3);
        assert!(h.cache.is_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_exhausts_attempts_and_redirects() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.err(ClientError::Authentication("expired".into()));

        let err = h.cache.load().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(h.cache.is_exhausted());

        // No further requests once exhausted
        assert!(h.cache.load().await.is_err());
        assert_eq!(h.fake.list.calls(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.notifier.redirects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_reload_drops_cached_configs() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        h.fake.list.err(ClientError::Authentication("expired".into()));

        assert_eq!(h.cache.load().await.unwrap().len(), 1);
        let err = h.cache.reload().await.unwrap_err();

        assert!(err.is_authentication());
        assert!(h.cache.configs().is_empty());
        assert!(h.cache.get("pipe-A").is_none());
        assert!(h.cache.compatible("invoice").is_empty());
        assert!(!h.cache.state().loaded_once);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.notifier.redirects(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_mutation_drops_cached_configs() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        h.fake.delete.err(ClientError::Authentication("expired".into()));

        h.cache.load().await.unwrap();
        let err = h.cache.delete("pipe-A").await.unwrap_err();

        assert!(err.is_authentication());
        assert!(h.cache.configs().is_empty());
        assert!(!h.cache.state().loaded_once);
        assert_eq!(h.fake.list.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_refetches_after_in_flight_load() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        let gate = h.fake.list.hold_next();
        h.fake.create.ok(config("pipe-B", "invoice"));
        h.fake
            .list
            .ok(vec![config("pipe-A", "invoice"), config("pipe-B", "invoice")]);

        let (loaded, created, ()) = tokio::join!(
            h.cache.load(),
            h.cache.create(draft("Second")),
            async {
                tokio::task::yield_now().await;
                gate.notify_one();
            }
        );

        assert_eq!(loaded.unwrap().len(), 1);
        assert_eq!(created.unwrap().id, "pipe-B");
        assert_eq!(h.fake.list.calls(), 2);
        assert_eq!(h.cache.configs().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_clears_and_reauth_loads_exactly_once() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        h.fake.list.ok(vec![config("pipe-B", "receipt")]);

        h.cache.load().await.unwrap();

        h.session.sign_out();
        h.cache.on_auth_status(AuthStatus::Unauthenticated);
        let state = h.cache.state();
        assert!(state.configs.is_empty());
        assert!(!state.loaded_once);

        h.session.authenticate("token-2");
        h.cache.on_auth_status(AuthStatus::Authenticated);
        let configs = h.cache.load().await.unwrap();
        h.cache.load().await.unwrap();

        assert_eq!(configs[0].id, "pipe-B");
        assert_eq!(h.fake.list.calls(), 2);
    }

    #[tokio::test]
    async fn test_load_while_unauthenticated_clears_cache() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        h.cache.load().await.unwrap();

        h.session.sign_out();
        assert!(h.cache.load().await.unwrap().is_empty());
        assert!(!h.cache.state().loaded_once);
    }

    #[tokio::test]
    async fn test_watch_session_loads_on_sign_in() {
        let h = harness(SessionHandle::new());
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);

        let task = h.cache.watch_session(h.session.subscribe());
        tokio::task::yield_now().await;
        assert_eq!(h.fake.list.calls(), 0);

        h.session.authenticate("token");
        for _ in 0..10 {
            if h.cache.state().loaded_once {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(h.fake.list.calls(), 1);
        assert_eq!(h.cache.configs().len(), 1);
        task.abort();
    }

    #[tokio::test]
    async fn test_create_forces_fresh_load() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);
        h.fake.create.ok(config("pipe-B", "invoice"));
        h.fake
            .list
            .ok(vec![config("pipe-A", "invoice"), config("pipe-B", "invoice")]);

        h.cache.load().await.unwrap();
        let created = h.cache.create(draft("Second")).await.unwrap();

        assert_eq!(created.id, "pipe-B");
        assert_eq!(h.fake.list.calls(), 2);
        assert_eq!(h.cache.configs().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_forces_fresh_load_even_when_exhausted() {
        let h = harness(SessionHandle::authenticated("token"));
        for _ in 0..3 {
            h.fake.list.err(ClientError::Transport("connection refused".into()));
        }
        h.fake.delete.ok(());
        h.fake.list.ok(Vec::new());

        for _ in 0..3 {
            let _ = h.cache.load().await;
        }
        assert!(h.cache.is_exhausted());

        h.cache.delete("pipe-A").await.unwrap();

        assert_eq!(h.fake.list.calls(), 4);
        assert_eq!(h.cache.state().status, LoadStatus::Ready);
    }

    #[tokio::test]
    async fn test_mutations_validate_input() {
        let h = harness(SessionHandle::authenticated("token"));

        assert_matches!(h.cache.create(draft(" ")).await, Err(ClientError::Validation(_)));
        assert_matches!(h.cache.delete("").await, Err(ClientError::Validation(_)));
        assert_eq!(h.fake.create.calls(), 0);
        assert_eq!(h.fake.delete.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_loaded_backs_off_until_success() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.err(ClientError::Transport("connection refused".into()));
        h.fake.list.ok(vec![config("pipe-A", "invoice")]);

        let configs = h.cache.ensure_loaded().await.unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(h.fake.list.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_loaded_stops_at_attempt_cap() {
        let h = harness(SessionHandle::authenticated("token"));
        for _ in 0..5 {
            h.fake.list.err(ClientError::remote(502, "bad gateway"));
        }

        let err = h.cache.ensure_loaded().await.unwrap_err();

        assert_eq!(err, ClientError::remote(502, "bad gateway"));
        assert_eq!(h.fake.list.calls(), 3);
    }

    #[tokio::test]
    async fn test_lookup_and_compatibility() {
        let h = harness(SessionHandle::authenticated("token"));
        h.fake.list.ok(vec![
            config("pipe-A", "invoice"),
            config("pipe-B", "receipt"),
            config("pipe-C", "Invoice"),
        ]);
        h.cache.load().await.unwrap();

        assert_eq!(h.cache.get("pipe-B").unwrap().pipeline_type, "receipt");
        assert!(h.cache.get("pipe-Z").is_none());

        let ids: Vec<String> = h
            .cache
            .compatible("invoice")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["pipe-A", "pipe-C"]);
    }
}
