//! Per-id index of live polling subscriptions

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::Notify;

/// Shared control block of one subscription
///
/// `alive` is the liveness flag captured at subscribe time: a tick that
/// observes it false does nothing, whatever the state of its timer.
#[derive(Debug)]
pub(crate) struct PollControl {
    alive: AtomicBool,
    cleared: AtomicBool,
    wake: Notify,
}

impl PollControl {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            cleared: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    /// Mark the subscription dead; returns whether it was still alive
    pub(crate) fn retire(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn stop(&self) {
        self.retire();
        self.wake.notify_one();
    }

    fn clear(&self) {
        self.cleared.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }
}

/// Live subscriptions per tracked id
///
/// Owned by a tracker so its commands (cancel, retry) can clear polling for
/// the id they just changed.
#[derive(Debug, Default)]
pub struct PollRegistry {
    entries: Mutex<HashMap<String, Vec<Weak<PollControl>>>>,
}

impl PollRegistry {
    pub(crate) fn register(&self, id: &str, control: &Arc<PollControl>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let controls = entries.entry(id.to_string()).or_default();
        controls.retain(is_live);
        controls.push(Arc::downgrade(control));
    }

    /// Forget finished subscriptions for `id`, dropping the key once none remain
    pub(crate) fn prune(&self, id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(controls) = entries.get_mut(id) {
            controls.retain(is_live);
            if controls.is_empty() {
                entries.remove(id);
            }
        }
    }

    /// Whether any subscription entry is held for `id`
    pub fn is_tracking(&self, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Clear every live subscription for `id`; returns how many were cleared
    pub fn clear(&self, id: &str) -> usize {
        let controls = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .unwrap_or_default();

        let mut cleared = 0;
        for control in controls.iter().filter_map(Weak::upgrade) {
            if control.is_alive() {
                control.clear();
                cleared += 1;
            }
        }
        cleared
    }

    /// Number of live subscriptions for `id`
    pub fn active(&self, id: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|controls| {
                controls
                    .iter()
                    .filter(|weak| is_live(weak))
                    .count()
            })
            .unwrap_or(0)
    }
}

fn is_live(control: &Weak<PollControl>) -> bool {
    control.upgrade().is_some_and(|c| c.is_alive())
}
