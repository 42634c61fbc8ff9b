//! Snapshot storage shared by the trackers
//!
//! Entries are `Arc` snapshots. A fold reads the current snapshot and swaps
//! in a new one; stored values are never mutated, so references handed to
//! subscribers always show a complete state.

use docket_client::ClientError;
use docket_core::domain::Fold;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Result of folding one incoming value into the store
#[derive(Debug)]
pub(crate) enum Folded<T> {
    Stored(Arc<T>),
    Discarded(Arc<T>),
}

impl<T> Folded<T> {
    pub(crate) fn into_snapshot(self) -> Arc<T> {
        match self {
            Folded::Stored(snapshot) | Folded::Discarded(snapshot) => snapshot,
        }
    }
}

/// Map of id to the latest accepted snapshot
pub(crate) struct SnapshotStore<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> SnapshotStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Store `value` unconditionally
    pub(crate) fn replace(&self, id: &str, value: T) -> Arc<T> {
        let snapshot = Arc::new(value);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Arc::clone(&snapshot));
        snapshot
    }

    /// Fold `incoming` onto the stored snapshot for `id`.
    ///
    /// With nothing stored yet, `incoming` is stored as-is. The read and the
    /// swap happen under one write lock, so concurrent folds for the same id
    /// apply in arrival order.
    pub(crate) fn fold<I>(
        &self,
        id: &str,
        incoming: I,
        seed: impl FnOnce(I) -> T,
        fold: impl FnOnce(&T, I) -> Fold<T>,
    ) -> Folded<T> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let next = match entries.get(id) {
            None => seed(incoming),
            Some(current) => match fold(current, incoming) {
                Fold::Replace(next) => next,
                Fold::Discard => return Folded::Discarded(Arc::clone(current)),
            },
        };

        let snapshot = Arc::new(next);
        entries.insert(id.to_string(), Arc::clone(&snapshot));
        Folded::Stored(snapshot)
    }
}

/// Advisory "a call is in flight" flag
///
/// Concurrent calls share it; whichever finishes last clears it.
#[derive(Debug, Default)]
pub(crate) struct ProcessingFlag(AtomicBool);

impl ProcessingFlag {
    pub(crate) fn begin(&self) -> ProcessingGuard<'_> {
        self.0.store(true, Ordering::SeqCst);
        ProcessingGuard(&self.0)
    }

    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Last error observed by a tracker, for passive observers
#[derive(Debug, Default)]
pub(crate) struct ErrorSlot(Mutex<Option<ClientError>>);

impl ErrorSlot {
    pub(crate) fn set(&self, err: &ClientError) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.clone());
    }

    pub(crate) fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn get(&self) -> Option<ClientError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_larger(current: &u32, incoming: u32) -> Fold<u32> {
        if incoming > *current {
            Fold::Replace(incoming)
        } else {
            Fold::Discard
        }
    }

    #[test]
    fn test_fold_seeds_then_applies_rule() {
        let store = SnapshotStore::new();

        assert!(matches!(store.fold("a", 5, |v| v, keep_larger), Folded::Stored(v) if *v == 5));
        assert!(matches!(store.fold("a", 3, |v| v, keep_larger), Folded::Discarded(v) if *v == 5));
        assert!(matches!(store.fold("a", 9, |v| v, keep_larger), Folded::Stored(v) if *v == 9));
        assert_eq!(store.get("a").as_deref(), Some(&9));
    }

    #[test]
    fn test_fold_swaps_snapshots_instead_of_mutating() {
        let store = SnapshotStore::new();
        store.replace("a", 1);

        let before = store.get("a").unwrap();
        store.fold("a", 2, |v| v, keep_larger);

        assert_eq!(*before, 1);
        assert_eq!(*store.get("a").unwrap(), 2);
    }

    #[test]
    fn test_processing_flag_clears_on_drop() {
        let flag = ProcessingFlag::default();
        {
            let _guard = flag.begin();
            assert!(flag.get());
        }
        assert!(!flag.get());
    }

    #[test]
    fn test_error_slot() {
        let slot = ErrorSlot::default();
        slot.set(&ClientError::validation("nope"));
        assert_eq!(slot.get(), Some(ClientError::validation("nope")));
        slot.clear();
        assert_eq!(slot.get(), None);
    }
}
