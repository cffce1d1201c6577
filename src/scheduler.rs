//! # Feature: Delayed Actions
//!
//! Owns every deferred job the bot runs (timed unmutes, reminder delivery).
//! At most one job is pending per subject key; scheduling again for the same
//! key replaces the earlier job, which then never fires.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Keyed scheduler replacing the minute-interval reminder poller

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use uuid::Uuid;

struct PendingAction {
    token: Uuid,
    handle: AbortHandle,
}

/// Runs one future action per key after a delay.
///
/// Firing and cancelling both go through a single atomic removal of the map
/// entry. Whichever removes the entry wins: a fired action is no longer
/// cancellable, and a cancelled or replaced one never runs.
pub struct DelayedActionScheduler<K> {
    pending: Arc<DashMap<K, PendingAction>>,
}

impl<K> Clone for DelayedActionScheduler<K> {
    fn clone(&self) -> Self {
        DelayedActionScheduler {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<K> Default for DelayedActionScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DelayedActionScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        DelayedActionScheduler {
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Arm `action` to run after `delay`, replacing any pending action for `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, key: K, delay: impl Into<Duration>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let delay = delay.into();
        let token = Uuid::new_v4();

        // The entry lock is held while spawning so the task cannot try to
        // claim its slot before the slot exists.
        match self.pending.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let handle = self.spawn(key.clone(), token, delay, action);
                let previous = occupied.insert(PendingAction { token, handle });
                previous.handle.abort();
                info!("⏰ Replaced pending action for {:?}, firing in {:?}", key, delay);
            }
            Entry::Vacant(vacant) => {
                let handle = self.spawn(key.clone(), token, delay, action);
                vacant.insert(PendingAction { token, handle });
                info!("⏰ Scheduled action for {:?} in {:?}", key, delay);
            }
        }
    }

    fn spawn<F, Fut>(&self, key: K, token: Uuid, delay: Duration, action: F) -> AbortHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if pending.remove_if(&key, |_, entry| entry.token == token).is_none() {
                debug!("⏰ Action for {:?} was superseded before firing", key);
                return;
            }

            match action().await {
                Ok(()) => info!("✅ Fired scheduled action for {:?}", key),
                Err(e) => warn!("⚠️ Scheduled action for {:?} failed: {}", key, e),
            }
        });

        task.abort_handle()
    }

    /// Stop the pending action for `key`. Returns whether anything was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, entry)) => {
                entry.handle.abort();
                info!("🛑 Cancelled pending action for {:?}", key);
                true
            }
            None => false,
        }
    }

    /// Cancel everything, e.g. on shutdown.
    pub fn cancel_all(&self) {
        let keys: Vec<K> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
