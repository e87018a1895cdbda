//! Coalescing of concurrent store fetches.
//!
//! The first `locate` that misses on an identity becomes its *loader*: it
//! queries the store with the evictor lock released. Later misses on the same
//! identity join the loader's [`PendingLoad`] and block on it (outside the
//! evictor lock) until the loader publishes a [`LoadOutcome`].
//!
//! ```text
//!   locate(X) #1 ── miss ── register ticket ── store.get(X) ── complete_load ── publish
//!   locate(X) #2 ── miss ── join ticket ─────────── wait ──────────────────────── wake
//!   locate(X) #3 ── miss ── join ticket ─────────── wait ──────────────────────── wake
//! ```
//!
//! [`LoadGuard`] publishes a failure if the loader unwinds before completing,
//! so joiners never wait forever.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::error::{LocateError, StoreError};
use crate::evictor::core::{EvictorCore, Located};
use crate::identity::Identity;

/// Result of one fetch, shared with every dispatch that waited for it.
#[derive(Debug, Clone)]
pub(crate) enum LoadOutcome {
    /// Servant admitted (or reused) and already pinned for the recipient.
    Loaded(Located),
    NotFound,
    Failed(StoreError),
}

impl LoadOutcome {
    pub(crate) fn into_result(self, identity: &Identity) -> Result<Option<Located>, LocateError> {
        match self {
            LoadOutcome::Loaded(located) => Ok(Some(located)),
            LoadOutcome::NotFound => Ok(None),
            LoadOutcome::Failed(source) => Err(LocateError::StoreUnavailable {
                identity: identity.clone(),
                source,
            }),
        }
    }
}

/// One-shot slot the loader publishes its outcome into.
#[derive(Debug, Default)]
pub(crate) struct PendingLoad {
    outcome: Mutex<Option<LoadOutcome>>,
    ready: Condvar,
}

impl PendingLoad {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, outcome: LoadOutcome) {
        let mut slot = self.outcome.lock();
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    /// Blocks until the loader publishes.
    pub(crate) fn wait(&self) -> LoadOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_published(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

/// Held by the loader for the duration of a fetch.
pub(crate) struct LoadGuard<'a> {
    core: &'a Mutex<EvictorCore>,
    identity: Identity,
    pending: Arc<PendingLoad>,
    armed: bool,
}

impl<'a> LoadGuard<'a> {
    pub(crate) fn new(core: &'a Mutex<EvictorCore>, identity: Identity, pending: Arc<PendingLoad>) -> Self {
        Self {
            core,
            identity,
            pending,
            armed: true,
        }
    }

    /// Publishes `outcome` to the joiners and disarms the guard.
    pub(crate) fn complete(mut self, outcome: LoadOutcome) {
        self.armed = false;
        self.pending.publish(outcome);
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.core.lock().abort_load(&self.identity, &self.pending);
        warn!(identity = %self.identity, "servant load aborted before completion");
        self.pending.publish(LoadOutcome::Failed(StoreError::Unavailable(format!(
            "load of '{}' aborted",
            self.identity
        ))));
    }
}
