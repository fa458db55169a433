#[cfg(test)]
mod lifecycle_test;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use portable_atomic::AtomicU64;
use smol_str::SmolStr;
use tokio::sync::watch;

struct TrackerInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, SmolStr>>,
    generation: watch::Sender<u64>,
}

impl TrackerInner {
    fn live(&self) -> MutexGuard<'_, HashMap<u64, SmolStr>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// LifecycleTracker records which native handles are alive. A handle is
/// registered when it is created and torn down when its [`LifecycleGuard`]
/// is dropped, which lets tests assert that nothing outlives `close`.
#[derive(Clone)]
pub struct LifecycleTracker {
    inner: Arc<TrackerInner>,
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleTracker {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        LifecycleTracker {
            inner: Arc::new(TrackerInner {
                next_id: AtomicU64::new(1),
                live: Mutex::new(HashMap::new()),
                generation,
            }),
        }
    }

    /// register records a new live handle of `kind`.
    pub fn register(&self, kind: &str) -> LifecycleGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.live().insert(id, SmolStr::new(kind));
        log::trace!("{kind} #{id} created");

        LifecycleGuard {
            id,
            tracker: Arc::clone(&self.inner),
        }
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.inner.live().contains_key(&id)
    }

    /// live lists the handles not yet torn down, by id.
    pub fn live(&self) -> Vec<(u64, SmolStr)> {
        let mut live: Vec<_> = self
            .inner
            .live()
            .iter()
            .map(|(id, kind)| (*id, kind.clone()))
            .collect();
        live.sort_by_key(|(id, _)| *id);
        live
    }

    /// destructor resolves once handle `id` has been torn down. It resolves
    /// immediately for ids that are not live.
    pub async fn destructor(&self, id: u64) {
        let mut generation = self.inner.generation.subscribe();
        loop {
            if !self.is_live(id) {
                return;
            }
            // the sender lives in self, so changed() only fails if it was dropped
            if generation.changed().await.is_err() {
                return;
            }
        }
    }

    /// stop reports every handle still live, logging each as a leak.
    pub fn stop(&self) -> Vec<(u64, SmolStr)> {
        let leaked = self.live();
        for (id, kind) in &leaked {
            log::warn!("{kind} #{id} still live at shutdown");
        }
        leaked
    }
}

/// LifecycleGuard marks one live handle. Dropping it records the teardown.
pub struct LifecycleGuard {
    id: u64,
    tracker: Arc<TrackerInner>,
}

impl LifecycleGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for LifecycleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleGuard").field("id", &self.id).finish()
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        if let Some(kind) = self.tracker.live().remove(&self.id) {
            log::trace!("{kind} #{} destroyed", self.id);
        }
        self.tracker.generation.send_modify(|g| *g += 1);
    }
}
