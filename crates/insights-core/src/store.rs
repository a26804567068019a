//! In-memory state store with change listeners.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Handle returned when registering a change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<D> = Arc<dyn Fn(&D) + Send + Sync>;

struct StoreInner<D> {
    state: RwLock<D>,
    listeners: Mutex<Vec<(ListenerId, Listener<D>)>>,
    next_listener: AtomicU64,
}

/// Shared state plus listeners notified after every change.
///
/// Clones share the same state. Listeners receive a snapshot taken right
/// after the change and may update the store again from inside the callback.
pub struct StateStore<D> {
    inner: Arc<StoreInner<D>>,
}

impl<D> Clone for StateStore<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for StateStore<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StateStore")
            .field("state", &*state)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<D: Default + Clone + Send + Sync + 'static> Default for StateStore<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: Clone + Send + Sync + 'static> StateStore<D> {
    /// Create a store holding `initial`
    #[must_use]
    pub fn new(initial: D) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// A copy of the current state
    #[must_use]
    pub fn get_state(&self) -> D {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the state in place, then notify listeners
    pub fn update(&self, change: impl FnOnce(&mut D)) {
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            change(&mut state);
        }
        self.emit_changed();
    }

    /// Replace the state, then notify listeners
    pub fn set_state(&self, state: D) {
        self.update(|current| *current = state);
    }

    /// Register a listener called after every change
    pub fn add_changed_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&D) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_changed_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    fn emit_changed(&self) {
        let snapshot = self.get_state();
        let listeners: Vec<Listener<D>> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl<D> StateStore<D> {
    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener<D>)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }
}
