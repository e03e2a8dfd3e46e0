//! A one-shot event: settles with a value at most once and notifies every
//! listener exactly once.

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};
use tokio::sync::watch;

new_key_type! {
    /// Identifies a listener subscribed to a cancellation source.
    ///
    /// Subscribing to a source that has already fired calls the listener
    /// immediately and returns the null id, which unsubscribes nothing.
    pub struct ListenerId;
}

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

struct State<T> {
    value: Option<T>,
    listeners: SlotMap<ListenerId, Listener<T>>,
}

pub(crate) struct OnceEvent<T> {
    state: Mutex<State<T>>,
    fired: watch::Sender<bool>,
}

impl<T: Clone> OnceEvent<T> {
    pub(crate) fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self {
            state: Mutex::new(State {
                value: None,
                listeners: SlotMap::with_key(),
            }),
            fired,
        }
    }

    /// Settle the event. Returns `false` if it had already settled, in which
    /// case the recorded value is kept.
    #[tracing::instrument(skip_all, target = "horizon_lattice_dispatch::cancel", level = "trace")]
    pub(crate) fn fire(&self, value: T) -> bool {
        let listeners = {
            let mut state = self.state.lock();
            if state.value.is_some() {
                return false;
            }
            state.value = Some(value.clone());
            std::mem::take(&mut state.listeners)
        };
        self.fired.send_replace(true);

        tracing::trace!(
            target: "horizon_lattice_dispatch::cancel",
            listener_count = listeners.len(),
            "notifying listeners"
        );
        // Called without the lock so listeners may subscribe or unsubscribe
        for (_, listener) in listeners {
            listener(&value);
        }
        true
    }

    pub(crate) fn value(&self) -> Option<T> {
        self.state.lock().value.clone()
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.state.lock().value.is_some()
    }

    pub(crate) fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if let Some(value) = state.value.clone() {
            drop(state);
            listener(&value);
            return ListenerId::default();
        }
        state.listeners.insert(Box::new(listener))
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        self.state.lock().listeners.remove(id).is_some()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Wait until the event settles and return its value.
    pub(crate) async fn wait(&self) -> T {
        let mut fired = self.fired.subscribe();
        loop {
            if let Some(value) = self.value() {
                return value;
            }
            // The sender lives as long as `self`
            let _ = fired.changed().await;
        }
    }
}
