//! Abort-signal cancellation.

use std::fmt;
use std::sync::Arc;

use super::once::{ListenerId, OnceEvent};
use crate::error::DispatchError;

/// Owns an [`AbortSignal`] and can abort it.
#[derive(Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Create a controller with a fresh signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the signal to put in a request config.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort without a reason.
    ///
    /// Requests observing the signal fail with a fresh
    /// [`Canceled`](crate::ErrorKind::Canceled) error. Returns `false` if the
    /// signal was already aborted.
    pub fn abort(&self) -> bool {
        self.signal.fire(None)
    }

    /// Abort with a reason that requests observing the signal fail with.
    pub fn abort_with(&self, reason: DispatchError) -> bool {
        self.signal.fire(Some(reason))
    }
}

/// Observes whether an [`AbortController`] has aborted.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<OnceEvent<Option<DispatchError>>>,
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self {
            inner: Arc::new(OnceEvent::new()),
        }
    }
}

impl AbortSignal {
    /// Create a signal that is already aborted.
    pub fn already_aborted() -> Self {
        let signal = Self::default();
        signal.fire(None);
        signal
    }

    fn fire(&self, reason: Option<DispatchError>) -> bool {
        let aborted = self.inner.fire(reason);
        if aborted {
            tracing::debug!(target: "horizon_lattice_dispatch::cancel", "abort signal fired");
        }
        aborted
    }

    /// Check if the signal has been aborted.
    pub fn aborted(&self) -> bool {
        self.inner.is_fired()
    }

    /// Get the abort reason, if one was given.
    pub fn reason(&self) -> Option<DispatchError> {
        self.inner.value().flatten()
    }

    /// Subscribe to the abort event.
    ///
    /// If the signal is already aborted the listener runs immediately and
    /// the returned id is the null id.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&DispatchError>) + Send + Sync + 'static,
    {
        let id = self
            .inner
            .subscribe(move |reason: &Option<DispatchError>| listener(reason.as_ref()));
        tracing::trace!(target: "horizon_lattice_dispatch::cancel", ?id, "signal listener subscribed");
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Wait until the signal is aborted and return the reason, if any.
    pub async fn wait_aborted(&self) -> Option<DispatchError> {
        self.inner.wait().await
    }

    /// Number of listeners waiting for the abort.
    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .finish()
    }
}
