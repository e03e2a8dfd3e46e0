//! Token-based cancellation.

use std::fmt;
use std::sync::Arc;

use super::once::{ListenerId, OnceEvent};
use crate::adapter::TransportHandle;
use crate::config::RequestConfig;
use crate::error::{DispatchError, Result};

/// A handle through which a caller can cancel requests.
///
/// A token settles at most once. Its reason is a [`DispatchError`] of kind
/// [`Canceled`](crate::ErrorKind::Canceled); once recorded it never changes,
/// and anyone subscribing afterwards is notified immediately.
///
/// ```
/// use horizon_lattice_dispatch::CancelToken;
///
/// let source = CancelToken::source();
/// assert!(source.token.throw_if_requested().is_ok());
///
/// source.cancel.cancel_with_message("user navigated away");
/// let err = source.token.throw_if_requested().unwrap_err();
/// assert!(err.is_cancel());
/// assert_eq!(err.message(), "user navigated away");
/// ```
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<OnceEvent<DispatchError>>,
}

/// The cancelling half of a [`CancelToken`].
#[derive(Clone)]
pub struct Canceller {
    token: CancelToken,
}

/// A token together with the function that cancels it.
#[derive(Clone)]
pub struct CancelSource {
    /// The token to put in a request config.
    pub token: CancelToken,
    /// Cancels `token`.
    pub cancel: Canceller,
}

impl CancelToken {
    /// Create a token, handing its [`Canceller`] to `executor`.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceller),
    {
        let token = Self::unsettled();
        executor(Canceller {
            token: token.clone(),
        });
        token
    }

    /// Create a token and its canceller as a pair.
    pub fn source() -> CancelSource {
        let token = Self::unsettled();
        CancelSource {
            cancel: Canceller {
                token: token.clone(),
            },
            token,
        }
    }

    fn unsettled() -> Self {
        Self {
            inner: Arc::new(OnceEvent::new()),
        }
    }

    /// Get the cancellation reason, if cancelled.
    pub fn reason(&self) -> Option<DispatchError> {
        self.inner.value()
    }

    /// Check if this token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_fired()
    }

    /// Fail with the cancellation reason if cancelled.
    pub fn throw_if_requested(&self) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Subscribe to cancellation.
    ///
    /// If the token is already cancelled the listener runs immediately and
    /// the returned id is the null id.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        let id = self.inner.subscribe(listener);
        tracing::trace!(target: "horizon_lattice_dispatch::cancel", ?id, "token listener subscribed");
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Wait until the token is cancelled and return the reason.
    pub async fn cancelled(&self) -> DispatchError {
        self.inner.wait().await
    }

    /// Number of listeners waiting for cancellation.
    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Canceller {
    /// Cancel with the default message.
    ///
    /// Returns `false` if the token was already cancelled.
    pub fn cancel(&self) -> bool {
        self.cancel_with(None, None, None)
    }

    /// Cancel with a message.
    pub fn cancel_with_message(&self, message: impl Into<String>) -> bool {
        self.cancel_with(Some(message.into()), None, None)
    }

    /// Cancel, recording the config and transport operation the
    /// cancellation concerns.
    ///
    /// Only the first cancellation is recorded; later calls return `false`
    /// and leave the reason untouched.
    pub fn cancel_with(
        &self,
        message: Option<String>,
        config: Option<RequestConfig>,
        transport: Option<TransportHandle>,
    ) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let mut reason = DispatchError::canceled(message);
        if let Some(config) = config {
            reason = reason.with_config(config);
        }
        if let Some(transport) = transport {
            reason = reason.with_transport(transport);
        }
        let cancelled = self.token.inner.fire(reason);
        if cancelled {
            tracing::debug!(target: "horizon_lattice_dispatch::cancel", "cancel token fired");
        }
        cancelled
    }

    /// Get the token this canceller controls.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}
