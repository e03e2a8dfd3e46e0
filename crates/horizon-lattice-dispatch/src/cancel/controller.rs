//! Merging the two cancellation sources of a request into one event.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::once::ListenerId;
use super::{AbortSignal, CancelToken};
use crate::adapter::{Adapter, TransportHandle};
use crate::error::DispatchError;

struct Trigger {
    sender: Mutex<Option<oneshot::Sender<DispatchError>>>,
    adapter: Arc<dyn Adapter>,
    transport: TransportHandle,
}

impl Trigger {
    fn fire(&self, reason: Option<DispatchError>) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        tracing::debug!(
            target: "horizon_lattice_dispatch::cancel",
            id = %self.transport.id(),
            "request cancelled in flight, aborting transport"
        );
        self.adapter.abort(&self.transport);

        let mut error = reason.unwrap_or_else(|| DispatchError::canceled(None));
        if error.transport().is_none() {
            error = error.with_transport(self.transport.clone());
        }
        let _ = sender.send(error);
    }
}

/// One in-flight request's view of its cancellation sources.
///
/// A single listener is subscribed to the cancel token and the abort signal
/// of the request (whichever are present). The first source to fire aborts
/// the transport through [`Adapter::abort`] and settles
/// [`cancelled`](Self::cancelled); later firings from either source are
/// ignored. Dropping the controller unsubscribes from both sources.
///
/// A token reason is reported as given. A signal aborted without a reason
/// is reported as a fresh [`Canceled`](crate::ErrorKind::Canceled) error. Either
/// way the error names the in-flight transport operation.
pub struct CancellationController {
    token: Option<(CancelToken, ListenerId)>,
    signal: Option<(AbortSignal, ListenerId)>,
    fired: oneshot::Receiver<DispatchError>,
}

impl CancellationController {
    /// Subscribe to `token` and `signal` on behalf of the transport
    /// operation `transport`, which `adapter` is about to perform.
    pub fn attach(
        token: Option<&CancelToken>,
        signal: Option<&AbortSignal>,
        adapter: Arc<dyn Adapter>,
        transport: TransportHandle,
    ) -> Self {
        let (sender, fired) = oneshot::channel();
        let trigger = Arc::new(Trigger {
            sender: Mutex::new(Some(sender)),
            adapter,
            transport,
        });

        let token = token.map(|token| {
            let trigger = trigger.clone();
            let id = token.subscribe(move |reason| trigger.fire(Some(reason.clone())));
            (token.clone(), id)
        });
        let signal = signal.map(|signal| {
            let trigger = trigger.clone();
            let id = signal.subscribe(move |reason| trigger.fire(reason.cloned()));
            (signal.clone(), id)
        });

        Self {
            token,
            signal,
            fired,
        }
    }

    /// Wait for the first cancellation.
    ///
    /// Never resolves if neither source fires.
    pub async fn cancelled(&mut self) -> DispatchError {
        match (&mut self.fired).await {
            Ok(error) => error,
            Err(_) => std::future::pending().await,
        }
    }
}

impl Drop for CancellationController {
    fn drop(&mut self) {
        if let Some((token, id)) = self.token.take() {
            token.unsubscribe(id);
        }
        if let Some((signal, id)) = self.signal.take() {
            signal.unsubscribe(id);
        }
        tracing::trace!(target: "horizon_lattice_dispatch::cancel", "cancellation listeners released");
    }
}
