//! Interceptors: hooks that observe or rewrite requests and responses in
//! flight.
//!
//! An [`Interceptor`] pairs a *fulfilled* handler, which receives the value
//! flowing through the pipeline, with a *rejected* handler, which receives
//! the error produced by an earlier stage and may recover from it. Either
//! half may be absent, in which case values (or errors) pass through.
//!
//! Request interceptors run most-recently-registered first; response
//! interceptors run in registration order. The order is fixed from a
//! snapshot of the registry taken when the request is made.

mod chain;
mod manager;

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

pub(crate) use chain::{RequestChain, RequestOutcome, ResponseChain};
pub use chain::ExecutionStrategy;
pub use manager::{InterceptorId, InterceptorManager};

use crate::config::RequestConfig;
use crate::error::{DispatchError, Result};
use crate::http::Response;

type SyncFn<I, O> = Arc<dyn Fn(I) -> Result<O> + Send + Sync>;
type AsyncFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync>;

/// One half of an interceptor.
pub enum Handler<I, O> {
    /// Completes without suspending.
    Sync(SyncFn<I, O>),
    /// May suspend.
    Async(AsyncFn<I, O>),
}

impl<I, O> Clone for Handler<I, O> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(f.clone()),
            Self::Async(f) => Self::Async(f.clone()),
        }
    }
}

impl<I: 'static, O: 'static> Handler<I, O> {
    /// Wrap a synchronous closure.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(I) -> Result<O> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wrap a closure returning a future.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::Async(Arc::new(move |input| f(input).boxed()))
    }

    /// Check if this handler completes without suspending.
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    pub(crate) fn as_sync(&self) -> Option<SyncFn<I, O>> {
        match self {
            Self::Sync(f) => Some(f.clone()),
            Self::Async(_) => None,
        }
    }

    pub(crate) async fn call(&self, input: I) -> Result<O> {
        match self {
            Self::Sync(f) => f(input),
            Self::Async(f) => f(input).await,
        }
    }
}

type RunWhen = Arc<dyn Fn(&RequestConfig) -> bool + Send + Sync>;

/// A fulfilled/rejected hook pair plus its registration options.
///
/// ```
/// use horizon_lattice_dispatch::{Interceptor, RequestConfig};
///
/// let add_header = Interceptor::<RequestConfig>::new()
///     .on_fulfilled(|config| Ok(config.header("x-request-source", "docs")))
///     .synchronous(true)
///     .run_when(|config| config.url.as_deref() != Some("/health"));
/// assert!(add_header.is_synchronous());
/// ```
pub struct Interceptor<T> {
    fulfilled: Option<Handler<T, T>>,
    rejected: Option<Handler<DispatchError, T>>,
    synchronous: bool,
    run_when: Option<RunWhen>,
}

impl<T> Default for Interceptor<T> {
    fn default() -> Self {
        Self {
            fulfilled: None,
            rejected: None,
            synchronous: false,
            run_when: None,
        }
    }
}

impl<T: 'static> Interceptor<T> {
    /// Create an interceptor with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fulfilled handler.
    pub fn on_fulfilled<F>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Result<T> + Send + Sync + 'static,
    {
        self.fulfilled = Some(Handler::from_sync(f));
        self
    }

    /// Set an asynchronous fulfilled handler.
    pub fn on_fulfilled_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.fulfilled = Some(Handler::from_async(f));
        self
    }

    /// Set the rejected handler.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(DispatchError) -> Result<T> + Send + Sync + 'static,
    {
        self.rejected = Some(Handler::from_sync(f));
        self
    }

    /// Set an asynchronous rejected handler.
    pub fn on_rejected_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DispatchError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.rejected = Some(Handler::from_async(f));
        self
    }

    /// Declare whether this interceptor completes without suspending.
    ///
    /// When every participating request interceptor is synchronous, the
    /// request side of the pipeline runs without scheduling. In that mode a
    /// failing fulfilled handler is answered by this interceptor's own
    /// rejected handler and no later request interceptor runs: a recovery
    /// sends the config this interceptor received, anything else rejects the
    /// request outright.
    ///
    /// An interceptor declared synchronous but holding an asynchronous
    /// handler is treated as asynchronous.
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    /// Only take part in requests whose config satisfies `predicate`.
    ///
    /// Evaluated once per request, when the chain is built.
    pub fn run_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestConfig) -> bool + Send + Sync + 'static,
    {
        self.run_when = Some(Arc::new(predicate));
        self
    }

    /// Check if this interceptor is declared synchronous.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Check if this interceptor takes part in a request with `config`.
    pub fn runs_for(&self, config: &RequestConfig) -> bool {
        self.run_when.as_ref().is_none_or(|predicate| predicate(config))
    }
}

impl<T> std::fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("fulfilled", &self.fulfilled.is_some())
            .field("rejected", &self.rejected.is_some())
            .field("synchronous", &self.synchronous)
            .field("run_when", &self.run_when.is_some())
            .finish()
    }
}

/// The request and response interceptor registries of a dispatcher.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Hooks run before the adapter, most recently registered first.
    pub request: InterceptorManager<RequestConfig>,
    /// Hooks run after the adapter, in registration order.
    pub response: InterceptorManager<Response>,
}
