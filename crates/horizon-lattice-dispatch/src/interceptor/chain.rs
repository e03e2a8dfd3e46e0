//! Building and running interceptor chains.
//!
//! An asynchronous chain is a list of links, each applied to the outcome of
//! the previous one: a success goes to the link's fulfilled handler, a
//! failure to its rejected handler, and a missing handler passes the outcome
//! through.
//!
//! A synchronous request chain is a plain loop over the fulfilled handlers.
//! When one fails, only that interceptor's rejected handler sees the error
//! and the loop stops there.

use std::sync::Arc;

use super::{Handler, Interceptor, InterceptorManager, SyncFn};
use crate::config::RequestConfig;
use crate::error::{DispatchError, Result};
use crate::http::Response;

/// How the request side of a pipeline is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Every request interceptor is synchronous; the request chain runs as a
    /// plain loop and a failing step is handled by its own rejected handler.
    Synchronous,
    /// At least one request interceptor may suspend; every interceptor
    /// boundary is a suspension point.
    Asynchronous,
}

pub(crate) struct Link<T> {
    fulfilled: Option<Handler<T, T>>,
    rejected: Option<Handler<DispatchError, T>>,
}

impl<T: 'static> Link<T> {
    fn new(interceptor: &Interceptor<T>) -> Self {
        Self {
            fulfilled: interceptor.fulfilled.clone(),
            rejected: interceptor.rejected.clone(),
        }
    }

    fn to_sync(&self) -> Option<SyncLink<T>> {
        let fulfilled = match &self.fulfilled {
            Some(handler) => Some(handler.as_sync()?),
            None => None,
        };
        let rejected = match &self.rejected {
            Some(handler) => Some(handler.as_sync()?),
            None => None,
        };
        Some(SyncLink {
            fulfilled,
            rejected,
        })
    }

    async fn apply(&self, outcome: Result<T>) -> Result<T> {
        match (outcome, &self.fulfilled, &self.rejected) {
            (Ok(value), Some(fulfilled), _) => fulfilled.call(value).await,
            (Err(error), _, Some(rejected)) => rejected.call(error).await,
            (outcome, _, _) => outcome,
        }
    }
}

pub(crate) struct SyncLink<T> {
    fulfilled: Option<SyncFn<T, T>>,
    rejected: Option<SyncFn<DispatchError, T>>,
}

async fn run_links<T: 'static>(links: &[Link<T>], mut outcome: Result<T>) -> Result<T> {
    for link in links {
        tokio::task::yield_now().await;
        outcome = link.apply(outcome).await;
    }
    outcome
}

fn run_synchronous(links: &[SyncLink<RequestConfig>], mut config: RequestConfig) -> RequestOutcome {
    for link in links {
        let Some(fulfilled) = &link.fulfilled else {
            continue;
        };
        let last_good = link.rejected.as_ref().map(|_| config.clone());
        match fulfilled(config) {
            Ok(next) => config = next,
            Err(error) => {
                tracing::debug!(
                    target: "horizon_lattice_dispatch::interceptor",
                    code = error.code(),
                    "synchronous request interceptor failed"
                );
                return match (&link.rejected, last_good) {
                    // The recovered value is discarded; the last good config is sent
                    (Some(rejected), Some(last_good)) => match rejected(error) {
                        Ok(_) => RequestOutcome::Dispatch(last_good),
                        Err(error) => RequestOutcome::Reject(error),
                    },
                    _ => RequestOutcome::Reject(error),
                };
            }
        }
    }
    RequestOutcome::Dispatch(config)
}

/// Where a request goes once its request chain has run.
#[derive(Debug)]
pub(crate) enum RequestOutcome {
    /// Send this config through the adapter.
    Dispatch(RequestConfig),
    /// Skip the adapter; the error continues through the response chain.
    Forward(DispatchError),
    /// Reject the request with this error; no further hooks run.
    Reject(DispatchError),
}

/// The request side of a pipeline, with its execution strategy fixed.
pub(crate) enum RequestChain {
    Synchronous(Vec<SyncLink<RequestConfig>>),
    Asynchronous(Vec<Link<RequestConfig>>),
}

impl RequestChain {
    /// Snapshot the participating interceptors, most recently registered
    /// first.
    pub(crate) fn build(manager: &InterceptorManager<RequestConfig>, config: &RequestConfig) -> Self {
        let participating: Vec<Arc<Interceptor<RequestConfig>>> = manager
            .snapshot()
            .into_iter()
            .filter(|interceptor| interceptor.runs_for(config))
            .rev()
            .collect();
        let links: Vec<_> = participating.iter().map(|i| Link::new(i)).collect();

        let all_synchronous = participating.iter().all(|i| i.is_synchronous());
        if all_synchronous
            && let Some(sync_links) = links.iter().map(Link::to_sync).collect::<Option<Vec<_>>>()
        {
            return Self::Synchronous(sync_links);
        }
        Self::Asynchronous(links)
    }

    pub(crate) fn strategy(&self) -> ExecutionStrategy {
        match self {
            Self::Synchronous(_) => ExecutionStrategy::Synchronous,
            Self::Asynchronous(_) => ExecutionStrategy::Asynchronous,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Synchronous(links) => links.len(),
            Self::Asynchronous(links) => links.len(),
        }
    }

    /// Run the chain.
    ///
    /// A synchronous chain completes on first poll. A failing step hands its
    /// error to its own rejected handler: if that recovers, the config the
    /// step received is dispatched, otherwise the request is rejected. An
    /// asynchronous chain suspends at every interceptor boundary and
    /// forwards a final error to the response chain.
    pub(crate) async fn run(&self, config: RequestConfig) -> RequestOutcome {
        match self {
            Self::Synchronous(links) => run_synchronous(links, config),
            Self::Asynchronous(links) => match run_links(links, Ok(config)).await {
                Ok(config) => RequestOutcome::Dispatch(config),
                Err(error) => RequestOutcome::Forward(error),
            },
        }
    }
}

/// The response side of a pipeline, in registration order.
pub(crate) struct ResponseChain(Vec<Link<Response>>);

impl ResponseChain {
    pub(crate) fn build(manager: &InterceptorManager<Response>) -> Self {
        Self(manager.snapshot().iter().map(|i| Link::new(i)).collect())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) async fn run(&self, outcome: Result<Response>) -> Result<Response> {
        run_links(&self.0, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::FutureExt;

    use super::*;
    use crate::error::ErrorKind;

    fn dispatched(outcome: RequestOutcome) -> RequestConfig {
        match outcome {
            RequestOutcome::Dispatch(config) => config,
            other => panic!("expected a dispatch, got {other:?}"),
        }
    }

    fn failing(message: &'static str) -> Interceptor<RequestConfig> {
        Interceptor::new()
            .on_fulfilled(move |_: RequestConfig| Err(DispatchError::new(ErrorKind::BadRequest, message)))
            .synchronous(true)
    }

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Interceptor<RequestConfig> {
        Interceptor::new()
            .on_fulfilled(move |config: RequestConfig| {
                log.lock().unwrap().push(tag);
                Ok(config)
            })
            .synchronous(true)
    }

    #[tokio::test]
    async fn test_request_chain_runs_most_recent_first() {
        let manager = InterceptorManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|tag| manager.register(tagging(tag, log.clone())))
            .collect();
        manager.eject(handles[1]);

        let chain = RequestChain::build(&manager, &RequestConfig::new());
        assert_eq!(chain.len(), 3);
        dispatched(chain.run(RequestConfig::new()).await);
        assert_eq!(*log.lock().unwrap(), vec!["d", "c", "a"]);
    }

    #[test]
    fn test_strategy_selection() {
        let manager = InterceptorManager::new();
        assert_eq!(
            RequestChain::build(&manager, &RequestConfig::new()).strategy(),
            ExecutionStrategy::Synchronous
        );

        let log = Arc::new(Mutex::new(Vec::new()));
        manager.register(tagging("sync", log.clone()));
        let chain = RequestChain::build(&manager, &RequestConfig::new());
        assert_eq!(chain.strategy(), ExecutionStrategy::Synchronous);
        assert!(chain.run(RequestConfig::new()).now_or_never().is_some());

        manager.register(Interceptor::new().on_fulfilled(Ok));
        let chain = RequestChain::build(&manager, &RequestConfig::new());
        assert_eq!(chain.strategy(), ExecutionStrategy::Asynchronous);
    }

    #[test]
    fn test_declared_sync_with_async_handler_is_async() {
        let manager = InterceptorManager::new();
        manager.register(
            Interceptor::new()
                .on_fulfilled_async(|config: RequestConfig| async move { Ok(config) })
                .synchronous(true),
        );
        let chain = RequestChain::build(&manager, &RequestConfig::new());
        assert_eq!(chain.strategy(), ExecutionStrategy::Asynchronous);
    }

    #[test]
    fn test_run_when_is_evaluated_at_build_time() {
        let manager = InterceptorManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.register(
            tagging("admin-only", log.clone())
                .run_when(|config| config.url.as_deref() == Some("/admin")),
        );

        let chain = RequestChain::build(&manager, &RequestConfig::from("/users"));
        assert_eq!(chain.len(), 0);
        let chain = RequestChain::build(&manager, &RequestConfig::from("/admin"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_sync_failure_is_handled_by_its_own_rejected_handler() {
        let manager = InterceptorManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        // Registered first, so would run last
        manager.register(tagging("after-failure", log.clone()));
        manager.register(failing("boom").on_rejected(|error: DispatchError| {
            assert_eq!(error.message(), "boom");
            Ok(RequestConfig::from("/ignored"))
        }));
        manager.register(tagging("before-failure", log.clone()));

        let chain = RequestChain::build(&manager, &RequestConfig::new());
        let config = dispatched(
            chain
                .run(RequestConfig::from("/users"))
                .now_or_never()
                .unwrap(),
        );
        assert_eq!(config.url.as_deref(), Some("/users"));
        assert_eq!(*log.lock().unwrap(), vec!["before-failure"]);
    }

    #[test]
    fn test_sync_failure_without_recovery_rejects() {
        let manager = InterceptorManager::new();
        manager.register(
            Interceptor::new()
                .on_rejected(|_: DispatchError| -> Result<RequestConfig> {
                    panic!("a later rejected handler must not run")
                })
                .synchronous(true),
        );
        manager.register(failing("boom"));

        let chain = RequestChain::build(&manager, &RequestConfig::new());
        match chain.run(RequestConfig::new()).now_or_never().unwrap() {
            RequestOutcome::Reject(error) => assert_eq!(error.message(), "boom"),
            other => panic!("expected a rejection, got {other:?}"),
        }

        let manager = InterceptorManager::new();
        manager.register(failing("boom").on_rejected(|error: DispatchError| {
            Err(DispatchError::new(ErrorKind::BadRequest, format!("rethrown {}", error.message())))
        }));
        let chain = RequestChain::build(&manager, &RequestConfig::new());
        match chain.run(RequestConfig::new()).now_or_never().unwrap() {
            RequestOutcome::Reject(error) => assert_eq!(error.message(), "rethrown boom"),
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_async_failure_skips_to_next_rejected_handler() {
        let manager = InterceptorManager::new();
        // Registered first, so runs last
        manager.register(
            Interceptor::new()
                .on_fulfilled(|_: RequestConfig| panic!("fulfilled must be skipped"))
                .on_rejected(|error: DispatchError| Ok(RequestConfig::from(error.message()))),
        );
        manager.register(Interceptor::new().on_fulfilled(|_: RequestConfig| {
            Err(DispatchError::new(ErrorKind::BadRequest, "/recovered"))
        }));

        let chain = RequestChain::build(&manager, &RequestConfig::new());
        assert_eq!(chain.strategy(), ExecutionStrategy::Asynchronous);
        let config = dispatched(chain.run(RequestConfig::new()).await);
        assert_eq!(config.url.as_deref(), Some("/recovered"));

        manager.clear();
        manager.register(failing("boom").synchronous(false));
        let chain = RequestChain::build(&manager, &RequestConfig::new());
        match chain.run(RequestConfig::new()).await {
            RequestOutcome::Forward(error) => assert_eq!(error.message(), "boom"),
            other => panic!("expected a forwarded error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_immune_to_later_registration() {
        let manager = InterceptorManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.register(tagging("before", log.clone()));

        let chain = RequestChain::build(&manager, &RequestConfig::new());
        manager.register(tagging("after", log.clone()));
        manager.clear();

        dispatched(chain.run(RequestConfig::new()).await);
        assert_eq!(*log.lock().unwrap(), vec!["before"]);
    }
}
