//! The transport boundary.
//!
//! An [`Adapter`] performs the actual I/O for a finalized config. The
//! pipeline calls it once per request and, if the request is cancelled while
//! in flight, asks it to abort the operation identified by the
//! [`TransportHandle`] it was given.

mod http_adapter;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;

pub use http_adapter::{HttpAdapter, HttpAdapterBuilder};
use crate::config::RequestConfig;
use crate::error::{DispatchError, ErrorKind, Result};
use crate::http::{Method, Response};

/// The future an adapter returns.
pub type AdapterFuture = BoxFuture<'static, Result<Response>>;

/// Unique identifier for an in-flight transport operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one transport operation.
///
/// The dispatcher creates the handle before invoking the adapter, so
/// cancellation and errors can name the operation even if the adapter never
/// produced a response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransportHandle {
    id: TransportId,
    method: Method,
    url: String,
}

impl TransportHandle {
    /// Create a handle for a request about to be sent.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            id: TransportId::next(),
            method,
            url: url.into(),
        }
    }

    /// Get the operation ID.
    pub fn id(&self) -> TransportId {
        self.id
    }

    /// Get the request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the full request URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Performs transport I/O for finalized request configs.
///
/// Implementations must honour `config.timeout`, reject schemes they cannot
/// serve with [`ErrorKind::BadRequest`], and classify their failures with an
/// [`ErrorKind`]. Closures of the right shape are adapters too.
pub trait Adapter: Send + Sync {
    /// Send the request described by `config`.
    fn dispatch(&self, config: RequestConfig, transport: TransportHandle) -> AdapterFuture;

    /// Abort the operation identified by `transport`.
    ///
    /// Called at most once per request when it is cancelled in flight. The
    /// pipeline also drops the future returned by [`dispatch`](Self::dispatch),
    /// so adapters only need this for work running outside that future.
    fn abort(&self, transport: &TransportHandle) {
        let _ = transport;
    }
}

impl<F> Adapter for F
where
    F: Fn(RequestConfig, TransportHandle) -> AdapterFuture + Send + Sync,
{
    fn dispatch(&self, config: RequestConfig, transport: TransportHandle) -> AdapterFuture {
        self(config, transport)
    }
}

/// Build an adapter from a closure.
///
/// Equivalent to passing the closure directly, but lets the compiler infer
/// the closure's argument types.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(RequestConfig, TransportHandle) -> AdapterFuture + Send + Sync,
{
    f
}

/// Resolve or reject a response based on the config's status validator.
///
/// Rejections carry the response and are [`ErrorKind::BadRequest`] for 4xx
/// statuses and [`ErrorKind::BadResponse`] otherwise.
pub fn settle(response: Response) -> Result<Response> {
    if response.config.accepts_status(response.status) {
        return Ok(response);
    }
    let kind = if response.is_client_error() {
        ErrorKind::BadRequest
    } else {
        ErrorKind::BadResponse
    };
    Err(DispatchError::new(
        kind,
        format!("Request failed with status code {}", response.status),
    )
    .with_config(response.config.clone())
    .with_transport(response.request.clone())
    .with_response(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusValidator;
    use crate::http::Body;

    fn response(status: u16, config: RequestConfig) -> Response {
        Response {
            data: Body::Empty,
            status,
            status_text: String::new(),
            headers: ::http::HeaderMap::new(),
            request: TransportHandle::new(Method::Get, "https://api.test/"),
            config,
        }
    }

    #[test]
    fn test_transport_ids_are_unique() {
        let a = TransportHandle::new(Method::Get, "/a");
        let b = TransportHandle::new(Method::Get, "/a");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_settle_classifies_status() {
        let config = RequestConfig::new().validate_status(StatusValidator::success());

        assert!(settle(response(201, config.clone())).is_ok());

        let err = settle(response(404, config.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Request failed with status code 404");
        assert_eq!(err.response().unwrap().status, 404);

        let err = settle(response(503, config)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadResponse);
    }

    #[test]
    fn test_settle_without_validator_accepts() {
        assert!(settle(response(500, RequestConfig::new())).is_ok());
    }
}
