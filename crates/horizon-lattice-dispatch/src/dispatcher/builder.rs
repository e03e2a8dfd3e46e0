//! Request builder returned by the verb aliases.

use std::time::Duration;

use super::Dispatcher;
use crate::cancel::{AbortSignal, CancelToken};
use crate::config::{RequestConfig, merge_config};
use crate::error::Result;
use crate::http::{Authentication, Response};

/// Builder for a single request on a [`Dispatcher`].
///
/// Every setter writes into a per-call [`RequestConfig`]; [`send`](Self::send)
/// hands it to [`Dispatcher::request`].
#[must_use = "a request builder does nothing until sent"]
pub struct RequestBuilder<'a> {
    dispatcher: &'a Dispatcher,
    config: RequestConfig,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, config: RequestConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Add a header to the request.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        self.config = self.config.header(name, value);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.param(key, value);
        self
    }

    /// Set a timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the request credentials.
    pub fn auth(mut self, auth: Authentication) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Attach a cancel token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config = self.config.cancel_token(token);
        self
    }

    /// Attach an abort signal.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.config = self.config.signal(signal);
        self
    }

    /// Layer a full config over what has been set so far.
    ///
    /// The method and URL chosen by the verb alias are kept.
    pub fn config(mut self, config: RequestConfig) -> Self {
        let method = self.config.method;
        let url = self.config.url.take();
        let data = self.config.data.take();

        let mut merged = merge_config(&self.config, &config);
        merged.method = method;
        merged.url = url;
        merged.data = config.data.or(data);
        self.config = merged;
        self
    }

    /// Get the config built so far.
    pub fn as_config(&self) -> &RequestConfig {
        &self.config
    }

    /// Send the request.
    ///
    /// The interceptor chains are captured now, not when the returned
    /// future is first polled.
    pub fn send(self) -> impl Future<Output = Result<Response>> + 'a {
        self.dispatcher.request(self.config)
    }
}

impl std::fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
