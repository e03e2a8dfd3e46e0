//! The request dispatcher.
//!
//! A [`Dispatcher`] owns a set of instance defaults and two interceptor
//! registries. Each call to [`Dispatcher::request`] runs the same pipeline:
//!
//! 1. Merge the call's config over the defaults and pick the method.
//! 2. Validate the transitional options.
//! 3. Snapshot both interceptor registries into chains. This happens when
//!    [`Dispatcher::request`] is called, before the returned future is
//!    first polled. The request chain runs synchronously when every
//!    participating interceptor is synchronous, asynchronously otherwise.
//! 4. Run the request chain, then the adapter dispatch step (transforms,
//!    header flattening, cancellation, the adapter itself), then the
//!    response chain.
//!
//! In an asynchronous chain each stage receives the previous stage's
//! outcome: a success goes to the fulfilled handler, an error to the
//! rejected handler, and an error left over at the end of the request chain
//! flows into the response chain. A synchronous request chain stops at the
//! first failure. The failing interceptor's own rejected handler decides
//! between sending the last good config and rejecting the request; a
//! rejection skips the response chain.
//!
//! # Example
//!
//! ```ignore
//! use horizon_lattice_dispatch::{Dispatcher, RequestConfig};
//!
//! let api = Dispatcher::new(RequestConfig::new().base_url("https://api.example.com"));
//! let user = api.get("/users/1").header("x-trace", "1").send().await?;
//! println!("{:?}", user.data);
//! ```

mod builder;
mod dispatch;

use std::sync::OnceLock;

use http::header::CONTENT_TYPE;

pub use builder::RequestBuilder;

use crate::config::{RequestConfig, TransitionalOptions, merge_config};
use crate::defaults::default_config;
use crate::error::Result;
use crate::http::{Body, Method, Response};
use crate::interceptor::{
    ExecutionStrategy, Interceptors, RequestChain, RequestOutcome, ResponseChain,
};

use self::dispatch::dispatch_request;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Runs requests through interceptors, transforms and an adapter.
///
/// Dispatchers are independent: each has its own defaults and interceptor
/// registries. Registries may be changed at any time, including from
/// interceptors and while requests are in flight.
#[derive(Debug)]
pub struct Dispatcher {
    defaults: RequestConfig,
    /// Request and response interceptor registries.
    pub interceptors: Interceptors,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(default_config())
    }
}

impl Dispatcher {
    /// Create a dispatcher with the given defaults.
    ///
    /// The defaults are used as is; to extend the library defaults, start
    /// from [`default_config`].
    pub fn new(defaults: RequestConfig) -> Self {
        Self {
            defaults,
            interceptors: Interceptors::default(),
        }
    }

    /// Create a new dispatcher whose defaults are these defaults merged
    /// with `overrides`. Interceptors are not copied.
    pub fn create(&self, overrides: &RequestConfig) -> Self {
        Self::new(merge_config(&self.defaults, overrides))
    }

    /// Get the instance defaults.
    pub fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    /// Get mutable access to the instance defaults.
    ///
    /// Changes apply to requests started afterwards.
    pub fn defaults_mut(&mut self) -> &mut RequestConfig {
        &mut self.defaults
    }

    /// Run a request through the pipeline.
    ///
    /// Accepts a full config or just a URL. The config is merged and both
    /// interceptor chains are built before this returns, so registry changes
    /// made after the call do not affect this request.
    pub fn request(
        &self,
        config: impl Into<RequestConfig>,
    ) -> impl Future<Output = Result<Response>> + '_ {
        let prepared = self.prepare(config.into()).map(|config| {
            let request_chain = RequestChain::build(&self.interceptors.request, &config);
            let response_chain = ResponseChain::build(&self.interceptors.response);
            (config, request_chain, response_chain)
        });

        async move {
            let (config, request_chain, response_chain) = prepared?;

            tracing::debug!(
                target: "horizon_lattice_dispatch::dispatcher",
                method = %config.method_or_default(),
                url = %config.full_url(),
                strategy = ?request_chain.strategy(),
                request_interceptors = request_chain.len(),
                response_interceptors = response_chain.len(),
                "dispatching request"
            );

            let outcome = match request_chain.run(config).await {
                RequestOutcome::Dispatch(config) => dispatch_request(config).await,
                RequestOutcome::Forward(error) => Err(error),
                RequestOutcome::Reject(error) => return Err(error),
            };
            response_chain.run(outcome).await
        }
    }

    /// Run a request to `url`, with the rest of the options from `config`.
    pub fn request_with(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + '_ {
        self.request(config.url(url))
    }

    /// Check which execution strategy a request with `config` would use.
    pub fn strategy_for(&self, config: &RequestConfig) -> ExecutionStrategy {
        let merged = merge_config(&self.defaults, config);
        RequestChain::build(&self.interceptors.request, &merged).strategy()
    }

    /// Get the URL a request with `config` would be sent to.
    pub fn get_uri(&self, config: impl Into<RequestConfig>) -> String {
        merge_config(&self.defaults, &config.into()).full_url()
    }

    /// Start a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.verb(Method::Get, url, None)
    }

    /// Start a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.verb(Method::Delete, url, None)
    }

    /// Start a HEAD request.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.verb(Method::Head, url, None)
    }

    /// Start an OPTIONS request.
    pub fn options(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.verb(Method::Options, url, None)
    }

    /// Start a POST request with a body.
    pub fn post(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Post, url, Some(data.into()))
    }

    /// Start a PUT request with a body.
    pub fn put(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Put, url, Some(data.into()))
    }

    /// Start a PATCH request with a body.
    pub fn patch(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Patch, url, Some(data.into()))
    }

    /// Start a multipart POST request.
    pub fn post_form(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Post, url, Some(data.into()))
            .header(CONTENT_TYPE, MULTIPART_FORM_DATA)
    }

    /// Start a multipart PUT request.
    pub fn put_form(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Put, url, Some(data.into()))
            .header(CONTENT_TYPE, MULTIPART_FORM_DATA)
    }

    /// Start a multipart PATCH request.
    pub fn patch_form(&self, url: impl Into<String>, data: impl Into<Body>) -> RequestBuilder<'_> {
        self.verb(Method::Patch, url, Some(data.into()))
            .header(CONTENT_TYPE, MULTIPART_FORM_DATA)
    }

    fn verb(&self, method: Method, url: impl Into<String>, data: Option<Body>) -> RequestBuilder<'_> {
        let mut config = RequestConfig::new().method(method).url(url);
        config.data = data;
        RequestBuilder::new(self, config)
    }

    /// Merge `overrides` over the defaults, settle the method and validate
    /// the transitional options.
    fn prepare(&self, overrides: RequestConfig) -> Result<RequestConfig> {
        let mut config = merge_config(&self.defaults, &overrides);
        config.method = Some(
            overrides
                .method
                .or(self.defaults.method)
                .unwrap_or_default(),
        );

        let validated = config
            .transitional
            .as_ref()
            .map(TransitionalOptions::validate)
            .transpose();
        if let Err(error) = validated {
            return Err(error.with_config(config));
        }
        Ok(config)
    }
}

/// Get the process-wide dispatcher, created with [`default_config`] on
/// first use.
pub fn global() -> &'static Dispatcher {
    static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();
    GLOBAL.get_or_init(Dispatcher::default)
}
