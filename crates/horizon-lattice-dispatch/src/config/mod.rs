//! Request configuration.
//!
//! A [`RequestConfig`] describes one request: where it goes, what it carries,
//! and how the pipeline should treat it. Every option is optional so that a
//! per-call config can be layered over instance defaults with
//! [`merge_config`]; unset options fall back to the defaults.

mod headers;
mod merge;
mod settings;
mod transitional;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use headers::Headers;
pub use merge::merge_config;
pub use settings::{DispatcherSettings, SettingsError};
pub use transitional::{Transitional, TransitionalOptions};

use crate::adapter::Adapter;
use crate::cancel::{AbortSignal, CancelToken};
use crate::error::Result;
use crate::http::url::{ParamsSerializer, build_full_path, build_url};
use crate::http::{Authentication, Body, Method, ResponseType, TransferProgress};
use crate::transform::Transform;

/// Callback receiving transfer progress updates.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Decides whether a response status resolves or rejects the request.
#[derive(Clone)]
pub enum StatusValidator {
    /// Every status resolves the request.
    AcceptAll,
    /// The closure decides.
    Custom(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl StatusValidator {
    /// Accept only 2xx statuses.
    pub fn success() -> Self {
        Self::custom(|status| (200..300).contains(&status))
    }

    /// Wrap a closure.
    pub fn custom(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Check if a status is accepted.
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::Custom(f) => f(status),
        }
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcceptAll => f.write_str("AcceptAll"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Configuration of a single request, or of a dispatcher's defaults.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// Request URL, absolute or relative to `base_url`.
    pub url: Option<String>,
    /// Request method.
    pub method: Option<Method>,
    /// Base URL prepended to relative request URLs.
    pub base_url: Option<String>,
    /// Request headers.
    pub headers: Headers,
    /// Query parameters.
    pub params: Option<Vec<(String, String)>>,
    /// Serializer for `params`.
    pub params_serializer: Option<Arc<dyn ParamsSerializer>>,
    /// Request payload.
    pub data: Option<Body>,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Message used for timeout errors instead of the generated one.
    pub timeout_error_message: Option<String>,
    /// Transport adapter.
    pub adapter: Option<Arc<dyn Adapter>>,
    /// Transforms applied to the payload before it is sent.
    pub transform_request: Option<Vec<Transform>>,
    /// Transforms applied to the payload after it is received.
    pub transform_response: Option<Vec<Transform>>,
    /// Token-based cancellation source.
    pub cancel_token: Option<CancelToken>,
    /// Abort-signal cancellation source.
    pub signal: Option<AbortSignal>,
    /// Credentials.
    pub auth: Option<Authentication>,
    /// Whether cross-site requests should carry credentials.
    pub with_credentials: Option<bool>,
    /// Shape of the response payload.
    pub response_type: Option<ResponseType>,
    /// Download progress callback.
    pub on_download_progress: Option<ProgressCallback>,
    /// Upload progress callback.
    pub on_upload_progress: Option<ProgressCallback>,
    /// Name of the cookie carrying the XSRF token.
    pub xsrf_cookie_name: Option<String>,
    /// Name of the header the XSRF token is sent in.
    pub xsrf_header_name: Option<String>,
    /// Status validation used when settling a response.
    pub validate_status: Option<StatusValidator>,
    /// Deprecation-staged behaviour flags.
    pub transitional: Option<TransitionalOptions>,
}

impl RequestConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set a header on this request.
    ///
    /// Invalid header names or values are ignored.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.direct.insert(name, value);
        }
        self
    }

    /// Set a header sent with every method.
    pub fn common_header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.common.insert(name, value);
        }
        self
    }

    /// Set a header sent only with requests of the given method.
    pub fn method_header(
        mut self,
        method: Method,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.method_group(method).insert(name, value);
        }
        self
    }

    /// Replace the header groups.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Replace the query parameters.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params = Some(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Set the query parameter serializer.
    pub fn params_serializer(mut self, serializer: impl ParamsSerializer + 'static) -> Self {
        self.params_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set the request payload.
    pub fn data(mut self, data: impl Into<Body>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set a JSON payload from a serializable value.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.data = Some(Body::json(value)?);
        Ok(self)
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the message used for timeout errors.
    pub fn timeout_error_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_error_message = Some(message.into());
        self
    }

    /// Set the transport adapter.
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Set the transport adapter from a shared handle.
    pub fn shared_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Replace the request transforms.
    pub fn transform_request(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_request = Some(transforms);
        self
    }

    /// Replace the response transforms.
    pub fn transform_response(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_response = Some(transforms);
        self
    }

    /// Set the cancel token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Set the abort signal.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set basic authentication.
    pub fn basic_auth(
        mut self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        self.auth = Some(Authentication::Basic {
            username: username.into(),
            password: password.map(Into::into),
        });
        self
    }

    /// Set bearer token authentication.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Authentication::Bearer(token.into()));
        self
    }

    /// Set whether cross-site requests carry credentials.
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    /// Set the response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set the download progress callback.
    pub fn on_download_progress(
        mut self,
        callback: impl Fn(TransferProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_download_progress = Some(Arc::new(callback));
        self
    }

    /// Set the upload progress callback.
    pub fn on_upload_progress(
        mut self,
        callback: impl Fn(TransferProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_upload_progress = Some(Arc::new(callback));
        self
    }

    /// Set the XSRF cookie name.
    pub fn xsrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = Some(name.into());
        self
    }

    /// Set the XSRF header name.
    pub fn xsrf_header_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_header_name = Some(name.into());
        self
    }

    /// Set the status validator.
    pub fn validate_status(mut self, validator: StatusValidator) -> Self {
        self.validate_status = Some(validator);
        self
    }

    /// Set the transitional options.
    pub fn transitional(mut self, options: TransitionalOptions) -> Self {
        self.transitional = Some(options);
        self
    }

    /// Get the method, falling back to `get`.
    pub fn method_or_default(&self) -> Method {
        self.method.unwrap_or_default()
    }

    /// Get the response type, falling back to `json`.
    pub fn response_type_or_default(&self) -> ResponseType {
        self.response_type.unwrap_or_default()
    }

    /// Resolve the transitional flags, using defaults for anything unset or
    /// malformed.
    pub fn transitional_flags(&self) -> Transitional {
        self.transitional
            .as_ref()
            .map(TransitionalOptions::resolve)
            .unwrap_or_default()
    }

    /// Check a response status against the configured validator.
    ///
    /// Without a validator every status is accepted.
    pub fn accepts_status(&self, status: u16) -> bool {
        self.validate_status
            .as_ref()
            .is_none_or(|validator| validator.accepts(status))
    }

    /// The request URL joined onto the base URL, without query parameters.
    pub fn full_path(&self) -> String {
        build_full_path(self.base_url.as_deref(), self.url.as_deref().unwrap_or(""))
    }

    /// The complete request URL including serialized query parameters.
    pub fn full_url(&self) -> String {
        build_url(
            &self.full_path(),
            self.params.as_deref(),
            self.params_serializer.as_deref(),
        )
    }
}

impl From<&str> for RequestConfig {
    fn from(url: &str) -> Self {
        Self::new().url(url)
    }
}

impl From<String> for RequestConfig {
    fn from(url: String) -> Self {
        Self::new().url(url)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("has_adapter", &self.adapter.is_some())
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .field("cancel_token", &self.cancel_token)
            .field("signal", &self.signal)
            .field("auth", &self.auth.as_ref().map(|_| ".."))
            .field("response_type", &self.response_type)
            .field("validate_status", &self.validate_status)
            .field("transitional", &self.transitional)
            .finish_non_exhaustive()
    }
}
