//! The default adapter, backed by `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;

use super::{Adapter, AdapterFuture, TransportHandle, settle};
use crate::config::RequestConfig;
use crate::error::{DispatchError, ErrorKind, Result, TimeoutKind};
use crate::http::url::parse_protocol;
use crate::http::{Authentication, Body, Response, ResponseType, TransferProgress};

const SUPPORTED_PROTOCOLS: [&str; 2] = ["http", "https"];

/// Client-level configuration for [`HttpAdapter`].
///
/// Per-request settings such as the timeout come from the
/// [`RequestConfig`] instead.
#[derive(Clone, Debug)]
pub struct HttpAdapterConfig {
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for HttpAdapterConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!(
                "HorizonLattice/{} (Rust)",
                env!("CARGO_PKG_VERSION")
            )),
            proxy: None,
        }
    }
}

/// Builder for an [`HttpAdapter`].
pub struct HttpAdapterBuilder {
    config: HttpAdapterConfig,
}

impl Default for HttpAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAdapterBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpAdapterConfig::default(),
        }
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<HttpAdapter> {
        let mut builder = reqwest::Client::builder();

        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if self.config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                DispatchError::new(ErrorKind::BadOptionValue, format!("invalid proxy: {e}"))
                    .with_source(e)
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            DispatchError::new(ErrorKind::Network, format!("failed to build HTTP client: {e}"))
                .with_source(e)
        })?;

        Ok(HttpAdapter {
            inner: Arc::new(HttpAdapterInner {
                client,
                config: self.config,
            }),
        })
    }
}

struct HttpAdapterInner {
    client: reqwest::Client,
    config: HttpAdapterConfig,
}

/// An adapter that performs real HTTP requests.
///
/// The adapter is cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct HttpAdapter {
    inner: Arc<HttpAdapterInner>,
}

impl HttpAdapter {
    /// Create a builder for configuring a new adapter.
    pub fn builder() -> HttpAdapterBuilder {
        HttpAdapterBuilder::new()
    }

    /// Get the adapter's configuration.
    pub fn config(&self) -> &HttpAdapterConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for HttpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Adapter for HttpAdapter {
    fn dispatch(&self, config: RequestConfig, transport: TransportHandle) -> AdapterFuture {
        let client = self.inner.client.clone();
        async move { send(client, config, transport).await }.boxed()
    }

    fn abort(&self, transport: &TransportHandle) {
        // Dropping the in-flight future closes the connection
        tracing::debug!(
            target: "horizon_lattice_dispatch::adapter",
            id = %transport.id(),
            url = transport.url(),
            "aborting HTTP request"
        );
    }
}

async fn send(
    client: reqwest::Client,
    mut config: RequestConfig,
    transport: TransportHandle,
) -> Result<Response> {
    let full_url = transport.url().to_string();

    if let Some(protocol) = parse_protocol(&full_url)
        && !SUPPORTED_PROTOCOLS.contains(&protocol)
    {
        return Err(DispatchError::new(
            ErrorKind::BadRequest,
            format!("Unsupported protocol {protocol}:"),
        )
        .with_config(config)
        .with_transport(transport));
    }

    let url = match url::Url::parse(&full_url) {
        Ok(url) => url,
        Err(e) => {
            return Err(DispatchError::new(
                ErrorKind::BadRequest,
                format!("Invalid URL {full_url:?}: {e}"),
            )
            .with_source(e)
            .with_config(config)
            .with_transport(transport));
        }
    };

    let data = config.data.clone().unwrap_or_default();
    let mut headers = config.headers.direct.clone();
    if data.is_empty() {
        headers.remove(CONTENT_TYPE);
    }

    let mut builder = client.request(transport.method().to_http(), url);

    if let Some(auth) = &config.auth {
        headers.remove(AUTHORIZATION);
        match auth {
            Authentication::Basic { username, password } => {
                builder = builder.basic_auth(username, password.as_ref());
            }
            Authentication::Bearer(token) => {
                builder = builder.bearer_auth(token);
            }
        }
    }

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    let upload_size = body_size(&data);
    builder = match data {
        Body::Empty => builder,
        Body::Text(text) => builder.body(text),
        Body::Json(value) => builder.body(value.to_string()),
        Body::Bytes(bytes) => builder.body(bytes),
        Body::Form(fields) => {
            let multipart = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("multipart/form-data"));
            if multipart {
                // reqwest sets the content type with its boundary
                headers.remove(CONTENT_TYPE);
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        form.text(name, value)
                    });
                builder.multipart(form)
            } else {
                builder.form(&fields)
            }
        }
    };
    builder = builder.headers(headers);

    tracing::debug!(
        target: "horizon_lattice_dispatch::adapter",
        id = %transport.id(),
        method = %transport.method(),
        url = transport.url(),
        "sending HTTP request"
    );

    let mut response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return Err(classify(e, config, transport)),
    };

    if let (Some(on_upload), Some(size)) = (&config.on_upload_progress, upload_size) {
        on_upload(TransferProgress {
            bytes_transferred: size,
            total_bytes: Some(size),
        });
    }

    let status = response.status();
    let response_headers = response.headers().clone();
    let total_bytes = response.content_length();

    let mut buffer = Vec::new();
    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => return Err(classify(e, config, transport)),
        };
        buffer.extend_from_slice(&chunk);
        if let Some(on_download) = &config.on_download_progress {
            on_download(TransferProgress {
                bytes_transferred: buffer.len() as u64,
                total_bytes,
            });
        }
    }

    let data = match config.response_type_or_default() {
        ResponseType::Bytes => Body::Bytes(buffer.into()),
        ResponseType::Json | ResponseType::Text => {
            Body::Text(String::from_utf8_lossy(&buffer).into_owned())
        }
    };

    // The payload now lives in the response
    config.data = None;
    settle(Response {
        data,
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers: response_headers,
        config,
        request: transport,
    })
}

fn body_size(data: &Body) -> Option<u64> {
    match data {
        Body::Empty => None,
        Body::Text(text) => Some(text.len() as u64),
        Body::Json(value) => Some(value.to_string().len() as u64),
        Body::Bytes(bytes) => Some(bytes.len() as u64),
        Body::Form(_) => None,
    }
}

fn classify(err: reqwest::Error, config: RequestConfig, transport: TransportHandle) -> DispatchError {
    let error = if err.is_timeout() {
        let kind = if config.transitional_flags().clarify_timeout_error {
            TimeoutKind::TimedOut
        } else {
            TimeoutKind::ConnectionAborted
        };
        let message = config.timeout_error_message.clone().unwrap_or_else(|| {
            match config.timeout {
                Some(timeout) => format!("timeout of {}ms exceeded", timeout.as_millis()),
                None => "timeout exceeded".to_string(),
            }
        });
        DispatchError::new(ErrorKind::Timeout(kind), message)
    } else {
        tracing::warn!(
            target: "horizon_lattice_dispatch::adapter",
            id = %transport.id(),
            error = %err,
            "HTTP transport failed"
        );
        DispatchError::new(ErrorKind::Network, "Network Error")
    };
    error
        .with_source(err)
        .with_config(config)
        .with_transport(transport)
}
