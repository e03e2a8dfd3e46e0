//! Error types for the dispatch pipeline.
//!
//! Every failure that reaches a caller is a [`DispatchError`]. Errors are
//! tagged with an [`ErrorKind`] rather than distinguished by type, so
//! interceptors can branch on the kind (for example, to leave user
//! cancellations alone while retrying network failures).

use std::fmt;
use std::sync::Arc;

use crate::adapter::TransportHandle;
use crate::config::RequestConfig;
use crate::http::Response;

/// The two flavours of timeout an adapter can report.
///
/// Which one is produced is selected by the `clarifyTimeoutError`
/// transitional option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// Legacy behaviour: timeouts share the connection-aborted code.
    ConnectionAborted,
    /// Clarified behaviour: timeouts carry their own code.
    TimedOut,
}

/// Classification of a [`DispatchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be serviced as configured (unsupported
    /// protocol, unparsable URL, 4xx status rejected by the validator).
    BadRequest,
    /// An unknown configuration option was supplied.
    BadOption,
    /// A configuration option has a value of the wrong shape.
    BadOptionValue,
    /// The response could not be accepted (status rejected by the validator,
    /// body failed strict parsing).
    BadResponse,
    /// Transport-level failure.
    Network,
    /// The request timed out.
    Timeout(TimeoutKind),
    /// The transport aborted the operation.
    Aborted,
    /// The caller cancelled the request through a cancel token or an abort
    /// signal.
    Canceled,
}

impl ErrorKind {
    /// Get the stable string code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "ERR_BAD_REQUEST",
            Self::BadOption => "ERR_BAD_OPTION",
            Self::BadOptionValue => "ERR_BAD_OPTION_VALUE",
            Self::BadResponse => "ERR_BAD_RESPONSE",
            Self::Network => "ERR_NETWORK",
            Self::Timeout(TimeoutKind::ConnectionAborted) | Self::Aborted => "ECONNABORTED",
            Self::Timeout(TimeoutKind::TimedOut) => "ETIMEDOUT",
            Self::Canceled => "ERR_CANCELED",
        }
    }

    /// Check if this kind describes a configuration problem.
    pub fn is_configuration(self) -> bool {
        matches!(self, Self::BadOption | Self::BadOptionValue)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An error produced anywhere in the dispatch pipeline.
///
/// Besides its kind and message, an error carries as much diagnostic context
/// as was available where it was raised: the config that triggered it, the
/// in-flight transport handle, and a partial response.
#[derive(Clone)]
pub struct DispatchError {
    kind: ErrorKind,
    message: String,
    config: Option<Box<RequestConfig>>,
    transport: Option<TransportHandle>,
    response: Option<Box<Response>>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl DispatchError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            config: None,
            transport: None,
            response: None,
            source: None,
        }
    }

    /// Create a cancellation error.
    ///
    /// The message defaults to `"canceled"` when none is given.
    pub fn canceled(message: Option<String>) -> Self {
        Self::new(
            ErrorKind::Canceled,
            message.unwrap_or_else(|| "canceled".to_string()),
        )
    }

    /// Attach the config that triggered this error.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(Box::new(config));
        self
    }

    /// Attach the transport handle of the in-flight operation.
    pub fn with_transport(mut self, transport: TransportHandle) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach a (partial) response.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// Attach the underlying error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the stable string code of the error kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the config that triggered this error, if known.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_deref()
    }

    /// Get the transport handle of the in-flight operation, if any.
    pub fn transport(&self) -> Option<&TransportHandle> {
        self.transport.as_ref()
    }

    /// Get the partial response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Get mutable access to the partial response, if any.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_deref_mut()
    }

    /// Take the partial response out of this error.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take().map(|response| *response)
    }

    /// Check if this error is a user-initiated cancellation.
    pub fn is_cancel(&self) -> bool {
        self.kind == ErrorKind::Canceled
    }

    /// Check if this error is a timeout of either flavour.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout(_))
    }
}

impl fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("transport", &self.transport)
            .field("status", &self.response.as_ref().map(|r| r.status))
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A specialized Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
