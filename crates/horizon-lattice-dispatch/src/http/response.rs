//! Response types.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::request::Body;
use crate::adapter::TransportHandle;
use crate::config::RequestConfig;
use crate::error::{DispatchError, ErrorKind, Result};

/// The shape an adapter should deliver the response payload in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Text that the response transforms parse as JSON.
    #[default]
    Json,
    /// Plain text, left unparsed unless forced JSON parsing applies.
    Text,
    /// Raw bytes.
    Bytes,
}

/// A normalized response returned by an adapter.
#[derive(Clone, Debug)]
pub struct Response {
    /// The (transformed) payload.
    pub data: Body,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// The finalized config the request was sent with.
    pub config: RequestConfig,
    /// Handle of the transport operation that produced this response.
    pub request: TransportHandle,
}

impl Response {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response is a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Deserialize the payload.
    ///
    /// Works on parsed JSON, text and raw bytes alike.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let parsed = match &self.data {
            Body::Json(value) => T::deserialize(value).map_err(|e| e.to_string()),
            Body::Text(text) => serde_json::from_str(text).map_err(|e| e.to_string()),
            Body::Bytes(bytes) => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Body::Empty | Body::Form(_) => Err("response has no JSON payload".to_string()),
        };
        parsed.map_err(|msg| {
            DispatchError::new(ErrorKind::BadResponse, msg)
                .with_config(self.config.clone())
                .with_transport(self.request.clone())
        })
    }
}

/// Progress information for downloads/uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferProgress {
    /// Number of bytes transferred so far.
    pub bytes_transferred: u64,
    /// Total number of bytes, if known.
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Get the progress as a fraction (0.0 to 1.0), if total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.bytes_transferred as f64 / total as f64
            }
        })
    }

    /// Get the progress as a percentage (0 to 100), if total is known.
    pub fn percent(&self) -> Option<u8> {
        self.fraction().map(|f| (f * 100.0).min(100.0) as u8)
    }
}
