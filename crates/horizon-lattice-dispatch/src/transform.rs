//! Payload transforms applied before a request is sent and after a response
//! arrives.

use std::fmt;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, HeaderValue};
use http::HeaderMap;

use crate::config::RequestConfig;
use crate::error::{DispatchError, ErrorKind, Result};
use crate::http::{Body, ResponseType};

type TransformFn =
    dyn Fn(&RequestConfig, Body, &mut HeaderMap, Option<u16>) -> Result<Body> + Send + Sync;

/// A single payload transform.
///
/// A transform receives the config of the request it runs for, the current
/// payload, the headers (which it may edit in place) and, on the response
/// side, the status code.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RequestConfig, Body, &mut HeaderMap, Option<u16>) -> Result<Body>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run this transform.
    pub fn apply(
        &self,
        context: &RequestConfig,
        data: Body,
        headers: &mut HeaderMap,
        status: Option<u16>,
    ) -> Result<Body> {
        (self.0)(context, data, headers, status)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Run `fns` left to right over `data`.
///
/// Each transform gets the previous one's output; all of them share
/// `context` and `headers`. With no transforms, `data` is returned as is.
pub fn transform_data(
    context: &RequestConfig,
    data: Body,
    headers: &mut HeaderMap,
    status: Option<u16>,
    fns: Option<&[Transform]>,
) -> Result<Body> {
    fns.unwrap_or_default()
        .iter()
        .try_fold(data, |data, transform| {
            transform.apply(context, data, headers, status)
        })
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

fn set_content_type_if_unset(headers: &mut HeaderMap, value: &'static str) {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
    }
}

/// The default request transform.
///
/// JSON bodies are serialized to text and get an `application/json` content
/// type unless one is set. Form bodies are url-encoded, except when the
/// content type asks for multipart, in which case the adapter encodes them.
pub fn default_request_transform() -> Transform {
    Transform::new(|_, data, headers, _| match data {
        Body::Json(value) => {
            set_content_type_if_unset(headers, "application/json");
            serde_json::to_string(&value).map(Body::Text).map_err(|e| {
                DispatchError::new(ErrorKind::BadRequest, format!("invalid JSON body: {e}"))
                    .with_source(e)
            })
        }
        Body::Form(fields)
            if !content_type(headers).is_some_and(|ct| ct.starts_with("multipart/form-data")) =>
        {
            set_content_type_if_unset(headers, "application/x-www-form-urlencoded;charset=utf-8");
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish();
            Ok(Body::Text(encoded))
        }
        other => Ok(other),
    })
}

/// The default response transform.
///
/// Text is parsed as JSON when the response type is `json` and silent
/// parsing is off (a parse failure rejects with
/// [`ErrorKind::BadResponse`]), or whenever forced parsing is on and the
/// text is non-empty (a parse failure keeps the text).
pub fn default_response_transform() -> Transform {
    Transform::new(|config, data, _, _| {
        let flags = config.transitional_flags();
        let strict = !flags.silent_json_parsing
            && config.response_type_or_default() == ResponseType::Json;

        let Body::Text(text) = data else {
            return Ok(data);
        };
        if !strict && !(flags.forced_json_parsing && !text.is_empty()) {
            return Ok(Body::Text(text));
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Ok(Body::Json(value)),
            Err(e) if strict => Err(DispatchError::new(
                ErrorKind::BadResponse,
                format!("invalid JSON response: {e}"),
            )
            .with_config(config.clone())
            .with_source(e)),
            Err(_) => Ok(Body::Text(text)),
        }
    })
}
