//! Request-side value types: methods, bodies and credentials.

use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{DispatchError, ErrorKind, Result};

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl Method {
    /// Every supported method, in the order header groups are documented.
    pub const ALL: [Method; 7] = [
        Self::Delete,
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Options,
    ];

    /// Get the normalized (lower-case) name of this method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Head => "head",
            Self::Options => "options",
        }
    }

    /// Convert to the `http` crate's method type.
    pub fn to_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Delete => http::Method::DELETE,
            Self::Patch => http::Method::PATCH,
            Self::Head => http::Method::HEAD,
            Self::Options => http::Method::OPTIONS,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DispatchError;

    /// Parse a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DispatchError::new(
                    ErrorKind::BadOptionValue,
                    format!("unsupported method {s:?}"),
                )
            })
    }
}

/// The payload of a request or response.
///
/// Transforms convert between these shapes: the default request transform
/// turns [`Body::Json`] into [`Body::Text`], and the default response
/// transform parses [`Body::Text`] back into [`Body::Json`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Plain text.
    Text(String),
    /// A JSON document.
    Json(serde_json::Value),
    /// Form fields, url-encoded or multipart depending on the content type.
    Form(Vec<(String, String)>),
    /// Raw binary data.
    Bytes(Bytes),
}

impl Body {
    /// Serialize a value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value).map(Self::Json).map_err(|e| {
            DispatchError::new(ErrorKind::BadRequest, format!("invalid JSON body: {e}"))
                .with_source(e)
        })
    }

    /// Build a form body from key/value pairs.
    pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if there is no payload.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Json(_) => false,
            Self::Form(fields) => fields.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Get the body as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Get the body as a JSON document, if it is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Authentication credentials for a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authentication {
    /// HTTP Basic authentication.
    Basic {
        /// Username.
        username: String,
        /// Password (optional).
        password: Option<String>,
    },
    /// Bearer token authentication.
    Bearer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(" options ".parse::<Method>().unwrap(), Method::Options);

        let err = "TRACE".parse::<Method>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadOptionValue);
    }

    #[test]
    fn test_method_display_is_normalized() {
        assert_eq!(Method::Delete.to_string(), "delete");
        assert_eq!(Method::Delete.to_http(), http::Method::DELETE);
    }

    #[test]
    fn test_body_emptiness() {
        assert!(Body::Empty.is_empty());
        assert!(Body::from("").is_empty());
        assert!(!Body::Json(serde_json::Value::Null).is_empty());
        assert!(Body::form(Vec::<(String, String)>::new()).is_empty());
        assert!(!Body::form([("a", "1")]).is_empty());
    }

    #[test]
    fn test_body_json_serializes() {
        let body = Body::json(&serde_json::json!({"name": "John"})).unwrap();
        assert_eq!(body.as_json().unwrap()["name"], "John");
    }
}
