//! Instance defaults loaded from TOML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use super::{RequestConfig, TransitionalOptions};
use crate::http::{Method, ResponseType};

/// Errors that can occur while loading [`DispatcherSettings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings are not valid TOML or have the wrong shape.
    #[error("Invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// A header name or value is invalid.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    /// A method name (or header group) is not recognized.
    #[error("Invalid method '{0}'")]
    InvalidMethod(String),
}

/// Serializable instance defaults.
///
/// ```toml
/// base_url = "https://api.example.com"
/// timeout_ms = 5000
///
/// [headers.common]
/// accept = "application/json"
///
/// [headers.post]
/// content-type = "application/json"
///
/// [transitional]
/// clarifyTimeoutError = true
/// ```
///
/// Header tables are keyed by group: `common`, `direct`, or a method name.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherSettings {
    /// Base URL for relative request URLs.
    pub base_url: Option<String>,
    /// Default method.
    pub method: Option<String>,
    /// Request timeout in milliseconds; zero disables the timeout.
    pub timeout_ms: Option<u64>,
    /// Message used for timeout errors.
    pub timeout_error_message: Option<String>,
    /// Default response type.
    pub response_type: Option<ResponseType>,
    /// Whether cross-site requests carry credentials.
    pub with_credentials: Option<bool>,
    /// XSRF cookie name.
    pub xsrf_cookie_name: Option<String>,
    /// XSRF header name.
    pub xsrf_header_name: Option<String>,
    /// Header tables by group.
    pub headers: BTreeMap<String, BTreeMap<String, String>>,
    /// Default query parameters.
    pub params: BTreeMap<String, String>,
    /// Transitional options, validated when a request is made.
    pub transitional: BTreeMap<String, serde_json::Value>,
}

impl DispatcherSettings {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Convert into a config usable as dispatcher defaults.
    ///
    /// The result only carries what the settings specify; layer it over
    /// [`default_config`](crate::defaults::default_config) to keep the
    /// built-in transforms and headers.
    pub fn into_config(self) -> Result<RequestConfig, SettingsError> {
        let mut config = RequestConfig::new();
        config.base_url = self.base_url;
        config.method = self
            .method
            .map(|name| {
                name.parse::<Method>()
                    .map_err(|_| SettingsError::InvalidMethod(name))
            })
            .transpose()?;
        // Zero means no timeout
        config.timeout = self
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        config.timeout_error_message = self.timeout_error_message;
        config.response_type = self.response_type;
        config.with_credentials = self.with_credentials;
        config.xsrf_cookie_name = self.xsrf_cookie_name;
        config.xsrf_header_name = self.xsrf_header_name;

        for (group, entries) in self.headers {
            let target = match group.as_str() {
                "common" => &mut config.headers.common,
                "direct" => &mut config.headers.direct,
                other => {
                    let method = other
                        .parse::<Method>()
                        .map_err(|_| SettingsError::InvalidMethod(group.clone()))?;
                    config.headers.method_group(method)
                }
            };
            insert_headers(target, entries)?;
        }

        if !self.params.is_empty() {
            config.params = Some(self.params.into_iter().collect());
        }
        if !self.transitional.is_empty() {
            config.transitional = Some(self.transitional.into_iter().collect::<TransitionalOptions>());
        }

        tracing::debug!(
            target: "horizon_lattice_dispatch::config",
            base_url = ?config.base_url,
            "Loaded dispatcher settings"
        );
        Ok(config)
    }
}

fn insert_headers(
    target: &mut HeaderMap,
    entries: BTreeMap<String, String>,
) -> Result<(), SettingsError> {
    for (name, value) in entries {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| SettingsError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|e| SettingsError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        target.insert(header_name, header_value);
    }
    Ok(())
}
