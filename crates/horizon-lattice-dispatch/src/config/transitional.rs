//! Deprecation-staged behaviour flags.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::error::{DispatchError, ErrorKind, Result};

struct AllowedOption {
    name: &'static str,
    warned: AtomicBool,
}

impl AllowedOption {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            warned: AtomicBool::new(false),
        }
    }

    fn warn_once(&self) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: "horizon_lattice_dispatch::config",
                "transitional option '{}' is deprecated and will be removed in a future release",
                self.name
            );
        }
    }
}

static ALLOWED: [AllowedOption; 3] = [
    AllowedOption::new("silentJSONParsing"),
    AllowedOption::new("forcedJSONParsing"),
    AllowedOption::new("clarifyTimeoutError"),
];

/// The resolved transitional flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transitional {
    /// Swallow JSON parse failures of `json` responses instead of rejecting.
    pub silent_json_parsing: bool,
    /// Parse any non-empty text response as JSON when possible.
    pub forced_json_parsing: bool,
    /// Report timeouts as [`TimeoutKind::TimedOut`](crate::TimeoutKind)
    /// instead of the connection-aborted flavour.
    pub clarify_timeout_error: bool,
}

impl Default for Transitional {
    fn default() -> Self {
        Self {
            silent_json_parsing: true,
            forced_json_parsing: true,
            clarify_timeout_error: false,
        }
    }
}

impl Transitional {
    fn set(&mut self, name: &str, value: bool) {
        match name {
            "silentJSONParsing" => self.silent_json_parsing = value,
            "forcedJSONParsing" => self.forced_json_parsing = value,
            "clarifyTimeoutError" => self.clarify_timeout_error = value,
            _ => {}
        }
    }
}

/// Transitional options as supplied by the caller.
///
/// Values are kept untyped until [`validate`](Self::validate) checks them
/// against the allow-list, so a misspelled name or a non-boolean value is
/// reported instead of silently dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionalOptions {
    values: BTreeMap<String, Value>,
}

impl TransitionalOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Get the raw value of an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate every option against the allow-list and resolve the flags.
    ///
    /// Fails with [`ErrorKind::BadOption`] for an unknown name and
    /// [`ErrorKind::BadOptionValue`] for a non-boolean value.
    pub fn validate(&self) -> Result<Transitional> {
        let mut flags = Transitional::default();
        for (name, value) in &self.values {
            let Some(option) = ALLOWED.iter().find(|option| option.name == name.as_str()) else {
                return Err(DispatchError::new(
                    ErrorKind::BadOption,
                    format!("Unknown option {name}"),
                ));
            };
            let Some(value) = value.as_bool() else {
                return Err(DispatchError::new(
                    ErrorKind::BadOptionValue,
                    format!("option {name} must be a boolean"),
                ));
            };
            option.warn_once();
            flags.set(name, value);
        }
        Ok(flags)
    }

    /// Resolve the flags leniently: anything unknown or malformed keeps its
    /// default.
    pub fn resolve(&self) -> Transitional {
        let mut flags = Transitional::default();
        for (name, value) in &self.values {
            if let Some(value) = value.as_bool() {
                flags.set(name, value);
            }
        }
        flags
    }
}

impl FromIterator<(String, Value)> for TransitionalOptions {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_known_booleans() {
        let options = TransitionalOptions::new()
            .set("clarifyTimeoutError", true)
            .set("silentJSONParsing", false);
        let flags = options.validate().unwrap();
        assert!(flags.clarify_timeout_error);
        assert!(!flags.silent_json_parsing);
        assert!(flags.forced_json_parsing);
    }

    #[test]
    fn test_validate_rejects_unknown_option() {
        let err = TransitionalOptions::new()
            .set("strictParsing", true)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadOption);
        assert_eq!(err.message(), "Unknown option strictParsing");
    }

    #[test]
    fn test_validate_rejects_non_boolean() {
        let err = TransitionalOptions::new()
            .set("forcedJSONParsing", "yes")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadOptionValue);
        assert_eq!(err.message(), "option forcedJSONParsing must be a boolean");
    }

    #[test]
    fn test_resolve_is_lenient() {
        let flags = TransitionalOptions::new()
            .set("forcedJSONParsing", "yes")
            .set("clarifyTimeoutError", true)
            .resolve();
        assert!(flags.forced_json_parsing);
        assert!(flags.clarify_timeout_error);
    }
}
