//! Grouped request headers.

use std::collections::HashMap;

use http::HeaderMap;

use crate::http::Method;

/// Request headers, split into the groups instance defaults use.
///
/// Defaults typically put shared headers in `common` and method-specific
/// headers (such as a `Content-Type` for `post`) in `methods`. Right before
/// the adapter is invoked the groups are flattened into `direct`, so an
/// adapter only ever needs to look at `direct`.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    /// Headers sent with every request.
    pub common: HeaderMap,
    /// Headers sent only with requests of a given method.
    pub methods: HashMap<Method, HeaderMap>,
    /// Headers set on this request itself.
    pub direct: HeaderMap,
}

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a direct header value.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.direct
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the header group for a method, creating it if needed.
    pub fn method_group(&mut self, method: Method) -> &mut HeaderMap {
        self.methods.entry(method).or_default()
    }

    /// Check whether all groups have been folded into `direct`.
    pub fn is_flat(&self) -> bool {
        self.common.is_empty() && self.methods.values().all(HeaderMap::is_empty)
    }

    /// Deep-merge `overrides` on top of these headers.
    ///
    /// Groups are merged independently; within a group the override wins
    /// per header name.
    pub fn merged(&self, overrides: &Headers) -> Headers {
        let mut merged = self.clone();
        overlay(&mut merged.common, &overrides.common);
        overlay(&mut merged.direct, &overrides.direct);
        for (method, group) in &overrides.methods {
            overlay(merged.method_group(*method), group);
        }
        merged
    }

    /// Fold `common`, the group for `method` and `direct` (in that order of
    /// precedence, lowest first) into `direct`, and drop every group.
    pub fn flatten(&mut self, method: Method) {
        let mut flat = std::mem::take(&mut self.common);
        if let Some(group) = self.methods.remove(&method) {
            overlay(&mut flat, &group);
        }
        overlay(&mut flat, &self.direct);
        self.direct = flat;
        self.methods.clear();
    }
}

/// Replace every header in `base` that `top` also names, keeping all of
/// `top`'s values for that name.
pub(crate) fn overlay(base: &mut HeaderMap, top: &HeaderMap) {
    for name in top.keys() {
        base.remove(name);
    }
    for (name, value) in top {
        base.append(name.clone(), value.clone());
    }
}
