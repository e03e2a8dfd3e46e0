//! Layering a per-call config over instance defaults.

use super::RequestConfig;

/// Merge `overrides` on top of `base`, returning a new config.
///
/// Each option follows one of these strategies:
///
/// - **override only**: `url`, `method` and `data` describe a single call and
///   are never inherited from defaults.
/// - **deep merge**: `headers` are merged per group, and within a group per
///   header name.
/// - **direct**: `validate_status` takes the override whenever one is set,
///   including [`StatusValidator::AcceptAll`](super::StatusValidator), and
///   otherwise keeps the base.
/// - **replace**: every other option takes the override if set, else the base.
///   Transform lists are replaced as a whole.
///
/// Neither input is modified.
pub fn merge_config(base: &RequestConfig, overrides: &RequestConfig) -> RequestConfig {
    RequestConfig {
        url: overrides.url.clone(),
        method: overrides.method,
        data: overrides.data.clone(),
        headers: base.headers.merged(&overrides.headers),
        // An explicit AcceptAll on the override wins like any other value
        validate_status: replace(&base.validate_status, &overrides.validate_status),
        base_url: replace(&base.base_url, &overrides.base_url),
        params: replace(&base.params, &overrides.params),
        params_serializer: replace(&base.params_serializer, &overrides.params_serializer),
        timeout: replace(&base.timeout, &overrides.timeout),
        timeout_error_message: replace(
            &base.timeout_error_message,
            &overrides.timeout_error_message,
        ),
        adapter: replace(&base.adapter, &overrides.adapter),
        transform_request: replace(&base.transform_request, &overrides.transform_request),
        transform_response: replace(&base.transform_response, &overrides.transform_response),
        cancel_token: replace(&base.cancel_token, &overrides.cancel_token),
        signal: replace(&base.signal, &overrides.signal),
        auth: replace(&base.auth, &overrides.auth),
        with_credentials: replace(&base.with_credentials, &overrides.with_credentials),
        response_type: replace(&base.response_type, &overrides.response_type),
        on_download_progress: replace(
            &base.on_download_progress,
            &overrides.on_download_progress,
        ),
        on_upload_progress: replace(&base.on_upload_progress, &overrides.on_upload_progress),
        xsrf_cookie_name: replace(&base.xsrf_cookie_name, &overrides.xsrf_cookie_name),
        xsrf_header_name: replace(&base.xsrf_header_name, &overrides.xsrf_header_name),
        transitional: replace(&base.transitional, &overrides.transitional),
    }
}

fn replace<T: Clone>(base: &Option<T>, overrides: &Option<T>) -> Option<T> {
    overrides.as_ref().or(base.as_ref()).cloned()
}
