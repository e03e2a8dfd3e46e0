//! Instance defaults.

use http::header::{ACCEPT, CONTENT_TYPE};

use crate::config::{Headers, RequestConfig, StatusValidator};
use crate::http::{Method, ResponseType};
use crate::transform::{default_request_transform, default_response_transform};

/// The `Accept` header sent with every request.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
/// The `Content-Type` for methods carrying a body.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Cookie the XSRF token is read from.
pub const DEFAULT_XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
/// Header the XSRF token is sent in.
pub const DEFAULT_XSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

/// Build the default config of a new [`Dispatcher`](crate::Dispatcher).
///
/// Sets JSON-friendly headers, the default JSON and form transforms, 2xx
/// status validation and the XSRF names. The transitional options are left
/// unset, so every flag takes its default.
pub fn default_config() -> RequestConfig {
    let mut headers = Headers::new();
    headers
        .common
        .insert(ACCEPT, http::HeaderValue::from_static(DEFAULT_ACCEPT));
    for method in [Method::Post, Method::Put, Method::Patch] {
        headers
            .method_group(method)
            .insert(CONTENT_TYPE, http::HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }

    RequestConfig::new()
        .headers(headers)
        .transform_request(vec![default_request_transform()])
        .transform_response(vec![default_response_transform()])
        .validate_status(StatusValidator::success())
        .response_type(ResponseType::Json)
        .xsrf_cookie_name(DEFAULT_XSRF_COOKIE_NAME)
        .xsrf_header_name(DEFAULT_XSRF_HEADER_NAME)
}
