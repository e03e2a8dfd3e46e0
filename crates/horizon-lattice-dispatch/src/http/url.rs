//! URL construction: joining base URLs and appending query parameters.

/// Serializes query parameters into a query string (without the leading `?`).
pub trait ParamsSerializer: Send + Sync {
    /// Serialize the given key/value pairs.
    fn serialize(&self, params: &[(String, String)]) -> String;
}

/// The default serializer: form-encoding that keeps `:`, `$`, `,`, `[` and
/// `]` readable and encodes spaces as `+`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormParamsSerializer;

impl ParamsSerializer for FormParamsSerializer {
    fn serialize(&self, params: &[(String, String)]) -> String {
        params
            .iter()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<F> ParamsSerializer for F
where
    F: Fn(&[(String, String)]) -> String + Send + Sync,
{
    fn serialize(&self, params: &[(String, String)]) -> String {
        self(params)
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

/// Check if a URL is absolute (`scheme://...` or protocol-relative `//...`).
pub fn is_absolute_url(url: &str) -> bool {
    let rest = match url.find(':') {
        Some(colon) => {
            let scheme = &url[..colon];
            let valid_scheme = scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if valid_scheme { &url[colon + 1..] } else { url }
        }
        None => url,
    };
    rest.starts_with("//")
}

/// Join a base URL and a relative URL with exactly one slash between them.
pub fn combine_urls(base_url: &str, relative_url: &str) -> String {
    if relative_url.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative_url.trim_start_matches('/')
    )
}

/// Resolve the request URL against the base URL.
///
/// Absolute request URLs are returned unchanged.
pub fn build_full_path(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_string(),
    }
}

/// Append serialized query parameters to a URL.
///
/// Any fragment is dropped when parameters are appended.
pub fn build_url(
    url: &str,
    params: Option<&[(String, String)]>,
    serializer: Option<&dyn ParamsSerializer>,
) -> String {
    let Some(params) = params else {
        return url.to_string();
    };

    let query = match serializer {
        Some(serializer) => serializer.serialize(params),
        None => FormParamsSerializer.serialize(params),
    };
    if query.is_empty() {
        return url.to_string();
    }

    let url = match url.find('#') {
        Some(hash) => &url[..hash],
        None => url,
    };
    if url.contains('?') {
        format!("{url}&{query}")
    } else {
        format!("{url}?{query}")
    }
}

/// Extract the protocol (scheme) of a URL, if it has one.
pub fn parse_protocol(url: &str) -> Option<&str> {
    let end = url.find(':')?;
    let scheme = &url[..end];
    let valid = !scheme.is_empty()
        && scheme.len() <= 25
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
    valid.then_some(scheme)
}
