//! Source URI construction.

use reqwest::Url;

use crate::error::{FetchError, FetchResult};

/// Ordered query parameters.
pub type Params = Vec<(&'static str, String)>;

/// Append `params` to `base`, percent-encoded.
///
/// Parameters already present in `base` are kept and the new ones follow
/// them, so a base URL ending in `?` or carrying its own query joins with `&`.
pub fn build_source_uri(base: &str, params: &[(&'static str, String)]) -> FetchResult<Url> {
    let mut url = Url::parse(base).map_err(|e| FetchError::Url {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(url)
}

/// Append a path segment such as `identify` to a service URL.
pub fn join_path(base: &str, segment: &str) -> String {
    match base.split_once('?') {
        Some((path, query)) => format!("{}{}?{}", with_slash(path), segment, query),
        None => format!("{}{}", with_slash(base), segment),
    }
}

fn with_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
