use reqwest::Url;
use std::time::Duration;

use crate::error::{Error, Result};

pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn backoff(current: Duration, max: Duration) -> Duration {
    let next = Duration::from_secs_f64((current.as_secs_f64() * 1.5).max(1.0));
    if next > max { max } else { next }
}

pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

/// Resolves `path` against `base` and appends percent-encoded query parameters.
///
/// The base may carry its own path prefix (e.g. a mirror at `https://host/amos`); `path` is
/// always treated as relative to it.
pub(crate) fn build_url(base: &str, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let base = Url::parse(&base)
        .map_err(|e| Error::Config(format!("invalid base url {:?}: {}", base, e)))?;
    let mut url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| Error::InvalidArgument(format!("invalid request path {:?}: {}", path, e)))?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}
