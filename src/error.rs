use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The archive could not be reached at all.
    #[error("could not connect to {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request timed out: {url}")]
    Timeout { url: String },

    /// Non-2xx answer. `body` is the raw response text.
    #[error("{}", describe_status(*status, url, body))]
    HttpStatus {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("not found in archive: {resource}")]
    NotFound { resource: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Turns an HTTP 404 into [`Error::NotFound`] naming `resource`; other errors pass through.
    pub(crate) fn not_found_as(self, resource: impl FnOnce() -> String) -> Self {
        match self {
            Error::HttpStatus { status, .. } if status == StatusCode::NOT_FOUND => {
                Error::NotFound {
                    resource: resource(),
                }
            }
            other => other,
        }
    }
}

// Some archive front-ends answer errors with {"message": ..., "detail": ...} or {"error": ...}.
#[derive(Debug, serde::Deserialize)]
struct ServerErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

fn describe_status(status: StatusCode, url: &str, body: &str) -> String {
    if let Ok(e) = serde_json::from_str::<ServerErrorBody>(body) {
        let title = e
            .message
            .as_deref()
            .or(e.error.as_deref())
            .unwrap_or("")
            .trim();
        let detail = e.detail.as_deref().unwrap_or("").trim();
        if !title.is_empty() || !detail.is_empty() {
            return format!(
                "archive request failed: HTTP {} for url ({})\n{}{}{}",
                status,
                url,
                title,
                if title.is_empty() || detail.is_empty() { "" } else { ": " },
                detail
            );
        }
    }

    let snippet = body.trim();
    if snippet.is_empty() || snippet.starts_with('<') {
        // HTML error pages carry nothing useful.
        return format!("archive request failed: HTTP {} for url ({})", status, url);
    }

    let snippet: String = snippet.chars().take(200).collect();
    format!(
        "archive request failed: HTTP {} for url ({})\n{}",
        status, url, snippet
    )
}
