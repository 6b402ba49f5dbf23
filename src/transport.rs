//! HTTP plumbing shared by every archive call.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{CONTENT_RANGE, HeaderMap, HeaderValue, RANGE, USER_AGENT};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::util::{backoff, build_url, retriable_status};

/// Issues GET requests against the archive.
///
/// `path` is relative to the archive base URL; `query` values are percent-encoded by the
/// implementation. Implementations must report non-2xx answers as [`Error::HttpStatus`].
pub trait Transport: Send + Sync {
    /// Performs a GET and returns the whole response body.
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>>;

    /// Absolute URL for `path`, as it would be requested.
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<String>;

    /// Writes the response body to `target` and returns the number of bytes written.
    ///
    /// The default implementation buffers the whole body through [`Transport::get`].
    fn download(&self, path: &str, query: &[(&str, String)], target: &Path) -> Result<u64> {
        let body = self.get(path, query)?;
        std::fs::write(target, &body).map_err(|e| Error::io(target, e))?;
        Ok(body.len() as u64)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    retry_max: usize,
    sleep_max: Duration,
    progress: bool,

    http: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("amosapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("amosapi-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        // Reject a bad base URL at construction rather than on the first call.
        build_url(&cfg.url, "", &[])?;

        Ok(Self {
            url: cfg.url.clone(),
            retry_max: cfg.retry_max.max(1),
            sleep_max: cfg.sleep_max,
            progress: cfg.progress,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    fn send(&self, url: &str, headers: HeaderMap) -> Result<Response> {
        let mut tries = 0usize;
        let mut sleep = Duration::from_secs(1).min(self.sleep_max);
        loop {
            tries += 1;
            debug!("GET {} (attempt {}/{})", url, tries, self.retry_max);

            let failure = match self.http.get(url).headers(headers.clone()).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    let body = resp.text().unwrap_or_default();
                    let err = Error::HttpStatus {
                        status,
                        url: url.to_string(),
                        body,
                    };
                    if !retriable_status(status.as_u16()) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => request_error(url, e),
            };

            if tries >= self.retry_max {
                return Err(failure);
            }
            warn!("{}; retrying in {:?}", failure, sleep);
            thread::sleep(sleep);
            sleep = backoff(sleep, self.sleep_max);
        }
    }

    fn progress_bar(&self, total: Option<u64>, start: u64) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::no_length(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_position(start);
        Some(pb)
    }
}

fn request_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
        }
    } else {
        Error::Network {
            url: url.to_string(),
            source: e,
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let url = self.url(path, query)?;
        let resp = self.send(&url, HeaderMap::new())?;
        let body = resp.bytes().map_err(|e| request_error(&url, e))?;
        debug!("GET {} -> {} byte(s)", url, body.len());
        Ok(body.to_vec())
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        build_url(&self.url, path, query).map(String::from)
    }

    /// Streams the body to `<target>.part` and renames it to `target` once complete. A failed
    /// download leaves neither file behind.
    fn download(&self, path: &str, query: &[(&str, String)], target: &Path) -> Result<u64> {
        let url = self.url(path, query)?;
        let part = part_path(target);
        match self.stream_to(&url, &part) {
            Ok(n) => {
                std::fs::rename(&part, target).map_err(|e| Error::io(target, e))?;
                Ok(n)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&part);
                Err(e)
            }
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

impl HttpTransport {
    /// Streams `url` into `target`, resuming with a `Range` request when a transfer breaks off
    /// and the server supports partial content.
    fn stream_to(&self, url: &str, target: &Path) -> Result<u64> {
        let url = url.to_string();
        let mut downloaded: u64 = 0;
        let mut expected: Option<u64> = None;
        let mut pb: Option<ProgressBar> = None;
        let mut tries = 0usize;

        'attempt: loop {
            tries += 1;
            let mut headers = HeaderMap::new();
            if downloaded > 0 {
                if let Ok(v) = HeaderValue::from_str(&format!("bytes={}-", downloaded)) {
                    headers.insert(RANGE, v);
                }
            }

            let mut resp = self.send(&url, headers)?;

            // A plain 200 after a Range request means the server restarted from byte 0.
            let resumed = downloaded > 0
                && resp.status() == StatusCode::PARTIAL_CONTENT
                && resp.headers().contains_key(CONTENT_RANGE);
            if !resumed {
                downloaded = 0;
                expected = resp.content_length();
            }
            if pb.is_none() {
                pb = self.progress_bar(expected, downloaded);
            }

            let mut out = OpenOptions::new()
                .create(true)
                .write(true)
                .append(resumed)
                .truncate(!resumed)
                .open(target)
                .map_err(|e| Error::io(target, e))?;

            let mut buf = [0u8; 64 * 1024];
            loop {
                let n = match resp.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        out.flush().map_err(|e| Error::io(target, e))?;
                        if tries >= self.retry_max {
                            return Err(Error::io(target, e));
                        }
                        warn!(
                            "download of {} interrupted after {} byte(s): {}; resuming",
                            url, downloaded, e
                        );
                        thread::sleep(Duration::from_secs(1).min(self.sleep_max));
                        continue 'attempt;
                    }
                };

                out.write_all(&buf[..n]).map_err(|e| Error::io(target, e))?;
                downloaded += n as u64;
                if let Some(pb) = &pb {
                    pb.set_position(downloaded);
                }
            }
            out.flush().map_err(|e| Error::io(target, e))?;

            match expected {
                Some(total) if downloaded < total && tries < self.retry_max => {
                    warn!(
                        "download of {} ended early ({} of {} byte(s)); resuming",
                        url, downloaded, total
                    );
                    continue 'attempt;
                }
                Some(total) if downloaded < total => {
                    return Err(Error::io(
                        target,
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("downloaded {} byte(s) out of {}", downloaded, total),
                        ),
                    ));
                }
                _ => {}
            }

            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            return Ok(downloaded);
        }
    }
}
