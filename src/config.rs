use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Public AMOS endpoint.
pub const DEFAULT_URL: &str = "http://amos.cse.wustl.edu";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base archive URL, typically `http://amos.cse.wustl.edu`.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per request, including the first one.
    pub retry_max: usize,
    /// Upper bound for the sleep between attempts.
    pub sleep_max: Duration,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Show a progress bar while saving payloads to disk.
    pub progress: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: Duration::from_secs(60),
            retry_max: 3,
            sleep_max: Duration::from_secs(30),
            verify: true,
            progress: false,
        }
    }
}

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    timeout: Option<String>,
    retry_max: Option<String>,
    verify: Option<String>,
}

/// Resolves the configuration in order of precedence:
/// explicit arguments, `AMOSAPI_*` environment variables, the first rc file found, defaults.
pub(crate) fn load_config(url: Option<String>, timeout: Option<Duration>) -> Result<ClientConfig> {
    let rc = match rc_candidates().into_iter().find(|p| p.exists()) {
        Some(path) => read_rc(&path)?,
        None => RcConfig::default(),
    };
    resolve(url, timeout, |name| std::env::var(name).ok(), rc)
}

fn resolve(
    url: Option<String>,
    timeout: Option<Duration>,
    env: impl Fn(&str) -> Option<String>,
    rc: RcConfig,
) -> Result<ClientConfig> {
    let mut cfg = ClientConfig::default();

    if let Some(v) = url.or_else(|| env("AMOSAPI_URL")).or(rc.url) {
        cfg.url = v;
    }

    let timeout = match timeout {
        Some(t) => Some(t),
        None => env("AMOSAPI_TIMEOUT")
            .or(rc.timeout)
            .map(|v| parse_seconds("timeout", &v))
            .transpose()?,
    };
    if let Some(t) = timeout {
        cfg.timeout = t;
    }

    if let Some(v) = env("AMOSAPI_RETRY_MAX").or(rc.retry_max) {
        let n = v
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::Config(format!("retry_max must be an integer, got {:?}", v)))?;
        cfg.retry_max = n.max(1);
    }

    if let Some(v) = env("AMOSAPI_VERIFY").or(rc.verify) {
        let v = v.trim();
        cfg.verify = !(v == "0" || v.eq_ignore_ascii_case("false"));
    }

    Ok(cfg)
}

fn parse_seconds(field: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| {
            Error::Config(format!(
                "{} must be a positive number of seconds, got {:?}",
                field, value
            ))
        })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                continue;
            }
            let v = Some(v.to_string());
            match k.trim() {
                "url" => cfg.url = v,
                "timeout" => cfg.timeout = v,
                "retry_max" => cfg.retry_max = v,
                "verify" => cfg.verify = v,
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) AMOSAPI_RC (explicit)
    // 2) ./.amosapirc
    // 3) ~/.amosapirc
    if let Ok(p) = std::env::var("AMOSAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".amosapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".amosapirc"));
    }
    v
}
