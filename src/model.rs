use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Archive-wide camera identifier.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(u32);

impl CameraId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Eight-digit zero-padded form used in archive paths, e.g. `00000065`.
    pub fn padded(self) -> String {
        format!("{:08}", self.0)
    }
}

impl From<u32> for CameraId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CameraId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| Error::InvalidArgument(format!("invalid camera id {:?}: {}", s, e)))
    }
}

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Capture time of one frame, in UTC with one-second granularity.
///
/// The archive names frames `YYYYMMDD_HHMMSS`, e.g. `20160101_000356`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageTimestamp(DateTime<Utc>);

impl ImageTimestamp {
    pub fn new(datetime: impl Into<DateTime<Utc>>) -> Self {
        Self(datetime.into())
    }

    pub fn as_utc_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parses `20160101_000356` or `20160101_000356.jpg`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let stem = s.strip_suffix(".jpg").unwrap_or(s);
        NaiveDateTime::parse_from_str(stem, TIMESTAMP_FORMAT)
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
            .map_err(|e| Error::parse(format!("image timestamp {:?}", s), e))
    }
}

impl From<DateTime<Utc>> for ImageTimestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

impl FromStr for ImageTimestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

/// Camera metadata as published by the archive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub elevation: Option<f64>,
    #[serde(default, alias = "time_zone")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "tag_list")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub ip_latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ip_longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub images_captured: Option<u64>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub last_capture: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub width: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub height: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,

    /// Fields this crate does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Camera {
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_datetime<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => parse_archive_datetime(&s),
        _ => None,
    })
}

// Tags come either as a JSON list or as one comma-separated string.
fn tag_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    let raw: Vec<String> = match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(raw
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

pub(crate) fn parse_archive_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Reference to one captured frame, without its pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub camera_id: CameraId,
    pub timestamp: ImageTimestamp,
    /// Absolute URL of the JPEG.
    pub location: String,
}

pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 9999;

/// One month of one camera, the unit the archive zips and lists by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveRequest {
    camera_id: CameraId,
    year: i32,
    month: u32,
}

impl ArchiveRequest {
    pub fn new(camera_id: CameraId, year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidArgument(format!(
                "month must be in 1..=12, got {}",
                month
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidArgument(format!(
                "year must be in {}..={}, got {}",
                MIN_YEAR, MAX_YEAR, year
            )));
        }
        Ok(Self {
            camera_id,
            year,
            month,
        })
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// `YYYY.MM.zip`
    pub fn file_name(&self) -> String {
        format!("{:04}.{:02}.zip", self.year, self.month)
    }

    pub(crate) fn next_month(&self) -> Option<Self> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Self::new(self.camera_id, year, month).ok()
    }

    pub(crate) fn containing(camera_id: CameraId, at: &DateTime<Utc>) -> Result<Self> {
        Self::new(camera_id, at.year(), at.month())
    }
}

/// Raw bytes of an image or ZIP archive. The crate never looks inside.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}
