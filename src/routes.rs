//! URL layout of the AMOS archive, relative to the configured base URL.

use crate::model::{ArchiveRequest, CameraId, ImageTimestamp};

pub(crate) const CAMERA_LIST: &str = "get_cams";
pub(crate) const CAMERA_INFO: &str = "webcam_info";
pub(crate) const MONTH_LISTING: &str = "month_of_images";

const ZIP_ROOT: &str = "zipfiles";
const PRE_2013_ZIP_ROOT: &str = "2012zipfiles";

pub(crate) fn camera_info_query(id: CameraId) -> Vec<(&'static str, String)> {
    vec![("id", id.to_string())]
}

pub(crate) fn month_listing_query(request: &ArchiveRequest) -> Vec<(&'static str, String)> {
    vec![
        ("camera_id", request.camera_id().to_string()),
        ("year", request.year().to_string()),
        ("month", request.month().to_string()),
    ]
}

/// `image/<id>/<YYYYMMDD_HHMMSS>.jpg`
pub(crate) fn image_path(id: CameraId, timestamp: &ImageTimestamp) -> String {
    format!("image/{}/{}.jpg", id, timestamp)
}

/// `<root>/<year>/<last2>/<last4>/<id08>/<YYYY.MM>.zip`
///
/// Archives up to and including 2012 live under a separate root.
pub(crate) fn archive_path(request: &ArchiveRequest) -> String {
    let padded = request.camera_id().padded();
    let root = if request.year() > 2012 {
        ZIP_ROOT
    } else {
        PRE_2013_ZIP_ROOT
    };
    format!(
        "{}/{}/{}/{}/{}/{}",
        root,
        request.year(),
        &padded[padded.len() - 2..],
        &padded[padded.len() - 4..],
        padded,
        request.file_name()
    )
}
