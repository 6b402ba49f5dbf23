use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{ArchiveRequest, CameraId, ImageTimestamp, Payload};
use crate::routes;
use crate::transport::Transport;
use crate::util::guess_filename_from_url;

/// Fetches frame and monthly ZIP bytes.
#[derive(Clone)]
pub struct RetrievalClient {
    transport: Arc<dyn Transport>,
}

impl RetrievalClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// JPEG bytes of one frame.
    pub fn get_image(&self, camera_id: CameraId, timestamp: &ImageTimestamp) -> Result<Payload> {
        self.transport
            .get(&routes::image_path(camera_id, timestamp), &[])
            .map(Payload::from)
            .map_err(|e| e.not_found_as(|| image_resource(camera_id, timestamp)))
    }

    /// ZIP bytes holding every frame of one camera-month.
    ///
    /// `month` must be in `1..=12`; checked before any request is made.
    pub fn get_monthly_archive(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
    ) -> Result<Payload> {
        let request = ArchiveRequest::new(camera_id, year, month)?;
        self.transport
            .get(&routes::archive_path(&request), &[])
            .map(Payload::from)
            .map_err(|e| e.not_found_as(|| archive_resource(&request)))
    }

    pub fn image_url(&self, camera_id: CameraId, timestamp: &ImageTimestamp) -> Result<String> {
        self.transport.url(&routes::image_path(camera_id, timestamp), &[])
    }

    pub fn archive_url(&self, camera_id: CameraId, year: i32, month: u32) -> Result<String> {
        let request = ArchiveRequest::new(camera_id, year, month)?;
        self.transport.url(&routes::archive_path(&request), &[])
    }

    /// Saves one frame to `target`. An empty `target` means `<timestamp>.jpg` in the working
    /// directory.
    pub fn save_image(
        &self,
        camera_id: CameraId,
        timestamp: &ImageTimestamp,
        target: &Path,
    ) -> Result<PathBuf> {
        let path = routes::image_path(camera_id, timestamp);
        self.save(&path, target)
            .map_err(|e| e.not_found_as(|| image_resource(camera_id, timestamp)))
    }

    /// Saves one monthly archive to `target`. An empty `target` means `YYYY.MM.zip` in the working
    /// directory.
    pub fn save_monthly_archive(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
        target: &Path,
    ) -> Result<PathBuf> {
        let request = ArchiveRequest::new(camera_id, year, month)?;
        self.save(&routes::archive_path(&request), target)
            .map_err(|e| e.not_found_as(|| archive_resource(&request)))
    }

    fn save(&self, path: &str, target: &Path) -> Result<PathBuf> {
        let target = resolve_target(path, target);

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let written = self.transport.download(path, &[], &target)?;
        info!("saved {} byte(s) to {}", written, target.display());
        Ok(target)
    }
}

/// An empty `target` falls back to the archive file name in the working directory.
fn resolve_target(path: &str, target: &Path) -> PathBuf {
    if target.as_os_str().is_empty() {
        guess_filename_from_url(path)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("download"))
    } else {
        target.to_path_buf()
    }
}

fn image_resource(camera_id: CameraId, timestamp: &ImageTimestamp) -> String {
    format!("image {} of camera {}", timestamp, camera_id)
}

fn archive_resource(request: &ArchiveRequest) -> String {
    format!(
        "archive {} of camera {}",
        request.file_name(),
        request.camera_id()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};
    use reqwest::StatusCode;

    const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

    fn client(mock: MockTransport) -> (Arc<MockTransport>, RetrievalClient) {
        let mock = Arc::new(mock);
        (Arc::clone(&mock), RetrievalClient::new(mock))
    }

    fn ts(s: &str) -> ImageTimestamp {
        ImageTimestamp::parse(s).unwrap()
    }

    #[test]
    fn test_get_image() {
        let (mock, c) = client(
            MockTransport::new().reply("image/65/20160101_000356.jpg", Reply::Body(JPEG.to_vec())),
        );
        let payload = c.get_image(CameraId::new(65), &ts("20160101_000356")).unwrap();
        assert_eq!(payload.as_bytes(), JPEG);
        assert_eq!(mock.calls()[0].0, "image/65/20160101_000356.jpg");
    }

    #[test]
    fn test_get_image_404_is_not_found() {
        let (_, c) = client(MockTransport::new());
        let err = c.get_image(CameraId::new(0), &ts("20160101_000356")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_get_image_500_is_http_status() {
        let (_, c) = client(MockTransport::new().reply(
            "image/65/20160101_000356.jpg",
            Reply::Status(500, "boom".to_string()),
        ));
        let err = c.get_image(CameraId::new(65), &ts("20160101_000356")).unwrap_err();
        match err {
            Error::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_get_monthly_archive_paths() {
        let mock = MockTransport::new()
            .reply(
                "2012zipfiles/2002/04/1804/00021804/2002.02.zip",
                Reply::Body(b"PK".to_vec()),
            )
            .reply(
                "zipfiles/2017/45/7345/00017345/2017.03.zip",
                Reply::Body(b"PK2".to_vec()),
            );
        let (mock, c) = client(mock);
        assert_eq!(
            c.get_monthly_archive(CameraId::new(21804), 2002, 2).unwrap().as_bytes(),
            b"PK"
        );
        assert_eq!(
            c.get_monthly_archive(CameraId::new(17345), 2017, 3).unwrap().as_bytes(),
            b"PK2"
        );
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn test_get_monthly_archive_rejects_bad_month_without_request() {
        let (mock, c) = client(MockTransport::new());
        let err = c.get_monthly_archive(CameraId::new(65), 2016, 13).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(matches!(
            c.get_monthly_archive(CameraId::new(65), -5, 1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_get_monthly_archive_missing_is_not_found() {
        let (_, c) = client(MockTransport::new());
        let err = c.get_monthly_archive(CameraId::new(65), 2018, 1).unwrap_err();
        match err {
            Error::NotFound { resource } => {
                assert_eq!(resource, "archive 2018.01.zip of camera 65")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_urls() {
        let (mock, c) = client(MockTransport::new());
        assert_eq!(
            c.archive_url(CameraId::new(65), 2016, 1).unwrap(),
            "http://archive.test/zipfiles/2016/65/0065/00000065/2016.01.zip"
        );
        assert_eq!(
            c.image_url(CameraId::new(65), &ts("20160101_163316")).unwrap(),
            "http://archive.test/image/65/20160101_163316.jpg"
        );
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_save_monthly_archive_creates_parents() {
        let mock = MockTransport::new().reply(
            "zipfiles/2017/45/7345/00017345/2017.03.zip",
            Reply::Body(b"PK\x03\x04".to_vec()),
        );
        let (_, c) = client(mock);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("17345").join("2017.03.zip");

        let saved = c
            .save_monthly_archive(CameraId::new(17345), 2017, 3, &target)
            .unwrap();
        assert_eq!(saved, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn test_empty_target_uses_archive_file_name() {
        let req = ArchiveRequest::new(CameraId::new(17345), 2017, 3).unwrap();
        assert_eq!(
            resolve_target(&routes::archive_path(&req), Path::new("")),
            PathBuf::from("2017.03.zip")
        );
        let image = routes::image_path(CameraId::new(65), &ts("20160101_000356"));
        assert_eq!(
            resolve_target(&image, Path::new("")),
            PathBuf::from("20160101_000356.jpg")
        );
        assert_eq!(
            resolve_target(&image, Path::new("out/a.jpg")),
            PathBuf::from("out/a.jpg")
        );
    }

    #[test]
    fn test_save_image_missing_is_not_found() {
        let (_, c) = client(MockTransport::new());
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x.jpg");
        let err = c
            .save_image(CameraId::new(65), &ts("20160101_000356"), &target)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!target.exists());
    }
}
