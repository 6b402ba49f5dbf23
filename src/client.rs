use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, load_config};
use crate::error::Result;
use crate::listing::{ImageListing, ListingClient};
use crate::metadata::MetadataClient;
use crate::model::{Camera, CameraId, ImageTimestamp, Payload};
use crate::retrieval::RetrievalClient;
use crate::transport::{HttpTransport, Transport};

/// Entry point: one transport shared by the metadata, listing and retrieval clients.
#[derive(Clone)]
pub struct Client {
    metadata: MetadataClient,
    listing: ListingClient,
    retrieval: RetrievalClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.amosapirc`.
    ///
    /// This is equivalent to `Client::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`timeout` arguments
    /// - environment variables `AMOSAPI_URL` / `AMOSAPI_TIMEOUT` / `AMOSAPI_RETRY_MAX` /
    ///   `AMOSAPI_VERIFY`
    /// - config file from `AMOSAPI_RC` or `.amosapirc`
    /// - the public archive at [`DEFAULT_URL`](crate::DEFAULT_URL)
    pub fn new(url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        Self::from_config(&load_config(url, timeout)?)
    }

    pub fn from_config(cfg: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(cfg)?)))
    }

    /// Uses a caller-supplied transport, e.g. a mirror or a test double.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            metadata: MetadataClient::new(Arc::clone(&transport)),
            listing: ListingClient::new(Arc::clone(&transport)),
            retrieval: RetrievalClient::new(transport),
        }
    }

    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    pub fn listing(&self) -> &ListingClient {
        &self.listing
    }

    pub fn retrieval(&self) -> &RetrievalClient {
        &self.retrieval
    }

    pub fn list_cameras(&self) -> Result<Vec<Camera>> {
        self.metadata.list_cameras()
    }

    pub fn get_camera(&self, id: CameraId) -> Result<Camera> {
        self.metadata.get_camera(id)
    }

    pub fn list_images(
        &self,
        camera_id: CameraId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ImageListing> {
        self.listing.list_images(camera_id, start, end)
    }

    pub fn list_month(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
    ) -> Result<Vec<ImageTimestamp>> {
        self.listing.list_month(camera_id, year, month)
    }

    pub fn get_image(&self, camera_id: CameraId, timestamp: &ImageTimestamp) -> Result<Payload> {
        self.retrieval.get_image(camera_id, timestamp)
    }

    pub fn get_monthly_archive(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
    ) -> Result<Payload> {
        self.retrieval.get_monthly_archive(camera_id, year, month)
    }

    pub fn save_image(
        &self,
        camera_id: CameraId,
        timestamp: &ImageTimestamp,
        target: &Path,
    ) -> Result<PathBuf> {
        self.retrieval.save_image(camera_id, timestamp, target)
    }

    pub fn save_monthly_archive(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
        target: &Path,
    ) -> Result<PathBuf> {
        self.retrieval.save_monthly_archive(camera_id, year, month, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::{MockTransport, Reply};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_discover_list_fetch_flow() {
        let mock = MockTransport::new()
            .json(
                "get_cams",
                json!([{"id": 65, "latitude": 38.6, "longitude": -90.2}]),
            )
            .json("month_of_images", json!({"images": ["20160101_000356.jpg"]}))
            .reply("image/65/20160101_000356.jpg", Reply::Body(vec![1, 2, 3]));
        let client = Client::with_transport(Arc::new(mock));

        let cam = client.list_cameras().unwrap().remove(0);
        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 1, 31, 23, 59, 59).unwrap();
        let frame = client
            .list_images(cam.id, start, end)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();

        let payload = client.get_image(frame.camera_id, &frame.timestamp).unwrap();
        assert_eq!(payload.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_components_share_transport() {
        let mock = Arc::new(MockTransport::new());
        let client = Client::with_transport(Arc::clone(&mock) as Arc<dyn Transport>);

        assert!(matches!(
            client.metadata().get_camera(CameraId::new(1)),
            Err(Error::NotFound { .. })
        ));
        assert!(client.retrieval().get_monthly_archive(CameraId::new(1), 2016, 1).is_err());
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn test_from_config_with_explicit_url() {
        let cfg = ClientConfig {
            url: "http://mirror.test/amos".to_string(),
            ..ClientConfig::default()
        };
        let client = Client::from_config(&cfg).unwrap();
        assert_eq!(
            client.retrieval().archive_url(CameraId::new(65), 2016, 1).unwrap(),
            "http://mirror.test/amos/zipfiles/2016/65/0065/00000065/2016.01.zip"
        );
    }
}
