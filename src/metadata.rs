use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Camera, CameraId};
use crate::routes;
use crate::transport::Transport;

#[derive(Deserialize)]
#[serde(untagged)]
enum CameraListReply {
    Wrapped { cameras: Vec<Camera> },
    Bare(Vec<Camera>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CameraInfoReply {
    // Bare first: a missing `webcam` key would otherwise read as `Wrapped { webcam: None }`.
    Bare(Camera),
    Wrapped { webcam: Option<Camera> },
}

/// Camera discovery and metadata.
#[derive(Clone)]
pub struct MetadataClient {
    transport: Arc<dyn Transport>,
}

impl MetadataClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Every camera the archive knows about.
    pub fn list_cameras(&self) -> Result<Vec<Camera>> {
        let body = self.transport.get(routes::CAMERA_LIST, &[])?;
        let reply: CameraListReply = serde_json::from_slice(&body)
            .map_err(|e| Error::parse(format!("camera list ({})", routes::CAMERA_LIST), e))?;
        let cameras = match reply {
            CameraListReply::Wrapped { cameras } | CameraListReply::Bare(cameras) => cameras,
        };
        debug!("camera list: {} camera(s)", cameras.len());
        Ok(cameras)
    }

    /// Metadata for one camera. Unknown ids fail with [`Error::NotFound`].
    pub fn get_camera(&self, id: CameraId) -> Result<Camera> {
        let not_found = || format!("camera {}", id);
        let body = self
            .transport
            .get(routes::CAMERA_INFO, &routes::camera_info_query(id))
            .map_err(|e| e.not_found_as(not_found))?;

        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| Error::parse(format!("camera {} info", id), e))?;
        if value.is_null() {
            return Err(Error::NotFound {
                resource: not_found(),
            });
        }

        let reply: CameraInfoReply = serde_json::from_value(value)
            .map_err(|e| Error::parse(format!("camera {} info", id), e))?;
        let camera = match reply {
            CameraInfoReply::Wrapped { webcam: Some(c) } | CameraInfoReply::Bare(c) => c,
            CameraInfoReply::Wrapped { webcam: None } => {
                return Err(Error::NotFound {
                    resource: not_found(),
                });
            }
        };

        if camera.id != id {
            return Err(Error::parse(
                format!("camera {} info", id),
                format!("archive answered with camera {}", camera.id),
            ));
        }
        Ok(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};
    use reqwest::StatusCode;
    use serde_json::json;

    fn client(mock: MockTransport) -> (Arc<MockTransport>, MetadataClient) {
        let mock = Arc::new(mock);
        (Arc::clone(&mock), MetadataClient::new(mock))
    }

    fn record(id: u32) -> serde_json::Value {
        json!({"id": id, "name": format!("cam {id}"), "latitude": 38.6, "longitude": -90.2})
    }

    #[test]
    fn test_list_cameras_bare_and_wrapped() {
        let mock = MockTransport::new().json("get_cams", json!([record(65), record(21804)]));
        let (_, c) = client(mock);
        let ids: Vec<u32> = c
            .list_cameras()
            .unwrap()
            .iter()
            .map(|c| c.id.get())
            .collect();
        assert_eq!(ids, vec![65, 21804]);

        let mock = MockTransport::new().json("get_cams", json!({"cameras": [record(1)]}));
        let (_, c) = client(mock);
        assert_eq!(c.list_cameras().unwrap().len(), 1);
    }

    #[test]
    fn test_list_cameras_malformed_json() {
        let body = b"65: (38.6, -90.2)<br>".to_vec();
        let (_, c) = client(MockTransport::new().reply("get_cams", Reply::Body(body)));
        assert!(matches!(c.list_cameras(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_list_cameras_missing_required_field() {
        let mock = MockTransport::new().json("get_cams", json!([{"id": 65, "latitude": 1.0}]));
        let (_, c) = client(mock);
        assert!(matches!(c.list_cameras(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_list_cameras_propagates_transport_errors() {
        let (_, c) = client(MockTransport::new().reply("get_cams", Reply::Timeout));
        assert!(matches!(c.list_cameras(), Err(Error::Timeout { .. })));

        let mock = MockTransport::new().reply("get_cams", Reply::Status(502, String::new()));
        let (_, c) = client(mock);
        assert_eq!(
            c.list_cameras().unwrap_err().status(),
            Some(StatusCode::BAD_GATEWAY)
        );
    }

    #[test]
    fn test_get_camera_sends_id_and_parses_wrapped_record() {
        let mock = MockTransport::new().json("webcam_info", json!({"webcam": record(21804)}));
        let (mock, c) = client(mock);
        let cam = c.get_camera(CameraId::new(21804)).unwrap();
        assert_eq!(cam.id, CameraId::new(21804));
        assert_eq!(cam.name.as_deref(), Some("cam 21804"));
        assert_eq!(
            mock.calls(),
            vec![(
                "webcam_info".to_string(),
                vec![("id".to_string(), "21804".to_string())]
            )]
        );
    }

    #[test]
    fn test_get_camera_unknown_id() {
        for body in [json!({"webcam": null}), json!(null)] {
            let (_, c) = client(MockTransport::new().json("webcam_info", body));
            assert!(matches!(
                c.get_camera(CameraId::new(999999)),
                Err(Error::NotFound { .. })
            ));
        }

        let (_, c) = client(MockTransport::new());
        let err = c.get_camera(CameraId::new(999999)).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref resource } if resource == "camera 999999"));
    }

    #[test]
    fn test_get_camera_id_mismatch_is_parse_error() {
        let (_, c) = client(MockTransport::new().json("webcam_info", record(66)));
        assert!(matches!(
            c.get_camera(CameraId::new(65)),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_every_listed_camera_resolves_to_itself() {
        let listed = MockTransport::new().json("get_cams", json!([record(65), record(66)]));
        let (_, lister) = client(listed);
        for cam in lister.list_cameras().unwrap() {
            let (_, c) = client(
                MockTransport::new().json("webcam_info", json!({"webcam": record(cam.id.get())})),
            );
            assert_eq!(c.get_camera(cam.id).unwrap().id, cam.id);
        }
    }
}
