use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{ArchiveRequest, CameraId, ImageDescriptor, ImageTimestamp};
use crate::routes;
use crate::transport::Transport;

#[derive(Deserialize)]
#[serde(untagged)]
enum MonthListingReply {
    Wrapped { images: Vec<String> },
    Bare(Vec<String>),
}

/// Per-camera image listings.
#[derive(Clone)]
pub struct ListingClient {
    transport: Arc<dyn Transport>,
}

impl ListingClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Lazily lists the frames of `camera_id` captured within `[start, end]`, oldest first.
    ///
    /// The archive serves listings one calendar month at a time; months are fetched on demand as
    /// the iterator advances. Fails with [`Error::InvalidRange`] before any request when
    /// `start > end`.
    pub fn list_images(
        &self,
        camera_id: CameraId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ImageListing> {
        if start > end {
            return Err(Error::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        let first = ArchiveRequest::containing(camera_id, &start)?;
        let last = ArchiveRequest::containing(camera_id, &end)?;

        Ok(ImageListing {
            client: self.clone(),
            start,
            end,
            next_page: Some(first),
            last_page: last,
            buffered: VecDeque::new(),
        })
    }

    /// Timestamps of every frame the archive holds for one camera-month, ascending.
    pub fn list_month(
        &self,
        camera_id: CameraId,
        year: i32,
        month: u32,
    ) -> Result<Vec<ImageTimestamp>> {
        let request = ArchiveRequest::new(camera_id, year, month)?;
        self.fetch_month(&request)
    }

    fn fetch_month(&self, request: &ArchiveRequest) -> Result<Vec<ImageTimestamp>> {
        let context = || {
            format!(
                "image listing for camera {} {:04}-{:02}",
                request.camera_id(),
                request.year(),
                request.month()
            )
        };
        let body = self
            .transport
            .get(routes::MONTH_LISTING, &routes::month_listing_query(request))
            .map_err(|e| e.not_found_as(context))?;

        let reply: MonthListingReply =
            serde_json::from_slice(&body).map_err(|e| Error::parse(context(), e))?;
        let entries = match reply {
            MonthListingReply::Wrapped { images } | MonthListingReply::Bare(images) => images,
        };

        let mut timestamps = entries
            .iter()
            .map(|entry| ImageTimestamp::parse(entry))
            .collect::<Result<Vec<_>>>()?;
        timestamps.sort_unstable();
        timestamps.dedup();
        debug!("{}: {} frame(s)", context(), timestamps.len());
        Ok(timestamps)
    }
}

/// Ordered stream of [`ImageDescriptor`]s produced by [`ListingClient::list_images`].
///
/// Yields at most one error, after which it is exhausted.
pub struct ImageListing {
    client: ListingClient,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    next_page: Option<ArchiveRequest>,
    last_page: ArchiveRequest,
    buffered: VecDeque<ImageTimestamp>,
}

impl ImageListing {
    fn load_next_page(&mut self) -> Result<bool> {
        let Some(page) = self.next_page.take() else {
            return Ok(false);
        };
        if page != self.last_page {
            self.next_page = page.next_month();
        }

        // A month the archive has nothing for is an empty page, not the end of the stream.
        let timestamps = match self.client.fetch_month(&page) {
            Ok(timestamps) => timestamps,
            Err(Error::NotFound { resource }) => {
                debug!("{}: no listing, skipping", resource);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let (start, end) = (self.start, self.end);
        self.buffered.extend(
            timestamps
                .into_iter()
                .filter(|ts| (start..=end).contains(&ts.as_utc_datetime())),
        );
        Ok(true)
    }

    fn descriptor(&self, timestamp: ImageTimestamp) -> Result<ImageDescriptor> {
        let camera_id = self.last_page.camera_id();
        let location = self
            .client
            .transport
            .url(&routes::image_path(camera_id, &timestamp), &[])?;
        Ok(ImageDescriptor {
            camera_id,
            timestamp,
            location,
        })
    }
}

impl Iterator for ImageListing {
    type Item = Result<ImageDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ts) = self.buffered.pop_front() {
                let item = self.descriptor(ts);
                if item.is_err() {
                    self.next_page = None;
                    self.buffered.clear();
                }
                return Some(item);
            }
            match self.load_next_page() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.next_page = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for ImageListing {}
