//! A small Rust client for the Archive of Many Outdoor Scenes (AMOS).
//!
//! AMOS collects timelapse frames from tens of thousands of outdoor webcams. This crate
//! discovers cameras, lists the frames captured by a camera over a date range, and fetches single
//! JPEG frames or whole camera-month ZIP archives as opaque bytes.
//!
//! ## Quick start
//! - Optionally point the client at a mirror via `AMOSAPI_URL` or a `.amosapirc` file
//!   (current directory or home directory); the public archive is used otherwise.
//! - Discover cameras with [`Client::list_cameras`], list frames with [`Client::list_images`],
//!   then fetch bytes with [`Client::get_image`] or [`Client::get_monthly_archive`].
//!
//! ```no_run
//! use amosapi::{CameraId, Client};
//! use chrono::{TimeZone, Utc};
//!
//! fn main() -> amosapi::Result<()> {
//!     let client = Client::from_env()?;
//!     let camera = client.get_camera(CameraId::new(65))?;
//!
//!     let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
//!     let end = Utc.with_ymd_and_hms(2016, 1, 2, 0, 0, 0).unwrap();
//!     for frame in client.list_images(camera.id, start, end)? {
//!         let frame = frame?;
//!         let jpeg = client.get_image(frame.camera_id, &frame.timestamp)?;
//!         println!("{} {} bytes", frame.timestamp, jpeg.len());
//!     }
//!
//!     client.save_monthly_archive(camera.id, 2016, 1, std::path::Path::new("2016.01.zip"))?;
//!     Ok(())
//! }
//! ```
//!
//! The library logs through the [`log`] facade and never installs a logger itself.

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod listing;
mod metadata;
mod model;
mod retrieval;
mod routes;
mod transport;
mod util;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_URL};
pub use error::{Error, Result};
pub use listing::{ImageListing, ListingClient};
pub use metadata::MetadataClient;
pub use model::{
    ArchiveRequest, Camera, CameraId, ImageDescriptor, ImageTimestamp, MAX_YEAR, MIN_YEAR, Payload,
};
pub use retrieval::RetrievalClient;
pub use transport::{HttpTransport, Transport};
