use amosapi::{CameraId, Client};
use anyhow::Result;
use std::path::Path;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Point it at a mirror via AMOSAPI_URL or a `.amosapirc` file; RUST_LOG=debug shows requests.
    env_logger::init();
    let client = Client::from_env()?;

    let camera = client.get_camera(CameraId::new(65))?;
    println!(
        "camera {} {:?} at {:?}",
        camera.id,
        camera.name,
        camera.coordinates()
    );

    let frames = client.list_month(camera.id, 2016, 1)?;
    println!("{} frame(s) in 2016-01", frames.len());

    if let Some(first) = frames.first() {
        let target = format!("{}.jpg", first);
        client.save_image(camera.id, first, Path::new(&target))?;
    }

    client.save_monthly_archive(camera.id, 2016, 1, Path::new("2016.01.zip"))?;
    Ok(())
}
