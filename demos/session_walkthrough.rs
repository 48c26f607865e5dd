use image::{DynamicImage, RgbImage};
use panoseek::metadata::select_one_winter_month;
use panoseek::{
    CaptureStore, Coordinate, GeoPhotoLookup, MemorySurface, RenderSurface, Session,
    UploadRequest,
};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

/// Walk through a viewing session without a browser.
///
/// Opens a location, looks around, switches to a winter capture if one
/// exists, then stores a placeholder screenshot for each capture visited.
///
/// Run with:
/// ```bash
/// OUTPUT_DIR=/tmp/captures cargo run --example session_walkthrough
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = CaptureStore::from_env()
        .unwrap_or_else(|_| CaptureStore::new(std::env::temp_dir().join("panoseek-captures")));
    let session: Session<GeoPhotoLookup, MemorySurface> = Session::new(GeoPhotoLookup::new());

    // Old Montreal
    let view = session
        .open(Coordinate::new(45.531776760335504, -73.55924595184348))
        .await?;
    println!("Opened {} ({})", view.panorama_id, view.capture_date_label);
    println!("  facing {:.1}° at zoom {}", view.heading_degrees, view.zoom_level);

    let pov = session.adjust_heading(90.0, 10.0)?;
    println!("Looked right: heading {:.1}°, pitch {:.1}°", pov.heading, pov.pitch);
    let pov = session.reset_camera(0.0)?;
    println!("Reset camera: heading {:.1}°", pov.heading);

    // A stand-in for a screenshot of the viewer
    let shot = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 320, image::Rgb([90, 120, 160])));
    let id = Some("walkthrough".to_string());

    let path = store.store(&UploadRequest::from_view(id.clone(), &view, &shot)?)?;
    println!("Stored {}", path.display());

    let mut picked = HashSet::new();
    for other in select_one_winter_month(&view.alternate_captures, &mut picked) {
        session.set_date(&other.pano, &other.date)?;
        let pano = session.surface(|s| s.pano().to_string()).unwrap_or_default();
        println!("Switched to {} ({})", pano, other.date);

        if let Some(current) = session.current_view() {
            let path = store.store(&UploadRequest::from_view(id.clone(), &current, &shot)?)?;
            println!("Stored {}", path.display());
        }
    }

    session.reset_initial_position()?;

    Ok(())
}
