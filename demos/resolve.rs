use futures::future::join_all;
use panoseek::{load_search_config, Coordinate, GeoPhotoLookup, PanoramaResolver};
use tracing_subscriber::EnvFilter;

/// Resolve a few coordinates to their nearest panoramas.
///
/// Pass `lat,lng` pairs as arguments, or run without arguments to use a few
/// well-known places. Search radii can be tuned with `PANO_INITIAL_RADIUS`,
/// `PANO_RADIUS_STEP` and `PANO_GIVE_UP_RADIUS`.
///
/// Run with:
/// ```bash
/// RUST_LOG=panoseek=debug cargo run --example resolve -- 45.5317,-73.5592
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut targets = Vec::new();
    for arg in std::env::args().skip(1) {
        let (lat, lng) = arg
            .split_once(',')
            .ok_or_else(|| format!("expected lat,lng but got {arg:?}"))?;
        targets.push(Coordinate::new(lat.trim().parse()?, lng.trim().parse()?));
    }
    if targets.is_empty() {
        targets = vec![
            // Old Montreal
            Coordinate::new(45.531776760335504, -73.55924595184348),
            // Colosseum
            Coordinate::new(41.8902102, 12.4922309),
            // Middle of the Atlantic
            Coordinate::new(35.0, -40.0),
        ];
    }

    let resolver = PanoramaResolver::new(GeoPhotoLookup::new()).with_config(load_search_config()?);
    println!(
        "Resolving {} locations (at most {} lookups each)",
        targets.len(),
        resolver.config().max_attempts()
    );

    let results = join_all(targets.iter().map(|target| resolver.resolve(*target))).await;

    for (target, result) in targets.iter().zip(results) {
        println!("\n{}, {}", target.lat, target.lng);
        match result {
            Ok(view) => {
                println!("  Panorama: {} ({})", view.panorama_id, view.capture_date_label);
                println!(
                    "  Heading: {:.1}°, zoom: {}",
                    view.heading_degrees, view.zoom_level
                );
                for other in &view.alternate_captures {
                    println!("  Also captured {}: {}", other.date, other.pano);
                }
            }
            Err(e) => println!("  {e}"),
        }
    }

    Ok(())
}
