//! # panoseek
//!
//! An async Rust library that finds the Street View panorama closest to a
//! coordinate and works out how to look at that coordinate from it.
//!
//! This library provides:
//! - Nearest-panorama lookup with an escalating search radius
//! - Heading and zoom computation from the panorama toward the target
//! - Capture date labels and the list of alternate (historical) captures
//! - A viewing session with camera controls and cancellation of stale lookups
//! - Storage of uploaded screenshots as JPEG files
//!
//! ## Example
//!
//! ```no_run
//! use panoseek::{Coordinate, GeoPhotoLookup, PanoramaResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = PanoramaResolver::new(GeoPhotoLookup::new());
//!
//!     // Old Montreal
//!     let view = resolver.resolve(Coordinate::new(45.5317767, -73.5592459)).await?;
//!
//!     println!(
//!         "{} ({}), heading {:.1}, zoom {}",
//!         view.panorama_id, view.capture_date_label, view.heading_degrees, view.zoom_level
//!     );
//!     for other in &view.alternate_captures {
//!         println!("  also captured {}: {}", other.date, other.pano);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod geometry;
mod lookup;
pub mod metadata;
mod policy;
mod resolver;
mod save;
mod session;
mod types;
mod upload;
pub mod views;

pub use config::{
    load_output_dir, load_search_config, SearchConfig, MAX_GIVE_UP_RADIUS, MAX_LOOKUPS,
};
pub use error::{PanoError, Result};
pub use geometry::{distance, normalize_heading, zoom_level, HeadingProvider, SphericalHeading};
pub use lookup::{GeoPhotoLookup, LookupFailure, LookupService};
pub use policy::{SearchDecision, SearchPolicy};
pub use resolver::PanoramaResolver;
pub use save::{ImageFormat, SaveOptions};
pub use session::Session;
pub use types::{
    AlternateCapture, Coordinate, DatedPanorama, ImagerySource, LookupRequest, LookupResult,
    PanoramaView, Preference, RawDate,
};
pub use upload::{CaptureStore, UploadRequest};
pub use views::{MemorySurface, PointOfView, RenderSurface, SurfaceInit, ViewApplier};
