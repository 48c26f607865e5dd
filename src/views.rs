use crate::geometry::normalize_heading;
use crate::types::{Coordinate, PanoramaView};
use serde::{Deserialize, Serialize};

/// Camera orientation on a panorama.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOfView {
    /// Heading in degrees (0-360, where 0 is north)
    pub heading: f64,
    /// Vertical pitch in degrees (-90 to 90, where 0 is horizontal)
    pub pitch: f64,
}

impl PointOfView {
    /// A level view facing `heading`.
    pub fn new(heading: f64) -> Self {
        Self {
            heading: normalize_heading(heading),
            pitch: 0.0,
        }
    }

    /// Set the pitch, clamped to -90..=90.
    pub fn pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch.clamp(-90.0, 90.0);
        self
    }
}

/// Parameters for a freshly created rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInit {
    pub pano_id: String,
    /// Where the camera stands
    pub position: Coordinate,
    pub zoom: f64,
    pub pov: PointOfView,
    /// Where the location marker is drawn
    pub marker: Coordinate,
}

/// Something that can display a panorama, such as a browser viewer.
///
/// The resolver never touches a surface directly; [`ViewApplier`] translates
/// a [`PanoramaView`] into these calls.
pub trait RenderSurface {
    /// Create a surface showing the given panorama.
    fn initialize(init: SurfaceInit) -> Self
    where
        Self: Sized;

    fn set_pano(&mut self, pano_id: &str);
    fn set_position(&mut self, position: Coordinate);
    fn set_pov(&mut self, pov: PointOfView);
    fn set_zoom(&mut self, zoom: f64);
    fn set_marker_position(&mut self, position: Coordinate);

    fn pano(&self) -> &str;
    fn position(&self) -> Coordinate;
    fn pov(&self) -> PointOfView;
    fn zoom(&self) -> f64;
}

/// Applies resolved views to a rendering surface.
pub struct ViewApplier;

impl ViewApplier {
    /// Show `view`, creating the surface on first use and updating it in
    /// place afterwards.
    ///
    /// Applying the same view twice leaves the surface as one application would.
    pub fn apply<S: RenderSurface>(slot: &mut Option<S>, view: &PanoramaView) {
        match slot {
            Some(surface) => Self::update(surface, view),
            None => *slot = Some(Self::initialize(view)),
        }
    }

    /// Build a new surface for `view`.
    pub fn initialize<S: RenderSurface>(view: &PanoramaView) -> S {
        S::initialize(Self::surface_init(view))
    }

    /// Point an existing surface at `view`.
    pub fn update<S: RenderSurface>(surface: &mut S, view: &PanoramaView) {
        surface.set_pano(&view.panorama_id);
        surface.set_position(view.panorama_position);
        surface.set_pov(PointOfView::new(view.heading_degrees));
        surface.set_zoom(view.zoom_level);
        surface.set_marker_position(view.target_coordinate);
    }

    pub fn surface_init(view: &PanoramaView) -> SurfaceInit {
        SurfaceInit {
            pano_id: view.panorama_id.clone(),
            position: view.panorama_position,
            zoom: view.zoom_level,
            pov: PointOfView::new(view.heading_degrees),
            marker: view.target_coordinate,
        }
    }
}

/// A headless surface that only records its state.
///
/// Useful for batch jobs that need the camera parameters without a viewer,
/// and as a test double.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySurface {
    pano_id: String,
    position: Coordinate,
    pov: PointOfView,
    zoom: f64,
    marker: Coordinate,
}

impl MemorySurface {
    pub fn marker(&self) -> Coordinate {
        self.marker
    }
}

impl RenderSurface for MemorySurface {
    fn initialize(init: SurfaceInit) -> Self {
        Self {
            pano_id: init.pano_id,
            position: init.position,
            pov: init.pov,
            zoom: init.zoom,
            marker: init.marker,
        }
    }

    fn set_pano(&mut self, pano_id: &str) {
        self.pano_id = pano_id.to_string();
    }

    fn set_position(&mut self, position: Coordinate) {
        self.position = position;
    }

    fn set_pov(&mut self, pov: PointOfView) {
        self.pov = pov;
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    fn set_marker_position(&mut self, position: Coordinate) {
        self.marker = position;
    }

    fn pano(&self) -> &str {
        &self.pano_id
    }

    fn position(&self) -> Coordinate {
        self.position
    }

    fn pov(&self) -> PointOfView {
        self.pov
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }
}
