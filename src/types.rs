use serde::{Deserialize, Serialize};

/// GPS location with latitude and longitude in degrees.
///
/// Coordinates are compared by distance (see [`crate::geometry::distance`]),
/// never by equality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude coordinate
    pub lat: f64,
    /// Longitude coordinate
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Which panorama the lookup service should prefer within the radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Closest panorama to the requested location
    Nearest,
}

/// Which imagery collections the lookup may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagerySource {
    /// Outdoor imagery only
    Outdoor,
}

/// A single request to the imagery lookup service.
///
/// Only `radius_meters` changes between retries of one resolution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub location: Coordinate,
    pub preference: Preference,
    pub radius_meters: f64,
    pub source: ImagerySource,
}

impl LookupRequest {
    /// Create a nearest-outdoor request around `location`.
    pub fn new(location: Coordinate, radius_meters: f64) -> Self {
        Self {
            location,
            preference: Preference::Nearest,
            radius_meters,
            source: ImagerySource::Outdoor,
        }
    }
}

/// A capture date as delivered by the imagery service.
///
/// Services disagree on the representation, so every shape seen in the wild
/// is accepted and normalized by [`crate::metadata::capture_date_label`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    /// `"YYYY-MM"`, `"YYYY-MM-DD"` or an ISO timestamp
    Text(String),
    /// Structured year and 1-based month
    Parts { year: i32, month: u32 },
}

impl RawDate {
    pub fn year_month(year: i32, month: u32) -> Self {
        RawDate::Parts { year, month }
    }
}

/// Another capture recorded at the same site on a different date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateCapture {
    pub panorama_id: String,
    pub capture_timestamp: RawDate,
}

/// Successful answer from the imagery lookup service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub panorama_id: String,
    pub panorama_position: Coordinate,
    pub capture_date: RawDate,
    pub alternate_captures: Vec<AlternateCapture>,
}

/// A panorama identifier paired with its formatted capture date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedPanorama {
    /// Panorama identifier
    pub pano: String,
    /// Capture date label, e.g. "Mar 2019"
    pub date: String,
}

/// Everything a rendering surface needs to show a resolved panorama.
///
/// Created fresh for every successful resolution and owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaView {
    pub panorama_id: String,
    /// Where the resolved panorama was captured; kept as the site position
    /// when switching to an alternate capture
    pub panorama_position: Coordinate,
    /// The location the caller asked for
    pub target_coordinate: Coordinate,
    /// Bearing from the panorama toward the target, 0-360 clockwise from north
    pub heading_degrees: f64,
    /// One of 0, 1, 1.5 or 2
    pub zoom_level: f64,
    /// "MMM YYYY"
    pub capture_date_label: String,
    pub alternate_captures: Vec<DatedPanorama>,
}

// Coordinates are only ever compared by distance, but views compare by value
// so that tests and surfaces can detect "same view applied again".
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_request_defaults() {
        let req = LookupRequest::new(Coordinate::new(48.85, 2.35), 10.0);
        assert_eq!(req.preference, Preference::Nearest);
        assert_eq!(req.source, ImagerySource::Outdoor);
        assert_eq!(req.radius_meters, 10.0);
    }

    #[test]
    fn test_raw_date_accepts_both_shapes() {
        let text: RawDate = serde_json::from_value(json!("2019-03")).unwrap();
        assert_eq!(text, RawDate::Text("2019-03".to_string()));

        let parts: RawDate = serde_json::from_value(json!({"year": 2020, "month": 7})).unwrap();
        assert_eq!(parts, RawDate::year_month(2020, 7));
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = PanoramaView {
            panorama_id: "abc".to_string(),
            panorama_position: Coordinate::new(1.0, 2.0),
            target_coordinate: Coordinate::new(1.0, 2.0),
            heading_degrees: 90.0,
            zoom_level: 1.5,
            capture_date_label: "Mar 2019".to_string(),
            alternate_captures: vec![],
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["panoramaId"], "abc");
        assert_eq!(value["zoomLevel"], 1.5);
        assert_eq!(value["captureDateLabel"], "Mar 2019");
    }
}
