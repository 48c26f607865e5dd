use crate::error::{PanoError, Result};
use crate::types::{AlternateCapture, Coordinate, LookupRequest, LookupResult, RawDate};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

const SEARCH_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/js/GeoPhotoService.SingleImageSearch";

static CALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"callbackfunc\((.*)\)").expect("valid callback regex"));

/// Why a lookup did not return a panorama.
///
/// `ZeroResults` and `Unavailable` only tell the resolver that the status was
/// not OK. `Malformed` means a panorama was found but its capture metadata
/// cannot be trusted, so widening the search would not help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// No panorama within the requested radius
    ZeroResults,
    /// The service could not be reached or answered with something unusable
    Unavailable(String),
    /// The panorama's capture metadata has an unexpected shape
    Malformed(String),
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::ZeroResults => write!(f, "ZERO_RESULTS"),
            LookupFailure::Unavailable(reason) => write!(f, "UNAVAILABLE ({reason})"),
            LookupFailure::Malformed(reason) => write!(f, "MALFORMED ({reason})"),
        }
    }
}

/// An imagery lookup service that finds the panorama nearest a location.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn get_panorama(
        &self,
        request: &LookupRequest,
    ) -> std::result::Result<LookupResult, LookupFailure>;
}

#[async_trait]
impl<T: LookupService + ?Sized> LookupService for std::sync::Arc<T> {
    async fn get_panorama(
        &self,
        request: &LookupRequest,
    ) -> std::result::Result<LookupResult, LookupFailure> {
        (**self).get_panorama(request).await
    }
}

/// Lookup backed by the GeoPhoto single-image search endpoint.
///
/// This endpoint is undocumented and needs no API key. It always returns the
/// nearest outdoor panorama within the radius, together with the other
/// captures recorded at that site.
#[derive(Clone)]
pub struct GeoPhotoLookup {
    client: Client,
    endpoint: String,
}

impl GeoPhotoLookup {
    /// Creates a lookup with a default HTTP client.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates a lookup with a custom reqwest Client.
    ///
    /// This allows you to configure proxies, timeouts or custom headers.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            endpoint: SEARCH_ENDPOINT.to_string(),
        }
    }

    /// Point the lookup at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the search URL for a request.
    fn make_search_url(&self, request: &LookupRequest) -> String {
        let Coordinate { lat, lng } = request.location;
        let radius = request.radius_meters;
        format!(
            "{}?pb=!1m5!1sapiv3!5sUS!11m2!1m1!1b0!2m4!1m2!3d{lat}!4d{lng}!2d{radius}!3m18!2m2!1sen!2sUS!9m1!1e2!11m12!1m3!1e2!2b1!3e2!1m3!1e3!2b1!3e2!1m3!1e10!2b1!3e2!4m6!1e1!1e2!1e3!1e4!1e8!1e6&callback=callbackfunc",
            self.endpoint
        )
    }

    async fn fetch(&self, request: &LookupRequest) -> Result<Option<LookupResult>> {
        let url = self.make_search_url(request);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanoError::InvalidResponse(format!("HTTP {status}")));
        }

        let text = response.text().await?;
        extract_lookup_result(&text)
    }
}

impl Default for GeoPhotoLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupService for GeoPhotoLookup {
    async fn get_panorama(
        &self,
        request: &LookupRequest,
    ) -> std::result::Result<LookupResult, LookupFailure> {
        match self.fetch(request).await {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err(LookupFailure::ZeroResults),
            Err(PanoError::MalformedMetadata(reason)) => Err(LookupFailure::Malformed(reason)),
            Err(e) => Err(LookupFailure::Unavailable(e.to_string())),
        }
    }
}

/// Extract the nearest panorama from the JavaScript callback response.
///
/// Returns `Ok(None)` when the search found nothing within the radius.
fn extract_lookup_result(text: &str) -> Result<Option<LookupResult>> {
    if text.contains("Search returned no images") {
        return Ok(None);
    }

    // callbackfunc(JSON_DATA)
    let json_str = CALLBACK_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .ok_or_else(|| PanoError::ParseError("Could not extract JSON from response".to_string()))?
        .as_str();

    let data: Value = serde_json::from_str(json_str)
        .map_err(|e| PanoError::ParseError(format!("JSON parse error: {e}")))?;

    // All panoramas at this site: data[1][5][0][3][0], nearest first
    let pano_array = data
        .get(1)
        .and_then(|v| v.get(5))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get(3))
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_array())
        .ok_or_else(|| PanoError::InvalidResponse("Panorama data not found".to_string()))?;

    let panos = pano_array
        .iter()
        .map(parse_pano_entry)
        .collect::<Result<Vec<_>>>()?;

    let (panorama_id, panorama_position) = panos
        .first()
        .cloned()
        .ok_or_else(|| PanoError::InvalidResponse("Panorama list is empty".to_string()))?;

    // Capture date of the nearest panorama: data[1][6][7] = [year, month]
    let capture_date = data
        .get(1)
        .and_then(|v| v.get(6))
        .and_then(|v| v.get(7))
        .and_then(parse_year_month_pair)
        .ok_or_else(|| PanoError::InvalidResponse("Capture date not found".to_string()))?;

    // Other captures: data[1][5][0][8], absent when the site has no history
    let alternate_captures = match data
        .get(1)
        .and_then(|v| v.get(5))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get(8))
    {
        None | Some(Value::Null) => Vec::new(),
        Some(node) => parse_alternate_dates(node, &panos)?,
    };

    Ok(Some(LookupResult {
        panorama_id,
        panorama_position,
        capture_date,
        alternate_captures,
    }))
}

fn parse_pano_entry(pano_data: &Value) -> Result<(String, Coordinate)> {
    let pano_arr = pano_data
        .as_array()
        .ok_or_else(|| PanoError::ParseError("Invalid panorama format".to_string()))?;

    let pano_id = pano_arr
        .first()
        .and_then(|v| v.get(1))
        .and_then(|v| v.as_str())
        .ok_or_else(|| PanoError::ParseError("Missing pano_id".to_string()))?
        .to_string();

    // GPS coordinates are in pano_arr[2][0]
    let coords = pano_arr
        .get(2)
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_array())
        .ok_or_else(|| PanoError::ParseError("Missing coordinates".to_string()))?;

    let lat = coords
        .get(2)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| PanoError::ParseError("Missing latitude".to_string()))?;

    let lng = coords
        .get(3)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| PanoError::ParseError("Missing longitude".to_string()))?;

    Ok((pano_id, Coordinate::new(lat, lng)))
}

/// Parse `[[index], [year, month]]` entries, where index points into the
/// panorama list. Index 0 is the nearest panorama itself and is skipped.
fn parse_alternate_dates(node: &Value, panos: &[(String, Coordinate)]) -> Result<Vec<AlternateCapture>> {
    let entries = node
        .as_array()
        .ok_or_else(|| PanoError::MalformedMetadata("alternate dates are not a list".to_string()))?;

    let mut captures = Vec::with_capacity(entries.len());
    for (n, entry) in entries.iter().enumerate() {
        let idx = entry
            .get(0)
            .and_then(|v| v.get(0))
            .and_then(Value::as_u64)
            .ok_or_else(|| PanoError::MalformedMetadata(format!("alternate date {n} has no index")))?;
        let capture_timestamp = entry
            .get(1)
            .and_then(parse_year_month_pair)
            .ok_or_else(|| PanoError::MalformedMetadata(format!("alternate date {n} has no [year, month]")))?;
        let (pano_id, _) = usize::try_from(idx)
            .ok()
            .and_then(|i| panos.get(i))
            .ok_or_else(|| {
                PanoError::MalformedMetadata(format!(
                    "alternate date {n} points at panorama {idx} of {}",
                    panos.len()
                ))
            })?;

        if idx != 0 {
            captures.push(AlternateCapture {
                panorama_id: pano_id.clone(),
                capture_timestamp,
            });
        }
    }
    Ok(captures)
}

fn parse_year_month_pair(value: &Value) -> Option<RawDate> {
    let pair = value.as_array()?;
    let year = i32::try_from(pair.first()?.as_i64()?).ok()?;
    let month = u32::try_from(pair.get(1)?.as_u64()?).ok()?;
    Some(RawDate::year_month(year, month))
}
