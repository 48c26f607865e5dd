use crate::config::SearchConfig;
use crate::error::{PanoError, Result};
use crate::geometry::{distance, zoom_level, HeadingProvider, SphericalHeading};
use crate::lookup::{LookupFailure, LookupService};
use crate::metadata::{capture_date_label, other_panoramas_with_dates};
use crate::policy::{SearchDecision, SearchPolicy};
use crate::types::{Coordinate, LookupRequest, LookupResult, PanoramaView};
use tokio_util::sync::CancellationToken;

/// Finds the panorama nearest a coordinate and derives how to look at it.
///
/// Lookups start at a small radius and widen after every failure until a
/// panorama is found or the search gives up. A successful lookup becomes a
/// [`PanoramaView`] with the camera turned toward the requested coordinate.
pub struct PanoramaResolver<L, H = SphericalHeading> {
    lookup: L,
    heading: H,
    config: SearchConfig,
}

impl<L: LookupService> PanoramaResolver<L> {
    /// Creates a resolver with the default search radii and spherical headings.
    pub fn new(lookup: L) -> Self {
        Self::with_heading(lookup, SphericalHeading)
    }
}

impl<L: LookupService, H: HeadingProvider> PanoramaResolver<L, H> {
    /// Creates a resolver that delegates heading computation to `heading`.
    pub fn with_heading(lookup: L, heading: H) -> Self {
        Self {
            lookup,
            heading,
            config: SearchConfig::default(),
        }
    }

    /// Replace the search configuration.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn heading_provider(&self) -> &H {
        &self.heading
    }

    /// Resolve `target` to the nearest panorama.
    ///
    /// # Errors
    ///
    /// Returns `PanoError::PanoramaNotFound` when every lookup up to the
    /// give-up radius failed, or `PanoError::MalformedMetadata` when the found
    /// panorama carries unusable capture dates or the lookup reported
    /// malformed capture metadata.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use panoseek::{Coordinate, GeoPhotoLookup, PanoramaResolver};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let resolver = PanoramaResolver::new(GeoPhotoLookup::new());
    /// let view = resolver.resolve(Coordinate::new(48.85, 2.35)).await?;
    /// println!("{} ({}), heading {:.1}", view.panorama_id, view.capture_date_label, view.heading_degrees);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resolve(&self, target: Coordinate) -> Result<PanoramaView> {
        self.resolve_cancellable(target, &CancellationToken::new())
            .await
    }

    /// Like [`resolve`](Self::resolve), but stops with `PanoError::Cancelled`
    /// as soon as `cancel` fires.
    pub async fn resolve_cancellable(
        &self,
        target: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<PanoramaView> {
        let mut policy = SearchPolicy::new(&self.config);
        let mut request = LookupRequest::new(target, policy.radius_meters());

        loop {
            if cancel.is_cancelled() {
                return Err(PanoError::Cancelled);
            }

            tracing::debug!(
                lat = target.lat,
                lng = target.lng,
                radius = request.radius_meters,
                "requesting panorama"
            );
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PanoError::Cancelled),
                outcome = self.lookup.get_panorama(&request) => outcome,
            };

            let status = match outcome {
                Ok(result) => return self.build_view(target, result),
                Err(LookupFailure::Malformed(reason)) => {
                    tracing::warn!(radius = request.radius_meters, %reason, "panorama metadata is malformed");
                    return Err(PanoError::MalformedMetadata(reason));
                }
                Err(status) => status,
            };

            let radius = request.radius_meters;
            match policy.on_failure() {
                SearchDecision::Retry { radius_meters } => {
                    tracing::info!(
                        %status,
                        radius,
                        next_radius = radius_meters,
                        "could not find panorama, widening search"
                    );
                    request.radius_meters = radius_meters;
                    self.pause_before_retry(cancel).await?;
                }
                SearchDecision::GiveUp { radius_meters } => {
                    tracing::warn!(
                        %status,
                        radius = radius_meters,
                        attempts = policy.failures(),
                        "could not find panorama, giving up"
                    );
                    return Err(PanoError::PanoramaNotFound { radius_meters });
                }
            }
        }
    }

    async fn pause_before_retry(&self, cancel: &CancellationToken) -> Result<()> {
        if self.config.retry_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(PanoError::Cancelled),
            _ = tokio::time::sleep(self.config.retry_delay) => Ok(()),
        }
    }

    /// Turn a successful lookup into a view aimed at `target`.
    pub fn build_view(&self, target: Coordinate, result: LookupResult) -> Result<PanoramaView> {
        let dist = distance(target, result.panorama_position);
        let zoom = zoom_level(dist);
        let heading = self
            .heading
            .compute_heading(result.panorama_position, target);
        let capture_date_label = capture_date_label(&result.capture_date)?;
        let alternate_captures = other_panoramas_with_dates(&result.alternate_captures)?;

        tracing::debug!(
            pano = %result.panorama_id,
            distance = dist,
            zoom,
            heading,
            date = %capture_date_label,
            "panorama found"
        );

        Ok(PanoramaView {
            panorama_id: result.panorama_id,
            panorama_position: result.panorama_position,
            target_coordinate: target,
            heading_degrees: heading,
            zoom_level: zoom,
            capture_date_label,
            alternate_captures,
        })
    }
}
