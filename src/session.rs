//! Viewing session: the current target, panorama and rendering surface.
//!
//! A [`Session`] owns everything a viewer page needs between operations, so
//! camera controls (turn, reset, switch capture date) always act on the
//! location that was resolved last. Starting a new resolution supersedes
//! the previous one: an older attempt still in flight is cancelled and its
//! result is never applied.

use crate::error::{PanoError, Result};
use crate::geometry::{HeadingProvider, SphericalHeading};
use crate::lookup::LookupService;
use crate::resolver::PanoramaResolver;
use crate::types::{Coordinate, PanoramaView};
use crate::views::{PointOfView, RenderSurface, ViewApplier};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct SessionState<S> {
    coordinates: Option<Coordinate>,
    view: Option<PanoramaView>,
    surface: Option<S>,
}

/// The newest resolution attempt.
#[derive(Default)]
struct Attempt {
    generation: u64,
    token: CancellationToken,
    in_flight: bool,
}

/// Marks its attempt finished when the resolution returns or is dropped.
struct InFlight<'a> {
    attempt: &'a Mutex<Attempt>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut attempt = self.attempt.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer attempt owns the flag now
        if attempt.generation == self.generation {
            attempt.in_flight = false;
        }
    }
}

/// A viewing session bound to one rendering surface.
pub struct Session<L, S, H = SphericalHeading> {
    resolver: PanoramaResolver<L, H>,
    state: Mutex<SessionState<S>>,
    current_attempt: Mutex<Attempt>,
}

impl<L: LookupService, S: RenderSurface> Session<L, S> {
    pub fn new(lookup: L) -> Self {
        Self::with_resolver(PanoramaResolver::new(lookup))
    }
}

impl<L, S, H> Session<L, S, H>
where
    L: LookupService,
    S: RenderSurface,
    H: HeadingProvider,
{
    pub fn with_resolver(resolver: PanoramaResolver<L, H>) -> Self {
        Self {
            resolver,
            state: Mutex::new(SessionState {
                coordinates: None,
                view: None,
                surface: None,
            }),
            current_attempt: Mutex::new(Attempt::default()),
        }
    }

    pub fn resolver(&self) -> &PanoramaResolver<L, H> {
        &self.resolver
    }

    /// Resolve the first location and create the surface for it.
    ///
    /// If a surface already exists it is updated instead.
    pub async fn open(&self, target: Coordinate) -> Result<PanoramaView> {
        self.change_location(target).await
    }

    /// Move the session to a new location.
    ///
    /// Any older resolution still in flight is cancelled and fails with
    /// `PanoError::Cancelled`; only the newest attempt reaches the surface.
    /// On `PanoError::PanoramaNotFound` the session keeps showing the
    /// previous location.
    pub async fn change_location(&self, target: Coordinate) -> Result<PanoramaView> {
        let (attempt, _in_flight) = self.supersede();
        let view = self.resolver.resolve_cancellable(target, &attempt).await?;

        let mut state = self.lock_state();
        // Checked under the state lock so a newer attempt cannot slip in
        // between the check and the apply.
        if attempt.is_cancelled() {
            tracing::debug!(pano = %view.panorama_id, "discarding superseded panorama");
            return Err(PanoError::Cancelled);
        }

        ViewApplier::apply(&mut state.surface, &view);
        state.coordinates = Some(target);
        state.view = Some(view.clone());
        Ok(view)
    }

    /// Cancel the in-flight attempt, if any, and start tracking a new one.
    fn supersede(&self) -> (CancellationToken, InFlight<'_>) {
        let mut attempt = self.lock_attempt();
        if attempt.in_flight {
            tracing::debug!(
                generation = attempt.generation,
                "superseding previous resolution attempt"
            );
        }
        attempt.token.cancel();
        attempt.generation = attempt.generation.wrapping_add(1);
        attempt.token = CancellationToken::new();
        attempt.in_flight = true;

        let in_flight = InFlight {
            attempt: &self.current_attempt,
            generation: attempt.generation,
        };
        (attempt.token.clone(), in_flight)
    }

    /// Cancel whatever resolution is in flight without starting a new one.
    pub fn cancel_pending(&self) {
        let mut attempt = self.lock_attempt();
        attempt.token.cancel();
        attempt.in_flight = false;
    }

    /// Whether a resolution started by this session has not finished yet.
    pub fn has_pending(&self) -> bool {
        self.lock_attempt().in_flight
    }

    /// Turn the camera by `degrees` (positive is clockwise) and set the pitch.
    pub fn adjust_heading(&self, degrees: f64, pitch: f64) -> Result<PointOfView> {
        self.with_surface(|surface, _| {
            let pov = PointOfView::new(surface.pov().heading + degrees).pitch(pitch);
            surface.set_pov(pov);
            pov
        })
    }

    /// Face the session's target again from wherever the camera now stands.
    pub fn reset_camera(&self, pitch: f64) -> Result<PointOfView> {
        let resolver = &self.resolver;
        self.with_surface(|surface, coordinates| {
            let target = coordinates.unwrap_or_else(|| surface.position());
            let bearing = resolver
                .heading_provider()
                .compute_heading(surface.position(), target);
            let pov = PointOfView::new(bearing).pitch(pitch);
            surface.set_pov(pov);
            pov
        })
    }

    pub fn set_zoom(&self, zoom: f64) -> Result<()> {
        self.with_surface(|surface, _| surface.set_zoom(zoom))
    }

    /// Switch to another capture of the same site.
    ///
    /// The current view follows, so later uploads carry the new pano id and
    /// date. Its `panorama_position` stays the site position found by the
    /// last resolution: alternate captures come without a position of their
    /// own and are taken from the same spot.
    pub fn set_date(&self, pano_id: &str, date_label: &str) -> Result<()> {
        let mut state = self.lock_state();
        let SessionState { view, surface, .. } = &mut *state;
        let surface = surface.as_mut().ok_or(PanoError::NoSurface)?;

        surface.set_pano(pano_id);
        if let Some(view) = view.as_mut() {
            view.panorama_id = pano_id.to_string();
            view.capture_date_label = date_label.to_string();
        }
        Ok(())
    }

    /// Go back to the panorama of the current view: the last resolution, or
    /// the capture chosen by the last [`set_date`](Self::set_date), standing
    /// at the site position.
    pub fn reset_initial_position(&self) -> Result<()> {
        let mut state = self.lock_state();
        let SessionState { view, surface, .. } = &mut *state;
        let surface = surface.as_mut().ok_or(PanoError::NoSurface)?;
        let view = view.as_ref().ok_or(PanoError::NoSurface)?;

        surface.set_pano(&view.panorama_id);
        surface.set_position(view.panorama_position);
        Ok(())
    }

    /// The view most recently applied, including any date switch.
    pub fn current_view(&self) -> Option<PanoramaView> {
        self.lock_state().view.clone()
    }

    /// The coordinates the session is currently aimed at.
    pub fn coordinates(&self) -> Option<Coordinate> {
        self.lock_state().coordinates
    }

    /// Read the surface state.
    pub fn surface<R>(&self, read: impl FnOnce(&S) -> R) -> Option<R> {
        self.lock_state().surface.as_ref().map(read)
    }

    /// Drive the surface directly, e.g. when the user walks to a linked pano.
    pub fn surface_mut<R>(&self, op: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.lock_state().surface.as_mut().map(op)
    }

    fn with_surface<R>(&self, op: impl FnOnce(&mut S, Option<Coordinate>) -> R) -> Result<R> {
        let mut state = self.lock_state();
        let coordinates = state.coordinates;
        let surface = state.surface.as_mut().ok_or(PanoError::NoSurface)?;
        Ok(op(surface, coordinates))
    }

    fn lock_attempt(&self) -> MutexGuard<'_, Attempt> {
        self.current_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
