//! Time series store
//!
//! Holds one loaded session together with everything derived from it. A new
//! session replaces the whole store; nothing is mutated after construction.

use crate::model::{Sample, Session, TrackOutline};
use crate::projection::{CartesianFrame, CircularFrame, Viewport};
use crate::time::TimeOfDay;

#[derive(Debug, Clone)]
pub struct RaceStore {
    session: Session,
    outline: TrackOutline,
    cartesian: Option<CartesianFrame>,
    circular: Option<CircularFrame>,
}

impl RaceStore {
    /// Derive the per-session projection frames for the given viewports
    pub fn new(
        session: Session,
        outline: TrackOutline,
        track_view: Viewport,
        circular_view: Viewport,
    ) -> Self {
        let cartesian = CartesianFrame::fit(&outline, track_view);
        let circular = CircularFrame::build(&session, circular_view);

        tracing::debug!(
            samples = session.len(),
            drivers = session.drivers.len(),
            outline_points = outline.path.len(),
            track_length = circular.as_ref().map(|c| c.track_length()),
            "Derived session state"
        );

        Self {
            session,
            outline,
            cartesian,
            circular,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn outline(&self) -> &TrackOutline {
        &self.outline
    }

    pub fn len(&self) -> usize {
        self.session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty()
    }

    /// Sample containing the fractional `index`; `None` outside the timeline
    pub fn sample_at(&self, index: f64) -> Option<&Sample> {
        if !(index >= 0.0) || !index.is_finite() {
            return None;
        }
        self.session.telemetry.get(index.floor() as usize)
    }

    /// Elapsed time of the sample at `index`
    ///
    /// Falls back to the index itself (1 sample per second) when the sample
    /// clock does not parse.
    pub fn seconds_at(&self, index: f64) -> f64 {
        self.sample_at(index)
            .and_then(|s| TimeOfDay::parse(&s.time).ok())
            .map(|t| t.as_secs_f64())
            .unwrap_or_else(|| index.max(0.0).floor())
    }

    /// `None` when the outline is empty
    pub fn cartesian(&self) -> Option<&CartesianFrame> {
        self.cartesian.as_ref()
    }

    /// `None` when the circular projection is undefined for this session
    pub fn circular(&self) -> Option<&CircularFrame> {
        self.circular.as_ref()
    }
}
