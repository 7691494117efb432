//! Clock-face projection
//!
//! 0% of the lap (start/finish) sits at 12 o'clock and progress runs
//! clockwise. A driver's angle is the reference-lap time fraction at their
//! in-lap distance.

use super::reference_lap::ReferenceLapCurve;
use super::track_length::resolve_track_length;
use super::{ScreenPoint, Viewport};
use crate::model::{DriverPosition, Session};
use serde::Serialize;

/// Circle radius as a share of the smaller viewport side
const RADIUS_FACTOR: f64 = 0.25;
const START_FINISH_FACTOR: f64 = 0.15;
const QUARTER_MARKER_FACTOR: f64 = 0.1;
const LABEL_OFFSET: f64 = 15.0;

/// Per-session circular layout
#[derive(Debug, Clone)]
pub struct CircularFrame {
    track_length: f64,
    curve: ReferenceLapCurve,
    center: ScreenPoint,
    radius: f64,
}

/// A driver placed on the circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircularPoint {
    /// Fraction of the reference lap elapsed, `0.0..=1.0`
    pub progress: f64,
    /// Degrees, screen convention (0 = 3 o'clock, clockwise)
    pub angle: f64,
    pub at: ScreenPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterMarker {
    pub label: String,
    pub from: ScreenPoint,
    pub to: ScreenPoint,
    pub label_at: ScreenPoint,
}

impl CircularFrame {
    /// `None` when the lap length is unresolvable or no lap was completed
    pub fn build(session: &Session, viewport: Viewport) -> Option<Self> {
        let track_length = resolve_track_length(session)?;
        let curve = ReferenceLapCurve::build(session, track_length)?;
        Some(Self::with_curve(track_length, curve, viewport))
    }

    pub fn with_curve(track_length: f64, curve: ReferenceLapCurve, viewport: Viewport) -> Self {
        Self {
            track_length,
            curve,
            center: ScreenPoint::new(viewport.width / 2.0, viewport.height / 2.0),
            radius: viewport.width.min(viewport.height) * RADIUS_FACTOR,
        }
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }

    pub fn curve(&self) -> &ReferenceLapCurve {
        &self.curve
    }

    pub fn center(&self) -> ScreenPoint {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Reference-lap progress for a raw distance; periodic in the lap length
    pub fn progress(&self, distance: f64) -> Option<f64> {
        if !distance.is_finite() {
            return None;
        }
        Some(self.curve.progress(distance.rem_euclid(self.track_length)))
    }

    /// Place a driver on the circle; needs a distance
    pub fn project(&self, position: &DriverPosition) -> Option<CircularPoint> {
        let progress = self.progress(position.distance?)?;
        let angle = progress * 360.0 - 90.0;
        Some(CircularPoint {
            progress,
            angle,
            at: self.on_circle(angle, self.radius),
        })
    }

    /// Start/finish tick at 12 o'clock, pointing outwards
    pub fn start_finish(&self) -> (ScreenPoint, ScreenPoint) {
        (
            self.on_circle(-90.0, self.radius),
            self.on_circle(-90.0, self.radius * (1.0 + START_FINISH_FACTOR)),
        )
    }

    /// 25%, 50% and 75% ticks at 3, 6 and 9 o'clock
    pub fn quarter_markers(&self) -> Vec<QuarterMarker> {
        let outer = self.radius * (1.0 + QUARTER_MARKER_FACTOR);
        [(0.0, "25%"), (90.0, "50%"), (180.0, "75%")]
            .into_iter()
            .map(|(angle, label)| QuarterMarker {
                label: label.to_string(),
                from: self.on_circle(angle, self.radius),
                to: self.on_circle(angle, outer),
                label_at: self.on_circle(angle, outer + LABEL_OFFSET),
            })
            .collect()
    }

    fn on_circle(&self, angle_deg: f64, radius: f64) -> ScreenPoint {
        let rad = angle_deg.to_radians();
        ScreenPoint::new(
            self.center.x + rad.cos() * radius,
            self.center.y + rad.sin() * radius,
        )
    }
}
