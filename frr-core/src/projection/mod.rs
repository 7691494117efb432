//! Projection engine
//!
//! Two independent mappings from a driver's raw telemetry to screen space:
//!
//! - [`CartesianFrame`]: the true track shape, fitted into a viewport
//! - [`CircularFrame`]: a clock face where the angle is the fraction of a
//!   reference lap elapsed at the driver's in-lap distance
//!
//! Both are built once per session and are pure afterwards.

pub mod cartesian;
pub mod circular;
pub mod reference_lap;
pub mod track_length;

pub use cartesian::{CartesianFrame, SectorMarker, StartFinishMarker};
pub use circular::{CircularFrame, CircularPoint, QuarterMarker};
pub use reference_lap::ReferenceLapCurve;
pub use track_length::{estimate_track_length, resolve_track_length};

use serde::{Deserialize, Serialize};

/// Drawing surface dimensions in view-box units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const TRACK_MAP: Viewport = Viewport::new(800.0, 600.0);
    pub const CIRCULAR_MAP: Viewport = Viewport::new(400.0, 400.0);

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Point in view-box units, origin top-left, y growing downward
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
