//! Lap length resolution
//!
//! The backend does not always supply a lap length. When it is missing it is
//! inferred from the raw distance telemetry, which is approximate by nature.

use crate::model::Session;

/// Above this, distances are taken as cumulative over the race
const CUMULATIVE_THRESHOLD: f64 = 10_000.0;

/// Plausible first-lap range for cumulative distances (exclusive bounds)
const FIRST_LAP_RANGE: (f64, f64) = (2_000.0, 8_000.0);

const TYPICAL_LAP_LENGTH: f64 = 5_000.0;

/// Session lap length if positive, else [`estimate_track_length`]
pub fn resolve_track_length(session: &Session) -> Option<f64> {
    session
        .track_length
        .filter(|len| *len > 0.0 && len.is_finite())
        .or_else(|| estimate_track_length(session))
}

/// Estimate the lap length from observed positive distances
///
/// With a maximum at or below 10 km the maximum is the lap length. Above it
/// distances are cumulative, and the largest distinct value strictly inside
/// the 2-8 km range is used, or 5 km when none falls there.
pub fn estimate_track_length(session: &Session) -> Option<f64> {
    let distances = || {
        session
            .telemetry
            .iter()
            .flat_map(|sample| sample.drivers.values())
            .filter_map(|pos| pos.distance)
            .filter(|d| *d > 0.0 && d.is_finite())
    };

    let max = distances().reduce(f64::max)?;
    if max <= CUMULATIVE_THRESHOLD {
        return Some(max);
    }

    let (low, high) = FIRST_LAP_RANGE;
    Some(
        distances()
            .filter(|d| *d > low && *d < high)
            .reduce(f64::max)
            .unwrap_or(TYPICAL_LAP_LENGTH),
    )
}
