//! Lap-time scatter plot data
//!
//! The y axis runs from the fastest time so far to five seconds above the
//! median, which keeps pit laps and safety-car laps from flattening the
//! interesting band.

use crate::model::{DriverId, LapNumber, RgbColor, Session};
use serde::Serialize;

/// Headroom above the median on the y axis, in seconds
pub const MEDIAN_HEADROOM_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapTimePoint {
    pub driver: DriverId,
    pub lap: LapNumber,
    pub seconds: f64,
    pub color: RgbColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapTimeChart {
    pub points: Vec<LapTimePoint>,
    pub median: f64,
    pub fastest: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Upper bound of the lap axis, at least 1
    pub max_lap: LapNumber,
}

impl LapTimeChart {
    /// Chart for laps `..=current_lap`; `None` until a lap has been completed
    pub fn build(session: &Session, current_lap: LapNumber) -> Option<Self> {
        let points: Vec<LapTimePoint> = session
            .lap_times
            .iter()
            .flat_map(|(driver, laps)| {
                laps.range(..=current_lap)
                    .filter(|(_, secs)| secs.is_finite())
                    .map(move |(&lap, &seconds)| LapTimePoint {
                        driver: driver.clone(),
                        lap,
                        seconds,
                        color: session.driver_color(driver),
                    })
            })
            .collect();

        let mut sorted: Vec<f64> = points.iter().map(|p| p.seconds).collect();
        sorted.sort_by(f64::total_cmp);
        let median = median(&sorted)?;
        let fastest = sorted[0];

        let max_lap = session
            .lap_times
            .values()
            .filter_map(|laps| laps.keys().next_back().copied())
            .chain([current_lap, 1])
            .max()
            .unwrap_or(1);

        Some(Self {
            points,
            median,
            fastest,
            y_min: fastest,
            y_max: median + MEDIAN_HEADROOM_SECS,
            max_lap,
        })
    }
}

/// Median of sorted values; mean of the middle pair for even counts
fn median(sorted: &[f64]) -> Option<f64> {
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => None,
        n if n % 2 == 0 => Some((sorted[mid - 1] + sorted[mid]) / 2.0),
        _ => Some(sorted[mid]),
    }
}
