//! Distance to elapsed-fraction curve of the session's fastest lap
//!
//! Angular position on the circular map is "how far into the lap, in time",
//! measured against the fastest lap. Braking zones compress angle and
//! straights expand it compared to a plain distance fraction.

use crate::model::{LapNumber, Session};
use crate::race::{fastest_lap, FastestLap};
use crate::time::TimeOfDay;

/// Monotonic mapping from in-lap distance to fraction of lap elapsed
#[derive(Debug, Clone)]
pub struct ReferenceLapCurve {
    lap: FastestLap,
    /// In-lap distances, ascending and distinct
    keys: Vec<f64>,
    /// Elapsed fraction for each key, in `0.0..=1.0`
    fractions: Vec<f64>,
    min_distance: f64,
    max_distance: f64,
}

impl ReferenceLapCurve {
    /// Build from the single fastest recorded lap of the session
    ///
    /// `None` when no lap has been completed. Distances are taken relative to
    /// the reference driver's first sample on that lap; times come from the
    /// sample clock, or the sample index if any clock on the lap is
    /// unparsable.
    pub fn build(session: &Session, track_length: f64) -> Option<Self> {
        let lap = fastest_lap(session, LapNumber::MAX)?;

        let on_lap: Vec<(usize, &str, f64)> = session
            .telemetry
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                let pos = sample.drivers.get(&lap.driver)?;
                if pos.lap != Some(lap.lap) {
                    return None;
                }
                let distance = pos.distance.filter(|d| d.is_finite())?;
                Some((index, sample.time.as_str(), distance))
            })
            .collect();

        let clock: Option<Vec<f64>> = on_lap
            .iter()
            .map(|(_, time, _)| TimeOfDay::parse(time).ok().map(|t| t.as_secs_f64()))
            .collect();
        let times = clock.unwrap_or_else(|| on_lap.iter().map(|(i, _, _)| *i as f64).collect());

        let mut points: Vec<(f64, f64)> = match (on_lap.first(), times.first()) {
            (Some(&(_, _, start_distance)), Some(&start_time)) if lap.seconds > 0.0 => on_lap
                .iter()
                .zip(&times)
                .map(|(&(_, _, distance), &time)| {
                    let fraction = ((time - start_time) / lap.seconds).clamp(0.0, 1.0);
                    (distance - start_distance, fraction)
                })
                .collect(),
            _ => Vec::new(),
        };

        // stable: the earliest sample wins for a repeated distance
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points.dedup_by(|later, earlier| later.0 == earlier.0);

        // fractions never decrease with distance
        let mut running_max = 0.0_f64;
        for point in &mut points {
            running_max = running_max.max(point.1);
            point.1 = running_max;
        }

        let (keys, fractions): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        let (min_distance, max_distance) = match (keys.first(), keys.last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => (0.0, track_length),
        };

        tracing::debug!(
            driver = %lap.driver,
            lap = lap.lap,
            seconds = lap.seconds,
            points = keys.len(),
            "Built reference lap curve"
        );

        Some(Self {
            lap,
            keys,
            fractions,
            min_distance,
            max_distance,
        })
    }

    /// The lap this curve was built from
    pub fn reference(&self) -> &FastestLap {
        &self.lap
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Elapsed fraction at the recorded distance nearest to `distance_in_lap`
    ///
    /// Equidistant neighbours resolve to the smaller distance. Without any
    /// recorded point the fraction is linear between the observed bounds.
    pub fn progress(&self, distance_in_lap: f64) -> f64 {
        if self.keys.is_empty() {
            let span = self.max_distance - self.min_distance;
            if !(span > 0.0) {
                return 0.0;
            }
            return ((distance_in_lap - self.min_distance) / span).clamp(0.0, 1.0);
        }

        let upper = self.keys.partition_point(|k| *k < distance_in_lap);
        let nearest = if upper == 0 {
            0
        } else if upper == self.keys.len() {
            upper - 1
        } else {
            let below = distance_in_lap - self.keys[upper - 1];
            let above = self.keys[upper] - distance_in_lap;
            if above < below {
                upper
            } else {
                upper - 1
            }
        };
        self.fractions[nearest]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriverPosition, Sample};
    use std::collections::BTreeMap;

    fn sample(time: &str, lap: LapNumber, distance: f64) -> Sample {
        Sample {
            time: time.to_string(),
            drivers: [(
                "1".to_string(),
                DriverPosition {
                    lap: Some(lap),
                    distance: Some(distance),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
        }
    }

    /// Lap 2 takes 4 s: slow for the first 100 m, fast for the next 900 m
    fn session() -> Session {
        let mut lap_times = BTreeMap::new();
        lap_times.insert("1".to_string(), [(1, 5.0), (2, 4.0)].into_iter().collect());
        Session {
            telemetry: vec![
                sample("0:00:00", 1, 0.0),
                sample("0:00:05", 2, 1000.0),
                sample("0:00:06", 2, 1050.0),
                sample("0:00:07", 2, 1100.0),
                sample("0:00:08", 2, 1600.0),
                sample("0:00:09", 2, 2000.0),
            ],
            lap_times,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_uses_fastest_lap() {
        let curve = ReferenceLapCurve::build(&session(), 1000.0).unwrap();
        assert_eq!(curve.reference().lap, 2);
        assert_eq!(curve.len(), 5);
    }

    #[test]
    fn test_progress_follows_time_not_distance() {
        let curve = ReferenceLapCurve::build(&session(), 1000.0).unwrap();
        assert_eq!(curve.progress(0.0), 0.0);
        // 100 m in, half the lap has already elapsed
        assert_eq!(curve.progress(100.0), 0.5);
        assert_eq!(curve.progress(600.0), 0.75);
        assert_eq!(curve.progress(1000.0), 1.0);
    }

    #[test]
    fn test_progress_nearest_neighbour_and_extrapolation() {
        let curve = ReferenceLapCurve::build(&session(), 1000.0).unwrap();
        assert_eq!(curve.progress(60.0), 0.25);
        assert_eq!(curve.progress(90.0), 0.5);
        assert_eq!(curve.progress(-20.0), 0.0);
        assert_eq!(curve.progress(5000.0), 1.0);
    }

    #[test]
    fn test_progress_tie_resolves_to_smaller_distance() {
        let curve = ReferenceLapCurve::build(&session(), 1000.0).unwrap();
        // 25 m sits halfway between the 0 m and 50 m points
        assert_eq!(curve.progress(25.0), 0.0);
    }

    #[test]
    fn test_unparsable_clock_falls_back_to_index() {
        let mut session = session();
        session.telemetry[3].time = "later".to_string();
        let curve = ReferenceLapCurve::build(&session, 1000.0).unwrap();
        assert_eq!(curve.progress(100.0), 0.5);
    }

    #[test]
    fn test_progress_is_monotonic_with_out_of_order_distances() {
        let mut lap_times = BTreeMap::new();
        lap_times.insert("1".to_string(), [(1, 4.0)].into_iter().collect());
        let session = Session {
            telemetry: vec![
                sample("0:00:00", 1, 0.0),
                sample("0:00:01", 1, 100.0),
                sample("0:00:02", 1, 90.0),
                sample("0:00:03", 1, 200.0),
            ],
            lap_times,
            ..Default::default()
        };

        let curve = ReferenceLapCurve::build(&session, 1000.0).unwrap();
        assert_eq!(curve.progress(90.0), 0.5);
        assert_eq!(curve.progress(100.0), 0.5);

        let mut last = 0.0;
        for step in 0..=50 {
            let p = curve.progress(step as f64 * 5.0);
            assert!(p >= last, "progress fell from {} to {} at {} m", last, p, step * 5);
            last = p;
        }
    }

    #[test]
    fn test_no_completed_laps_is_none() {
        let mut session = session();
        session.lap_times.clear();
        assert!(ReferenceLapCurve::build(&session, 1000.0).is_none());
    }

    #[test]
    fn test_empty_curve_is_linear() {
        let mut session = session();
        for sample in &mut session.telemetry {
            for pos in sample.drivers.values_mut() {
                pos.distance = None;
            }
        }
        let curve = ReferenceLapCurve::build(&session, 4000.0).unwrap();
        assert!(curve.is_empty());
        assert_eq!(curve.progress(1000.0), 0.25);
        assert_eq!(curve.progress(5000.0), 1.0);
    }
}
