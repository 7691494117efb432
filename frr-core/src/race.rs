//! Race state derived from a single sample
//!
//! Everything here is recomputed per displayed sample. The fastest lap in
//! particular is "so far": only laps at or before the current lap count.

use crate::model::{DriverId, DriverPosition, LapNumber, RgbColor, Sample, Session};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Lap times closer than this are treated as equal
pub const LAP_TIME_TOLERANCE: f64 = 1e-3;

/// Current race lap: the highest lap any driver reports, 0 when none does
pub fn current_lap(sample: &Sample) -> LapNumber {
    sample
        .drivers
        .values()
        .filter_map(|pos| pos.lap)
        .max()
        .unwrap_or(0)
}

/// Race order for a sample
///
/// Drivers without both lap and distance are left out. Higher lap always
/// ranks first; within a lap the higher distance does. The sort is stable, so
/// exact ties keep driver-id order.
pub fn leaderboard(sample: &Sample) -> Vec<(&DriverId, &DriverPosition)> {
    let mut ranked: Vec<_> = sample
        .drivers
        .iter()
        .filter(|(_, pos)| pos.is_ranked())
        .collect();
    ranked.sort_by(|(_, a), (_, b)| compare_race_position(a, b));
    ranked
}

/// Ordering that puts the driver further ahead first
pub fn compare_race_position(a: &DriverPosition, b: &DriverPosition) -> Ordering {
    let lap_a = a.lap.unwrap_or(0);
    let lap_b = b.lap.unwrap_or(0);
    lap_b.cmp(&lap_a).then_with(|| {
        b.distance
            .unwrap_or(0.0)
            .total_cmp(&a.distance.unwrap_or(0.0))
    })
}

/// Fastest recorded lap and who set it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestLap {
    pub driver: DriverId,
    pub lap: LapNumber,
    pub seconds: f64,
}

/// Fastest lap among laps `1..=up_to_lap`, `None` before the first lap
///
/// Ties keep the first driver in id order.
pub fn fastest_lap(session: &Session, up_to_lap: LapNumber) -> Option<FastestLap> {
    if up_to_lap == 0 {
        return None;
    }

    let mut best: Option<FastestLap> = None;
    for (driver, laps) in &session.lap_times {
        for (&lap, &seconds) in laps.range(1..=up_to_lap) {
            if !seconds.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |b| seconds < b.seconds) {
                best = Some(FastestLap {
                    driver: driver.clone(),
                    lap,
                    seconds,
                });
            }
        }
    }
    best
}

/// Most recent recorded lap time at or before `lap`, scanning backwards
///
/// Pit laps often have no recorded time; the scan steps over them.
pub fn last_completed_lap(
    session: &Session,
    driver: &str,
    lap: LapNumber,
) -> Option<(LapNumber, f64)> {
    if lap == 0 {
        return None;
    }
    session
        .lap_times
        .get(driver)?
        .range(1..=lap)
        .rev()
        .find(|(_, secs)| secs.is_finite())
        .map(|(&lap, &secs)| (lap, secs))
}

/// Best recorded lap for `driver` among laps `1..=current_lap`
pub fn personal_best(session: &Session, driver: &str, current_lap: LapNumber) -> Option<f64> {
    if current_lap == 0 {
        return None;
    }
    session
        .lap_times
        .get(driver)?
        .range(1..=current_lap)
        .map(|(_, &secs)| secs)
        .filter(|secs| secs.is_finite())
        .reduce(f64::min)
}

/// Coloring class of a displayed lap time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapTimeClass {
    OverallFastest,
    PersonalFastest,
    Normal,
}

pub fn same_lap_time(a: f64, b: f64) -> bool {
    (a - b).abs() < LAP_TIME_TOLERANCE
}

impl LapTimeClass {
    /// Class of a driver's last lap
    pub fn of_last_lap(time: f64, overall: Option<f64>, personal: Option<f64>) -> Self {
        if overall.is_some_and(|best| same_lap_time(time, best)) {
            Self::OverallFastest
        } else if personal.is_some_and(|best| same_lap_time(time, best)) {
            Self::PersonalFastest
        } else {
            Self::Normal
        }
    }

    /// Class of a driver's personal best; never `PersonalFastest`
    pub fn of_personal_best(time: f64, overall: Option<f64>) -> Self {
        if overall.is_some_and(|best| same_lap_time(time, best)) {
            Self::OverallFastest
        } else {
            Self::Normal
        }
    }
}

/// One row of the leaderboard as the sink displays it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub driver: DriverId,
    pub name: String,
    pub color: RgbColor,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    pub lap: Option<LapNumber>,
    pub distance: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    pub last_lap: Option<f64>,
    pub last_lap_class: Option<LapTimeClass>,
    pub personal_best: Option<f64>,
    pub personal_best_class: Option<LapTimeClass>,
}

/// Full leaderboard rows for a sample, with lap-time coloring
pub fn leaderboard_entries(session: &Session, sample: &Sample) -> Vec<LeaderboardEntry> {
    let lap = current_lap(sample);
    let overall = fastest_lap(session, lap).map(|f| f.seconds);

    leaderboard(sample)
        .into_iter()
        .enumerate()
        .map(|(i, (driver, pos))| {
            let last_lap = last_completed_lap(session, driver, pos.lap.unwrap_or(0))
                .map(|(_, secs)| secs);
            let personal_best = personal_best(session, driver, lap);

            LeaderboardEntry {
                position: i + 1,
                driver: driver.clone(),
                name: session.driver_name(driver),
                color: session.driver_color(driver),
                team: session.drivers.get(driver).and_then(|m| m.team.clone()),
                lap: pos.lap,
                distance: pos.distance,
                speed: pos.speed,
                last_lap,
                last_lap_class: last_lap
                    .map(|t| LapTimeClass::of_last_lap(t, overall, personal_best)),
                personal_best,
                personal_best_class: personal_best
                    .map(|t| LapTimeClass::of_personal_best(t, overall)),
            }
        })
        .collect()
}
