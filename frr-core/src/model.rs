//! Race session data model
//!
//! Defines the immutable payload a data provider hands over for one race
//! session: the driver roster, the 1 Hz telemetry samples, recorded lap times,
//! the track outline and the track-status / race-control feeds.
//!
//! Field names follow the JSON produced by the data backend, so a cached
//! payload deserializes directly into [`Session`]. Every optional field uses
//! `Option<T>` and `#[serde(default)]` so partial payloads still decode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Driver identifier as used by the timing feed (car number, e.g. "44")
pub type DriverId = String;

/// Lap number, starting at 1
pub type LapNumber = u32;

/// Recorded lap times in seconds, per driver and lap
pub type LapTimes = BTreeMap<DriverId, BTreeMap<LapNumber, f64>>;

/// Complete payload for one race session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub gp: Option<String>,

    /// Session code ("R" for race)
    #[serde(default)]
    pub session: Option<String>,

    /// Static roster, keyed by driver id
    #[serde(default)]
    pub drivers: BTreeMap<DriverId, DriverMeta>,

    /// Samples ordered by time; the index doubles as the logical timeline
    #[serde(default)]
    pub telemetry: Vec<Sample>,

    #[serde(default)]
    pub lap_times: LapTimes,

    /// Lap length in meters, when the backend knows it
    #[serde(default)]
    pub track_length: Option<f64>,

    #[serde(default)]
    pub total_laps: u32,

    #[serde(default)]
    pub track_status: Vec<StatusEvent>,

    #[serde(default)]
    pub race_control_messages: Vec<RaceControlMessage>,

    #[serde(default)]
    pub total_duration: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,
}

impl Session {
    /// Number of samples on the timeline
    pub fn len(&self) -> usize {
        self.telemetry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.telemetry.is_empty()
    }

    /// Look up a driver's display name, falling back to "Driver {id}"
    pub fn driver_name(&self, driver: &str) -> String {
        self.drivers
            .get(driver)
            .map(|meta| meta.name.clone())
            .unwrap_or_else(|| format!("Driver {}", driver))
    }

    /// Look up a driver's color, falling back to grey
    pub fn driver_color(&self, driver: &str) -> RgbColor {
        self.drivers
            .get(driver)
            .map(|meta| meta.color)
            .unwrap_or_default()
    }
}

/// One timestamped snapshot of every driver's telemetry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Time of day, `H:MM:SS` (legacy payloads carry fractions and day prefixes)
    pub time: String,

    #[serde(default)]
    pub drivers: BTreeMap<DriverId, DriverPosition>,
}

/// Raw per-driver telemetry in a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverPosition {
    #[serde(default)]
    pub x: Option<f64>,

    #[serde(default)]
    pub y: Option<f64>,

    /// Distance in meters (cumulative over the race or per lap, depending on source)
    #[serde(default)]
    pub distance: Option<f64>,

    #[serde(default)]
    pub lap: Option<LapNumber>,

    /// Speed in km/h, passed through to the sink
    #[serde(default)]
    pub speed: Option<f64>,
}

/// How a driver can be placed on a map
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Raw world coordinates are available
    Known { x: f64, y: f64 },
    /// Only the distance travelled is available
    ByDistance { distance: f64 },
    /// Neither; the driver is skipped for this sample
    Unknown,
}

impl DriverPosition {
    /// Classify the position, preferring explicit coordinates over distance
    pub fn placement(&self) -> Placement {
        match (self.x, self.y, self.distance) {
            (Some(x), Some(y), _) if x.is_finite() && y.is_finite() => Placement::Known { x, y },
            (_, _, Some(distance)) if distance.is_finite() => Placement::ByDistance { distance },
            _ => Placement::Unknown,
        }
    }

    /// Whether the driver takes part in the race order for this sample
    pub fn is_ranked(&self) -> bool {
        self.lap.is_some() || self.distance.is_some()
    }
}

/// Static per-driver metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverMeta {
    pub name: String,

    #[serde(default)]
    pub team: Option<String>,

    #[serde(default)]
    pub color: RgbColor,
}

/// 24-bit color, (de)serialized as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const GREY: RgbColor = RgbColor::new(0x80, 0x80, 0x80);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::GREY
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid color: {}", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("invalid color {}: {}", s, e))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    /// Malformed colors degrade to grey instead of failing the whole payload
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

/// 2D point in the outline's coordinate space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Track outline as delivered by the data provider
///
/// `path` is normalized (roughly -0.5..0.5) and ordered in traversal order; the
/// first and last points are implicitly connected. `center`/`scale` describe
/// the normalization so raw telemetry coordinates can be mapped the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackOutline {
    #[serde(default)]
    pub path: Vec<Point>,

    #[serde(default)]
    pub center: Option<Point>,

    #[serde(default)]
    pub scale: Option<f64>,

    #[serde(default)]
    pub bounds: Option<Bounds>,

    #[serde(default)]
    pub sectors: Option<Sectors>,
}

/// Raw-coordinate bounds of the outline before normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
}

/// Sector boundaries in meters from the start/finish line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sectors {
    pub track_length: f64,
    pub sector2_start: f64,
    pub sector3_start: f64,
}

/// Track status change (green, yellow, safety car, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub time: String,

    /// Status code as sent by the feed
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Message from race control
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceControlMessage {
    pub time: String,

    #[serde(default)]
    pub category: Option<String>,

    pub message: String,
}

/// Entry of the race list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    pub year: i32,
    pub gp: String,
    pub name: String,

    #[serde(default)]
    pub date: Option<String>,
}
