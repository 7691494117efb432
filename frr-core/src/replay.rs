//! Replay controller
//!
//! Owns the loaded [`RaceStore`] and the [`PlaybackScrubber`] and exposes
//! everything a presentation sink needs for one displayed moment.
//!
//! Every load or clear bumps a generation counter. Frame-clock callbacks
//! capture the generation they were scheduled under and pass it back to
//! [`Replay::tick`], so a tick that outlived its session is rejected instead
//! of advancing the replacement.

use crate::chart::LapTimeChart;
use crate::error::ReplayError;
use crate::model::{
    DriverId, LapNumber, RaceControlMessage, RgbColor, Sample, Session, TrackOutline,
};
use crate::projection::{
    CircularPoint, QuarterMarker, ScreenPoint, SectorMarker, StartFinishMarker, Viewport,
};
use crate::race::{self, FastestLap, LeaderboardEntry};
use crate::scrubber::{PlaybackScrubber, PlaybackSpeed, PlaybackState};
use crate::status::{self, CurrentStatus};
use crate::store::RaceStore;
use crate::time::format_clock;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

/// Result of a frame-clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Scheduled under a previous session; nothing happened
    Stale,
    /// Not playing, or no time elapsed
    Idle,
    Advanced,
    /// Reached the last sample and paused
    Finished,
}

pub struct Replay {
    store: Option<RaceStore>,
    scrubber: PlaybackScrubber,
    generation: u64,
    track_view: Viewport,
    circular_view: Viewport,
}

impl Replay {
    pub fn new() -> Self {
        Self::with_viewports(Viewport::TRACK_MAP, Viewport::CIRCULAR_MAP)
    }

    pub fn with_viewports(track_view: Viewport, circular_view: Viewport) -> Self {
        Self {
            store: None,
            scrubber: PlaybackScrubber::empty(),
            generation: 0,
            track_view,
            circular_view,
        }
    }

    /// Replace the loaded session; playback restarts paused at index 0
    ///
    /// A session without samples is rejected and leaves the replay empty.
    pub fn load(&mut self, session: Session, outline: TrackOutline) -> Result<u64, ReplayError> {
        if session.is_empty() {
            self.clear();
            return Err(ReplayError::EmptySession);
        }

        let store = RaceStore::new(session, outline, self.track_view, self.circular_view);
        self.scrubber.reset(store.len());
        self.store = Some(store);
        self.generation += 1;
        Ok(self.generation)
    }

    /// Drop the loaded session
    pub fn clear(&mut self) -> u64 {
        self.store = None;
        self.scrubber.reset(0);
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&RaceStore> {
        self.store.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.store.as_ref().map(RaceStore::session)
    }

    pub fn scrubber(&self) -> &PlaybackScrubber {
        &self.scrubber
    }

    pub fn playback(&self) -> PlaybackState {
        self.scrubber.state()
    }

    // ---- sink queries ----

    pub fn sample_at(&self, index: f64) -> Option<&Sample> {
        self.store.as_ref()?.sample_at(index)
    }

    pub fn current_sample(&self) -> Option<&Sample> {
        self.sample_at(self.scrubber.index())
    }

    pub fn current_lap(&self) -> LapNumber {
        self.current_sample().map(race::current_lap).unwrap_or(0)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        match (self.session(), self.current_sample()) {
            (Some(session), Some(sample)) => race::leaderboard_entries(session, sample),
            _ => Vec::new(),
        }
    }

    /// Fastest lap so far, as of the displayed sample
    pub fn fastest_lap(&self) -> Option<FastestLap> {
        race::fastest_lap(self.session()?, self.current_lap())
    }

    /// Track-map position of `driver` in the displayed sample
    pub fn cartesian_point(&self, driver: &str) -> Option<ScreenPoint> {
        let store = self.store.as_ref()?;
        let position = self.current_sample()?.drivers.get(driver)?;
        store.cartesian()?.project(position)
    }

    /// Clock-face position of `driver` in the displayed sample
    pub fn circular_point(&self, driver: &str) -> Option<CircularPoint> {
        let store = self.store.as_ref()?;
        let position = self.current_sample()?.drivers.get(driver)?;
        store.circular()?.project(position)
    }

    // ---- scrubber controls ----

    pub fn play(&mut self) -> bool {
        self.scrubber.play()
    }

    pub fn pause(&mut self) -> bool {
        self.scrubber.pause()
    }

    pub fn toggle(&mut self) -> bool {
        self.scrubber.toggle()
    }

    pub fn seek(&mut self, percent: f64) {
        self.scrubber.seek(percent)
    }

    pub fn seek_index(&mut self, index: f64) {
        self.scrubber.seek_index(index)
    }

    pub fn rewind(&mut self) {
        self.scrubber.rewind()
    }

    pub fn cycle_speed(&mut self) -> PlaybackSpeed {
        self.scrubber.cycle_speed()
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.scrubber.set_speed(speed)
    }

    /// Advance playback for a frame scheduled under `generation`
    pub fn tick(&mut self, generation: u64, now: Duration) -> TickOutcome {
        if generation != self.generation {
            return TickOutcome::Stale;
        }
        if !self.scrubber.tick(now) {
            return TickOutcome::Idle;
        }
        if self.scrubber.is_playing() {
            TickOutcome::Advanced
        } else {
            TickOutcome::Finished
        }
    }

    // ---- frame assembly ----

    /// Everything the sink draws for the displayed moment
    pub fn frame(&self) -> Option<ReplayFrame> {
        self.frame_at(self.scrubber.index())
    }

    /// Frame for an arbitrary index without moving the scrubber
    pub fn frame_at(&self, index: f64) -> Option<ReplayFrame> {
        let store = self.store.as_ref()?;
        let sample = store.sample_at(index)?;
        let session = store.session();
        let lap = race::current_lap(sample);
        let now = store.seconds_at(index);

        let identity = |id: &DriverId| (session.driver_name(id), session.driver_color(id));

        let track: Vec<DriverMarker> = store
            .cartesian()
            .map(|frame| {
                sample
                    .drivers
                    .iter()
                    .filter_map(|(id, pos)| {
                        let at = frame.project(pos)?;
                        let (name, color) = identity(id);
                        Some(DriverMarker {
                            driver: id.clone(),
                            name,
                            color,
                            at,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let circular: Vec<CircularMarker> = store
            .circular()
            .map(|frame| {
                sample
                    .drivers
                    .iter()
                    .filter_map(|(id, pos)| {
                        let point = frame.project(pos)?;
                        let (name, color) = identity(id);
                        Some(CircularMarker {
                            driver: id.clone(),
                            name,
                            color,
                            point,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(ReplayFrame {
            generation: self.generation,
            index,
            sample: index.floor() as usize,
            time: sample.time.clone(),
            clock: format_clock(&sample.time),
            progress: index / store.len() as f64 * 100.0,
            playback: self.scrubber.state(),
            lap: LapCounter {
                current: lap,
                total: session.total_laps,
            },
            leaderboard: race::leaderboard_entries(session, sample),
            fastest_lap: race::fastest_lap(session, lap),
            track,
            circular,
            status: status::current_status(session, now),
            messages: status::recent_messages(session, now)
                .into_iter()
                .cloned()
                .collect(),
            chart: LapTimeChart::build(session, lap),
        })
    }

    /// Static geometry of both maps for the loaded session
    pub fn track_layout(&self) -> Option<TrackLayout> {
        let store = self.store.as_ref()?;

        let (path, start_finish, sectors) = match store.cartesian() {
            Some(frame) => (
                frame.track_path(),
                Some(frame.start_finish()),
                store
                    .outline()
                    .sectors
                    .map(|s| frame.sector_markers(&s))
                    .unwrap_or_default(),
            ),
            None => (Vec::new(), None, Vec::new()),
        };

        let circular = store.circular().map(|frame| {
            let (from, to) = frame.start_finish();
            CircularLayout {
                center: frame.center(),
                radius: frame.radius(),
                track_length: frame.track_length(),
                reference_lap: frame.curve().reference().clone(),
                start_finish: [from, to],
                quarters: frame.quarter_markers(),
            }
        });

        Some(TrackLayout {
            generation: self.generation,
            track_view: self.track_view,
            circular_view: self.circular_view,
            path,
            start_finish,
            sectors,
            circular,
        })
    }
}

impl Default for Replay {
    fn default() -> Self {
        Self::new()
    }
}

/// Lap counter, `current / total`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LapCounter {
    pub current: LapNumber,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverMarker {
    pub driver: DriverId,
    pub name: String,
    pub color: RgbColor,
    pub at: ScreenPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularMarker {
    pub driver: DriverId,
    pub name: String,
    pub color: RgbColor,
    #[serde(flatten)]
    pub point: CircularPoint,
}

/// One displayed moment of the replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFrame {
    pub generation: u64,
    /// Fractional scrubber index
    pub index: f64,
    /// Index of the displayed sample
    pub sample: usize,
    /// Raw sample time
    pub time: String,
    /// `HH:MM:SS`
    pub clock: String,
    /// Percent of the timeline played
    pub progress: f64,
    pub playback: PlaybackState,
    pub lap: LapCounter,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub fastest_lap: Option<FastestLap>,
    pub track: Vec<DriverMarker>,
    pub circular: Vec<CircularMarker>,
    pub status: CurrentStatus,
    pub messages: Vec<RaceControlMessage>,
    pub chart: Option<LapTimeChart>,
}

/// Keys kept whatever the mask says
const ALWAYS_INCLUDED: &[&str] = &["generation", "index", "sample", "time", "clock", "progress"];

impl ReplayFrame {
    /// Serialize this frame respecting the given mask
    ///
    /// Without a mask, or with `all`, everything is serialized. Otherwise only
    /// the requested sections plus the timeline keys are kept.
    pub fn to_json_filtered(&self, mask: Option<&FrameMask>) -> serde_json::Result<serde_json::Value> {
        let value = serde_json::to_value(self)?;
        let Some(mask) = mask.filter(|m| !m.is_all()) else {
            return Ok(value);
        };

        let serde_json::Value::Object(map) = value else {
            return Ok(value);
        };
        let filtered = map
            .into_iter()
            .filter(|(key, _)| ALWAYS_INCLUDED.contains(&key.as_str()) || mask.includes(key))
            .collect();
        Ok(serde_json::Value::Object(filtered))
    }
}

/// Selection of frame sections, parsed from a comma-separated list
///
/// Names are case-insensitive; `all` selects everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMask {
    sections: HashSet<String>,
    include_all: bool,
}

impl FrameMask {
    pub const SECTIONS: &'static [&'static str] = &[
        "playback",
        "lap",
        "leaderboard",
        "fastest_lap",
        "track",
        "circular",
        "status",
        "messages",
        "chart",
    ];

    pub fn all() -> Self {
        Self {
            sections: HashSet::new(),
            include_all: true,
        }
    }

    pub fn parse(sections: &str) -> Self {
        let sections: HashSet<String> = sections
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            include_all: sections.contains("all"),
            sections,
        }
    }

    pub fn includes(&self, section: &str) -> bool {
        self.include_all || self.sections.contains(&section.to_lowercase())
    }

    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FrameMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Geometry that does not change during playback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackLayout {
    pub generation: u64,
    pub track_view: Viewport,
    pub circular_view: Viewport,
    /// Outline in screen space; empty without an outline
    pub path: Vec<ScreenPoint>,
    pub start_finish: Option<StartFinishMarker>,
    pub sectors: Vec<SectorMarker>,
    /// Absent when the circular projection is undefined
    pub circular: Option<CircularLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularLayout {
    pub center: ScreenPoint,
    pub radius: f64,
    pub track_length: f64,
    pub reference_lap: FastestLap,
    pub start_finish: [ScreenPoint; 2],
    pub quarters: Vec<QuarterMarker>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriverMeta, DriverPosition, Point, StatusEvent};
    use std::collections::BTreeMap;

    fn position(lap: LapNumber, distance: f64) -> DriverPosition {
        DriverPosition {
            lap: Some(lap),
            distance: Some(distance),
            ..Default::default()
        }
    }

    /// Two drivers over 20 s on a 1000 m track; lap times recorded for lap 1
    fn session() -> Session {
        let telemetry = (0..20)
            .map(|i| {
                let t = i as f64;
                let mut drivers = BTreeMap::new();
                drivers.insert("1".to_string(), position(1 + i / 10, t * 100.0));
                drivers.insert("2".to_string(), position(1 + i / 11, t * 90.0));
                Sample {
                    time: format!("0:00:{:02}", i),
                    drivers,
                }
            })
            .collect();

        let mut lap_times = BTreeMap::new();
        lap_times.insert("1".to_string(), [(1, 10.0)].into_iter().collect());
        lap_times.insert("2".to_string(), [(1, 11.1)].into_iter().collect());

        let mut drivers = BTreeMap::new();
        drivers.insert(
            "1".to_string(),
            DriverMeta {
                name: "VER".to_string(),
                team: None,
                color: RgbColor::new(0x1E, 0x41, 0xFF),
            },
        );

        Session {
            drivers,
            telemetry,
            lap_times,
            track_length: Some(1000.0),
            total_laps: 2,
            track_status: vec![StatusEvent {
                time: "0:00:05".to_string(),
                status: Some("2".to_string()),
                message: Some("Yellow".to_string()),
            }],
            ..Default::default()
        }
    }

    fn outline() -> TrackOutline {
        TrackOutline {
            path: (0..10)
                .map(|i| {
                    let a = i as f64 / 10.0 * std::f64::consts::TAU;
                    Point::new(a.cos() * 0.5, a.sin() * 0.5)
                })
                .collect(),
            ..Default::default()
        }
    }

    fn loaded() -> Replay {
        let mut replay = Replay::new();
        replay.load(session(), outline()).unwrap();
        replay
    }

    #[test]
    fn test_operations_without_session_are_noops() {
        let mut replay = Replay::new();
        assert!(!replay.play());
        replay.seek(50.0);
        replay.rewind();
        assert_eq!(replay.tick(0, Duration::from_secs(10)), TickOutcome::Idle);
        assert!(replay.frame().is_none());
        assert!(replay.track_layout().is_none());
        assert_eq!(replay.current_lap(), 0);
        assert!(replay.leaderboard().is_empty());
    }

    #[test]
    fn test_load_resets_playback_and_bumps_generation() {
        let mut replay = loaded();
        assert_eq!(replay.generation(), 1);
        replay.seek(50.0);
        replay.play();

        let generation = replay.load(session(), outline()).unwrap();
        assert_eq!(generation, 2);
        assert_eq!(replay.playback().index, 0.0);
        assert!(!replay.playback().playing);
    }

    #[test]
    fn test_empty_session_rejected_and_cleared() {
        let mut replay = loaded();
        let err = replay.load(Session::default(), outline()).unwrap_err();
        assert!(matches!(err, ReplayError::EmptySession));
        assert!(!replay.is_loaded());
        assert_eq!(replay.generation(), 2);
    }

    #[test]
    fn test_stale_tick_is_rejected() {
        let mut replay = loaded();
        let old = replay.generation();
        replay.play();
        replay.tick(old, Duration::ZERO);

        replay.load(session(), outline()).unwrap();
        replay.play();
        assert_eq!(replay.tick(old, Duration::from_secs(5)), TickOutcome::Stale);
        assert_eq!(replay.playback().index, 0.0);
    }

    #[test]
    fn test_tick_until_finished() {
        let mut replay = loaded();
        let generation = replay.generation();
        replay.play();
        assert_eq!(replay.tick(generation, Duration::ZERO), TickOutcome::Idle);
        assert_eq!(
            replay.tick(generation, Duration::from_secs(3)),
            TickOutcome::Advanced
        );
        assert_eq!(
            replay.tick(generation, Duration::from_secs(60)),
            TickOutcome::Finished
        );
        assert_eq!(replay.playback().index, 19.0);
    }

    #[test]
    fn test_sink_queries_follow_scrubber() {
        let mut replay = loaded();
        replay.seek_index(12.5);

        assert_eq!(replay.current_sample().unwrap().time, "0:00:12");
        assert_eq!(replay.current_lap(), 2);
        let order: Vec<_> = replay
            .leaderboard()
            .into_iter()
            .map(|e| e.driver)
            .collect();
        assert_eq!(order, vec!["1", "2"]);
        assert_eq!(replay.fastest_lap().unwrap().seconds, 10.0);
        assert!(replay.cartesian_point("1").is_some());
        assert!(replay.circular_point("2").is_some());
        assert!(replay.circular_point("44").is_none());
    }

    #[test]
    fn test_frame_contents() {
        let mut replay = loaded();
        replay.seek_index(6.0);
        let frame = replay.frame().unwrap();

        assert_eq!(frame.sample, 6);
        assert_eq!(frame.clock, "00:00:06");
        assert_eq!(frame.lap, LapCounter { current: 1, total: 2 });
        assert_eq!(frame.track.len(), 2);
        assert_eq!(frame.track[0].name, "VER");
        assert_eq!(frame.circular.len(), 2);
        assert_eq!(frame.status.condition, status::TrackCondition::Yellow);
        assert!(frame.fastest_lap.is_some());
        assert!(frame.chart.is_some());
        assert!((frame.progress - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_at_does_not_move_scrubber() {
        let replay = loaded();
        let frame = replay.frame_at(15.0).unwrap();
        assert_eq!(frame.sample, 15);
        assert_eq!(replay.playback().index, 0.0);
        assert!(replay.frame_at(25.0).is_none());
    }

    #[test]
    fn test_circular_undefined_before_first_lap_time() {
        let mut session = session();
        session.lap_times.clear();
        let mut replay = Replay::new();
        replay.load(session, outline()).unwrap();

        let frame = replay.frame().unwrap();
        assert!(frame.circular.is_empty());
        assert_eq!(frame.track.len(), 2);
        assert!(replay.track_layout().unwrap().circular.is_none());
    }

    #[test]
    fn test_track_layout() {
        let replay = loaded();
        let layout = replay.track_layout().unwrap();
        assert_eq!(layout.path.len(), 10);
        assert!(layout.start_finish.is_some());
        let circular = layout.circular.unwrap();
        assert_eq!(circular.radius, 100.0);
        assert_eq!(circular.reference_lap.driver, "1");
        assert_eq!(circular.quarters.len(), 3);
    }

    #[test]
    fn test_frame_mask_filters_sections() {
        let replay = loaded();
        let frame = replay.frame().unwrap();

        let mask: FrameMask = "Leaderboard, lap".parse().unwrap();
        let value = frame.to_json_filtered(Some(&mask)).unwrap();
        let keys: HashSet<_> = value.as_object().unwrap().keys().cloned().collect();
        assert!(keys.contains("leaderboard"));
        assert!(keys.contains("lap"));
        assert!(keys.contains("index"));
        assert!(keys.contains("time"));
        assert!(!keys.contains("track"));
        assert!(!keys.contains("chart"));

        let all = frame.to_json_filtered(Some(&FrameMask::parse("all"))).unwrap();
        assert!(all.get("track").is_some());
        let unmasked = frame.to_json_filtered(None).unwrap();
        assert_eq!(all, unmasked);
    }
}
