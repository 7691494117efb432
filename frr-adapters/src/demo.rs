//! Demo provider that generates a synthetic race for testing
//!
//! Simulates a small field lapping a closed circuit built from straights,
//! braking zones, corners and acceleration phases. Output is deterministic:
//! the same request always produces the same session, so it doubles as a
//! fixture for tests and benchmarks.

use anyhow::{bail, Result};
use frr_core::model::*;
use frr_core::provider::RaceDataProvider;
use std::collections::BTreeMap;

// =============================================================================
// Track definition: a sequence of segments that form a lap
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight, // Full throttle, top speed
    Braking,  // Heavy braking into a corner
    Corner,   // Constant curvature, the only segments that turn
    Accel,    // Accelerating out of a corner
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f64,     // seconds to traverse at reference pace
    target_speed: f64, // m/s at end of segment
    turn: f64,         // heading change in degrees (+ = left); corners only
}

/// A simple circuit: ~78s lap, turns sum to one full revolution
fn demo_track() -> Vec<TrackSegment> {
    use SegmentKind::*;
    let seg = |kind, duration, target_speed, turn| TrackSegment {
        kind,
        duration,
        target_speed,
        turn,
    };
    vec![
        // Start/finish straight
        seg(Straight, 8.0, 80.0, 0.0),
        // T1: heavy braking into a right-angle left
        seg(Braking, 2.5, 30.0, 0.0),
        seg(Corner, 3.5, 28.0, 90.0),
        seg(Accel, 3.0, 60.0, 0.0),
        seg(Straight, 5.0, 70.0, 0.0),
        // T2: fast sweeper
        seg(Braking, 1.5, 50.0, 0.0),
        seg(Corner, 4.0, 48.0, 75.0),
        seg(Accel, 2.5, 62.0, 0.0),
        // Back straight
        seg(Straight, 9.0, 82.0, 0.0),
        // T3: chicane
        seg(Braking, 2.5, 35.0, 0.0),
        seg(Corner, 2.0, 33.0, -40.0),
        seg(Corner, 2.0, 31.0, 55.0),
        seg(Accel, 3.0, 55.0, 0.0),
        seg(Straight, 6.0, 70.0, 0.0),
        // T4: hairpin
        seg(Braking, 3.0, 24.0, 0.0),
        seg(Corner, 4.5, 21.0, 120.0),
        seg(Accel, 4.0, 58.0, 0.0),
        seg(Straight, 5.0, 75.0, 0.0),
        // T5: flat-out kink onto the main straight
        seg(Corner, 3.0, 65.0, 60.0),
        seg(Straight, 4.0, 80.0, 0.0),
    ]
}

/// Segment index where sector 2 starts (T2 braking)
const SECTOR2_SEGMENT: usize = 5;

/// Segment index where sector 3 starts (T4 braking)
const SECTOR3_SEGMENT: usize = 14;

// =============================================================================
// Reference lap: distance and speed over time at reference pace
// =============================================================================

const PROFILE_STEP: f64 = 0.05;

struct LapProfile {
    /// Distance at `t = i * PROFILE_STEP`
    distance: Vec<f64>,
    /// Speed over `[i, i + 1)`
    speed: Vec<f64>,
    /// Distance at which each segment starts
    segment_starts: Vec<f64>,
    duration: f64,
    length: f64,
}

impl LapProfile {
    fn build(track: &[TrackSegment]) -> Self {
        let mut distance = vec![0.0];
        let mut speed = Vec::new();
        let mut segment_starts = Vec::with_capacity(track.len());
        let mut travelled = 0.0;

        for (i, seg) in track.iter().enumerate() {
            segment_starts.push(travelled);
            let prev_target_speed = track[(i + track.len() - 1) % track.len()].target_speed;

            let steps = (seg.duration / PROFILE_STEP).round().max(1.0) as usize;
            let dt = seg.duration / steps as f64;
            for step in 0..steps {
                let seg_t = (step as f64 + 0.5) / steps as f64;
                let v = lerp(prev_target_speed, seg.target_speed, smoothstep(seg_t));
                travelled += v * dt;
                distance.push(travelled);
                speed.push(v);
            }
        }

        Self {
            duration: speed.len() as f64 * PROFILE_STEP,
            length: travelled,
            distance,
            speed,
            segment_starts,
        }
    }

    /// In-lap distance and speed `elapsed` seconds into a reference lap
    fn at(&self, elapsed: f64) -> (f64, f64) {
        let f = (elapsed.clamp(0.0, self.duration) / PROFILE_STEP).min(self.speed.len() as f64);
        let i = (f.floor() as usize).min(self.speed.len() - 1);
        let frac = f - i as f64;
        (
            lerp(self.distance[i], self.distance[i + 1], frac),
            self.speed[i],
        )
    }

    fn segment_length(&self, index: usize) -> f64 {
        let end = self
            .segment_starts
            .get(index + 1)
            .copied()
            .unwrap_or(self.length);
        end - self.segment_starts[index]
    }
}

// =============================================================================
// Circuit geometry: centerline integrated from the segment headings
// =============================================================================

const GEOMETRY_STEP: f64 = 5.0;

/// World frame: decimeters around an arbitrary origin, as timing feeds use
const WORLD_SCALE: f64 = 10.0;
const WORLD_ORIGIN: (f64, f64) = (-1450.0, 2275.0);

struct Circuit {
    /// Centerline in world coordinates, open polyline from the start line
    points: Vec<Point>,
    /// Arc length of each point
    arc: Vec<f64>,
    length: f64,
}

impl Circuit {
    fn build(track: &[TrackSegment], profile: &LapProfile) -> Self {
        let mut heading: f64 = 0.0;
        let (mut x, mut y) = (0.0, 0.0);
        let mut points = vec![Point::new(x, y)];
        let mut arc = vec![0.0];
        let mut s = 0.0;

        for (i, seg) in track.iter().enumerate() {
            let seg_len = profile.segment_length(i);
            let steps = (seg_len / GEOMETRY_STEP).ceil().max(1.0) as usize;
            let ds = seg_len / steps as f64;
            let rate = match seg.kind {
                SegmentKind::Corner => seg.turn.to_radians() / seg_len,
                _ => 0.0,
            };
            for _ in 0..steps {
                heading += rate * ds / 2.0;
                x += heading.cos() * ds;
                y += heading.sin() * ds;
                heading += rate * ds / 2.0;
                s += ds;
                points.push(Point::new(x, y));
                arc.push(s);
            }
        }

        // Spread the closing gap along the lap so the loop meets itself
        let (gap_x, gap_y) = (x, y);
        for (p, s) in points.iter_mut().zip(&arc) {
            let share = s / profile.length;
            p.x = (p.x - gap_x * share) * WORLD_SCALE + WORLD_ORIGIN.0;
            p.y = (p.y - gap_y * share) * WORLD_SCALE + WORLD_ORIGIN.1;
        }

        Self {
            points,
            arc,
            length: profile.length,
        }
    }

    /// World position at an in-lap distance
    fn position_at(&self, distance: f64) -> Point {
        let d = distance.rem_euclid(self.length);
        let upper = self.arc.partition_point(|s| *s <= d).min(self.arc.len() - 1);
        if upper == 0 {
            return self.points[0];
        }
        let (s0, s1) = (self.arc[upper - 1], self.arc[upper]);
        let t = if s1 > s0 { (d - s0) / (s1 - s0) } else { 0.0 };
        let (a, b) = (self.points[upper - 1], self.points[upper]);
        Point::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
    }

    /// Outline normalized the way the data backend does it
    fn outline(&self, points: usize, sectors: Sectors) -> TrackOutline {
        let raw: Vec<Point> = (0..points)
            .map(|i| self.position_at(i as f64 / points as f64 * self.length))
            .collect();

        let bounds = raw.iter().fold(
            Bounds {
                min_x: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                min_y: f64::INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, p| Bounds {
                min_x: b.min_x.min(p.x),
                max_x: b.max_x.max(p.x),
                min_y: b.min_y.min(p.y),
                max_y: b.max_y.max(p.y),
            },
        );
        let center = Point::new(
            (bounds.min_x + bounds.max_x) / 2.0,
            (bounds.min_y + bounds.max_y) / 2.0,
        );
        let scale = (bounds.max_x - bounds.min_x).max(bounds.max_y - bounds.min_y);

        let path = raw
            .iter()
            .map(|p| {
                if scale > 0.0 {
                    Point::new(-(p.x - center.x) / scale, (p.y - center.y) / scale)
                } else {
                    Point::default()
                }
            })
            .collect();

        TrackOutline {
            path,
            center: Some(center),
            scale: Some(scale),
            bounds: Some(bounds),
            sectors: Some(sectors),
        }
    }
}

// =============================================================================
// Field and race timeline
// =============================================================================

struct DemoDriver {
    id: &'static str,
    name: &'static str,
    team: &'static str,
    color: RgbColor,
    /// Lap time multiplier against reference pace
    pace: f64,
}

fn demo_field() -> Vec<DemoDriver> {
    let driver = |id, name, team, color: u32, pace| DemoDriver {
        id,
        name,
        team,
        color: RgbColor::new((color >> 16) as u8, (color >> 8) as u8, color as u8),
        pace,
    };
    vec![
        driver("1", "VER", "Red Bull Racing", 0x3671C6, 1.000),
        driver("4", "NOR", "McLaren", 0xFF8000, 1.001),
        driver("16", "LEC", "Ferrari", 0xE8002D, 1.002),
        driver("81", "PIA", "McLaren", 0xFF8000, 1.003),
        driver("44", "HAM", "Mercedes", 0x27F4D2, 1.004),
        driver("14", "ALO", "Aston Martin", 0x229971, 1.008),
    ]
}

pub const DEMO_YEAR: i32 = 2024;
pub const DEMO_GP: &str = "Demo";
pub const DEFAULT_LAPS: u32 = 12;

/// Session clock at lights out
const SESSION_START_SECS: u64 = 3_900;

/// Grid gap at the start, seconds per position
const GRID_DELAY: f64 = 0.4;

/// Driver who pits, and on which lap
const PIT_DRIVER: &str = "44";
const PIT_LAP: u32 = 5;
const PIT_LOSS: f64 = 22.0;

/// Safety-car window, seconds after lights out
const SAFETY_CAR: (f64, f64) = (250.0, 340.0);
const SAFETY_CAR_PACE: f64 = 1.3;

const OUTLINE_POINTS: usize = 240;

/// Lap start times and durations for one driver
struct Stint {
    starts: Vec<f64>,
    durations: Vec<f64>,
}

impl Stint {
    fn finish(&self) -> f64 {
        match (self.starts.last(), self.durations.last()) {
            (Some(start), Some(duration)) => start + duration,
            _ => 0.0,
        }
    }
}

// =============================================================================
// DemoProvider
// =============================================================================

pub struct DemoProvider {
    profile: LapProfile,
    circuit: Circuit,
    laps: u32,
}

impl DemoProvider {
    pub fn new() -> Self {
        Self::with_laps(DEFAULT_LAPS)
    }

    /// Race distance in laps, at least one
    pub fn with_laps(laps: u32) -> Self {
        let track = demo_track();
        let profile = LapProfile::build(&track);
        let circuit = Circuit::build(&track, &profile);
        Self {
            profile,
            circuit,
            laps: laps.max(1),
        }
    }

    /// Lap length in meters
    pub fn track_length(&self) -> f64 {
        self.profile.length
    }

    fn sectors(&self) -> Sectors {
        Sectors {
            track_length: self.profile.length,
            sector2_start: self.profile.segment_starts[SECTOR2_SEGMENT],
            sector3_start: self.profile.segment_starts[SECTOR3_SEGMENT],
        }
    }

    fn stint(&self, grid_index: usize, driver: &DemoDriver) -> Stint {
        let mut starts = Vec::with_capacity(self.laps as usize);
        let mut durations = Vec::with_capacity(self.laps as usize);
        let mut t = grid_index as f64 * GRID_DELAY;

        for lap in 1..=self.laps {
            let seed = (grid_index * 100 + lap as usize) as f64;
            let mut duration = self.profile.duration * driver.pace * (1.0 + jitter(seed, 0.004));
            if t >= SAFETY_CAR.0 && t < SAFETY_CAR.1 {
                duration *= SAFETY_CAR_PACE;
            }
            if driver.id == PIT_DRIVER && lap == PIT_LAP {
                duration += PIT_LOSS;
            }
            starts.push(t);
            durations.push(duration);
            t += duration;
        }
        Stint { starts, durations }
    }

    /// Position of a driver `t` seconds after lights out
    fn position(&self, stint: &Stint, t: f64) -> DriverPosition {
        let finish = stint.finish();
        if t >= finish {
            let distance = self.laps as f64 * self.profile.length;
            return self.placed(distance, self.laps, 0.0);
        }

        let lap_index = stint.starts.partition_point(|start| *start <= t).max(1) - 1;
        let start = stint.starts[lap_index];
        let duration = stint.durations[lap_index];
        let slowdown = duration / self.profile.duration;

        let (in_lap, speed) = self.profile.at((t - start).max(0.0) / slowdown);
        let distance = lap_index as f64 * self.profile.length + in_lap;
        self.placed(distance, lap_index as u32 + 1, speed / slowdown)
    }

    fn placed(&self, distance: f64, lap: u32, speed_ms: f64) -> DriverPosition {
        let world = self.circuit.position_at(distance);
        DriverPosition {
            x: Some(round_to(world.x, 1)),
            y: Some(round_to(world.y, 1)),
            distance: Some(round_to(distance, 1)),
            lap: Some(lap),
            speed: Some(round_to(speed_ms * 3.6, 1)),
        }
    }

    fn build_session(&self, year: i32, session_code: &str) -> Session {
        let field = demo_field();
        let stints: Vec<Stint> = field
            .iter()
            .enumerate()
            .map(|(i, d)| self.stint(i, d))
            .collect();

        let leader_finish = stints
            .iter()
            .map(Stint::finish)
            .fold(f64::INFINITY, f64::min);
        let last_finish = stints.iter().map(Stint::finish).fold(0.0, f64::max);
        let samples = last_finish.ceil() as u64 + 3;

        let telemetry = (0..samples)
            .map(|t| Sample {
                time: clock(t),
                drivers: field
                    .iter()
                    .zip(&stints)
                    .map(|(d, stint)| (d.id.to_string(), self.position(stint, t as f64)))
                    .collect(),
            })
            .collect();

        let mut lap_times: LapTimes = BTreeMap::new();
        for (driver, stint) in field.iter().zip(&stints) {
            let laps = stint
                .durations
                .iter()
                .enumerate()
                .map(|(i, secs)| (i as u32 + 1, round_to(*secs, 3)))
                // in-lap of a pit stop has no recorded time
                .filter(|(lap, _)| !(driver.id == PIT_DRIVER && *lap == PIT_LAP))
                .collect();
            lap_times.insert(driver.id.to_string(), laps);
        }

        let drivers = field
            .iter()
            .map(|d| {
                (
                    d.id.to_string(),
                    DriverMeta {
                        name: d.name.to_string(),
                        team: Some(d.team.to_string()),
                        color: d.color,
                    },
                )
            })
            .collect();

        let at = |secs: f64| clock(secs.max(0.0) as u64);
        let status = |secs: f64, code: &str, message: &str| StatusEvent {
            time: at(secs),
            status: Some(code.to_string()),
            message: Some(message.to_string()),
        };
        let control = |secs: f64, category: &str, message: &str| RaceControlMessage {
            time: at(secs),
            category: Some(category.to_string()),
            message: message.to_string(),
        };

        tracing::debug!(
            samples,
            laps = self.laps,
            track_length = self.profile.length,
            "Generated demo session"
        );

        Session {
            year: Some(year),
            gp: Some(DEMO_GP.to_string()),
            session: Some(session_code.to_string()),
            drivers,
            telemetry,
            lap_times,
            track_length: Some(round_to(self.profile.length, 1)),
            total_laps: self.laps,
            track_status: vec![
                status(0.0, "1", "AllClear"),
                status(120.0, "2", "Yellow"),
                status(135.0, "1", "AllClear"),
                status(SAFETY_CAR.0, "4", "SCDeployed"),
                status(SAFETY_CAR.1, "1", "AllClear"),
            ],
            race_control_messages: vec![
                control(0.0, "Flag", "GREEN LIGHT - PIT EXIT OPEN"),
                control(120.0, "Flag", "YELLOW IN TRACK SECTOR 2"),
                control(135.0, "Flag", "CLEAR IN TRACK SECTOR 2"),
                control(SAFETY_CAR.0, "SafetyCar", "SAFETY CAR DEPLOYED"),
                control(SAFETY_CAR.1 - 15.0, "SafetyCar", "SAFETY CAR IN THIS LAP"),
                control(SAFETY_CAR.1, "Flag", "GREEN FLAG"),
                control(leader_finish, "Flag", "CHEQUERED FLAG"),
            ],
            total_duration: Some(clock_span(samples.saturating_sub(1))),
            start_time: Some(clock(0)),
            end_time: Some(clock(samples.saturating_sub(1))),
        }
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceDataProvider for DemoProvider {
    fn key(&self) -> &str {
        "demo"
    }

    fn name(&self) -> &str {
        "Demo Race"
    }

    fn list_races(&self) -> Result<Vec<RaceSummary>> {
        Ok(vec![RaceSummary {
            year: DEMO_YEAR,
            gp: DEMO_GP.to_string(),
            name: "Demo Grand Prix".to_string(),
            date: Some("2024-03-02".to_string()),
        }])
    }

    fn race_data(&self, year: i32, gp: &str, session: &str) -> Result<Session> {
        if !gp.eq_ignore_ascii_case(DEMO_GP) {
            bail!("Demo provider has no race {} {}", year, gp);
        }
        Ok(self.build_session(year, session))
    }

    fn track_outline(&self, year: i32, gp: &str) -> Result<TrackOutline> {
        if !gp.eq_ignore_ascii_case(DEMO_GP) {
            bail!("Demo provider has no track for {} {}", year, gp);
        }
        Ok(self.circuit.outline(OUTLINE_POINTS, self.sectors()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Session clock `H:MM:SS`, `secs` after lights out
fn clock(secs: u64) -> String {
    clock_span(SESSION_START_SECS + secs)
}

fn clock_span(total: u64) -> String {
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}
