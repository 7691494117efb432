//! Playback scrubber
//!
//! Advances a fractional sample index from a frame clock. One sample is one
//! second of race time, so at 1x the index moves one unit per wall-clock
//! second. Car placement always floors the index; only time is continuous.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Samples per second of wall time at 1x
const SAMPLES_PER_SECOND: f64 = 1.0;

/// Samples skipped back by [`PlaybackScrubber::rewind`]
pub const REWIND_SAMPLES: f64 = 10.0;

/// Playback speed multiplier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X4,
    X8,
}

impl PlaybackSpeed {
    /// Next speed in the cycle 1, 2, 4, 8, 1
    pub fn next(self) -> Self {
        match self {
            Self::X1 => Self::X2,
            Self::X2 => Self::X4,
            Self::X4 => Self::X8,
            Self::X8 => Self::X1,
        }
    }

    pub fn multiplier(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }
}

impl From<PlaybackSpeed> for u32 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.multiplier()
    }
}

impl TryFrom<u32> for PlaybackSpeed {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::X1),
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            8 => Ok(Self::X8),
            other => Err(format!("unsupported playback speed: {}x", other)),
        }
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Source of monotonic frame timestamps
pub trait FrameClock: Send + Sync {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for tests and offline rendering
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.micros.store(to.as_micros() as u64, Ordering::SeqCst);
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Paused,
    /// `last_frame` is `None` until the first tick after `play`
    Playing { last_frame: Option<Duration> },
}

/// Playback state machine over a timeline of `len` samples
#[derive(Debug, Clone)]
pub struct PlaybackScrubber {
    len: usize,
    index: f64,
    speed: PlaybackSpeed,
    state: State,
}

/// Snapshot of the scrubber for the sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub index: f64,
    pub speed: PlaybackSpeed,
    pub playing: bool,
}

impl PlaybackScrubber {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            index: 0.0,
            speed: PlaybackSpeed::X1,
            state: State::Paused,
        }
    }

    /// Scrubber with no session; every operation is a no-op
    pub fn empty() -> Self {
        Self::new(0)
    }

    /// Point at a new timeline: index 0, paused. Speed is kept.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = 0.0;
        self.state = State::Paused;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    /// Index floored to the containing sample
    pub fn sample_index(&self) -> usize {
        self.index.floor() as usize
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, State::Playing { .. })
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            index: self.index,
            speed: self.speed,
            playing: self.is_playing(),
        }
    }

    /// Share of the timeline played, `index / len * 100`
    pub fn progress_percent(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.index / self.len as f64 * 100.0
        }
    }

    fn last_index(&self) -> f64 {
        self.len.saturating_sub(1) as f64
    }

    /// Start playing; returns whether the state changed
    pub fn play(&mut self) -> bool {
        if self.len == 0 || self.is_playing() {
            return false;
        }
        self.state = State::Playing { last_frame: None };
        true
    }

    /// Stop playing; returns whether the state changed
    pub fn pause(&mut self) -> bool {
        let was_playing = self.is_playing();
        self.state = State::Paused;
        was_playing
    }

    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Advance to the next speed in the cycle, whatever the play state
    pub fn cycle_speed(&mut self) -> PlaybackSpeed {
        self.speed = self.speed.next();
        self.speed
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }

    /// Jump to `percent` of the timeline and pause
    ///
    /// `floor(percent / 100 * len)`, clamped to the last sample so 100%
    /// lands on the final sample rather than past it.
    pub fn seek(&mut self, percent: f64) {
        if self.len == 0 || !percent.is_finite() {
            return;
        }
        let target = (percent.clamp(0.0, 100.0) / 100.0 * self.len as f64).floor();
        self.index = target.min(self.last_index());
        self.state = State::Paused;
    }

    /// Jump to an explicit sample index and pause
    pub fn seek_index(&mut self, index: f64) {
        if self.len == 0 || !index.is_finite() {
            return;
        }
        self.index = index.clamp(0.0, self.last_index());
        self.state = State::Paused;
    }

    /// Step back ten samples, whatever the play state
    pub fn rewind(&mut self) {
        if self.len == 0 {
            return;
        }
        self.index = (self.index - REWIND_SAMPLES).max(0.0);
    }

    /// Advance by the time elapsed since the previous tick
    ///
    /// The first tick after `play` only records the frame time. Reaching the
    /// last sample clamps the index there and pauses. Returns whether the
    /// index moved.
    pub fn tick(&mut self, now: Duration) -> bool {
        let State::Playing { last_frame } = self.state else {
            return false;
        };
        self.state = State::Playing {
            last_frame: Some(now),
        };

        let Some(last_frame) = last_frame else {
            return false;
        };
        let delta_ms = now.saturating_sub(last_frame).as_secs_f64() * 1000.0;
        let step = delta_ms * self.speed.multiplier() as f64 * SAMPLES_PER_SECOND / 1000.0;
        if step <= 0.0 {
            return false;
        }

        let next = self.index + step;
        if next >= self.last_index() {
            self.index = self.last_index();
            self.state = State::Paused;
        } else {
            self.index = next;
        }
        true
    }
}

impl Default for PlaybackScrubber {
    fn default() -> Self {
        Self::empty()
    }
}
