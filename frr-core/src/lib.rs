//! F1 Race Replay Core Library
//!
//! This crate provides the session data model, the playback scrubber, both
//! map projections and the race-state derivation for replaying a recorded
//! race from per-second telemetry samples. It performs no I/O; sessions come
//! from a [`RaceDataProvider`].

pub mod chart;
pub mod error;
pub mod model;
pub mod projection;
pub mod provider;
pub mod race;
pub mod replay;
pub mod scrubber;
pub mod status;
pub mod store;
pub mod time;

pub use error::ReplayError;
pub use model::{Session, TrackOutline};
pub use provider::RaceDataProvider;
pub use replay::{FrameMask, Replay, ReplayFrame, TickOutcome};
pub use scrubber::{FrameClock, PlaybackSpeed};
