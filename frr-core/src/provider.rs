//! Race data provider trait definition

use crate::model::{RaceSummary, Session, TrackOutline};
use anyhow::Result;

/// Session code of the race itself
pub const RACE_SESSION: &str = "R";

/// Source of race sessions and track outlines
///
/// Each provider is responsible for:
/// - Listing the races it can serve
/// - Handing over a complete, materialized session for one race
/// - Handing over the track outline for a circuit
///
/// Calls may block (disk, network); async callers should run them on a
/// blocking pool.
pub trait RaceDataProvider: Send + Sync {
    /// Stable identifier used in API requests (e.g., "demo", "cache")
    fn key(&self) -> &str;

    /// Human-readable name (e.g., "Demo Race")
    fn name(&self) -> &str;

    /// Races this provider can load
    fn list_races(&self) -> Result<Vec<RaceSummary>>;

    /// Full session data for `year`/`gp`; `session` is a code like "R"
    fn race_data(&self, year: i32, gp: &str, session: &str) -> Result<Session>;

    /// Track outline for the circuit hosting `year`/`gp`
    fn track_outline(&self, year: i32, gp: &str) -> Result<TrackOutline>;
}
