//! Provider backed by a directory of cached backend payloads
//!
//! Layout, one JSON file per payload:
//!
//! - `available_races.json`: the race list
//! - `{year}_{gp}_{session}.json`: one session
//! - `{year}_{gp}_track.json`: one track outline
//!
//! Each file is either the bare payload or wrapped in the cache envelope
//! `{"cached_at": ..., "data": <payload>}`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use frr_core::model::{RaceSummary, Session, TrackOutline};
use frr_core::provider::RaceDataProvider;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const RACE_LIST_FILE: &str = "available_races.json";

pub struct CacheProvider {
    dir: PathBuf,
}

/// Cache envelope written by the data backend
#[derive(Deserialize)]
struct Envelope {
    cached_at: Option<String>,
    data: serde_json::Value,
}

impl CacheProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_file(year: i32, gp: &str, session: &str) -> String {
        format!("{}_{}_{}.json", year, gp, session)
    }

    pub fn track_file(year: i32, gp: &str) -> String {
        format!("{}_{}_track.json", year, gp)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        let payload = if is_envelope(&value) {
            let envelope: Envelope = serde_json::from_value(value)?;
            let age_hours = envelope
                .cached_at
                .as_deref()
                .and_then(|at| at.parse::<NaiveDateTime>().ok())
                .map(|at| (Local::now().naive_local() - at).num_hours());
            tracing::debug!(
                path = %path.display(),
                cached_at = envelope.cached_at.as_deref().unwrap_or("unknown"),
                age_hours = ?age_hours,
                "Unwrapped cache envelope"
            );
            envelope.data
        } else {
            value
        };

        let parsed = serde_json::from_value(payload)
            .with_context(|| format!("Unexpected payload shape in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded cached payload");
        Ok(parsed)
    }
}

fn is_envelope(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("data") && obj.contains_key("cached_at"))
        .unwrap_or(false)
}

impl RaceDataProvider for CacheProvider {
    fn key(&self) -> &str {
        "cache"
    }

    fn name(&self) -> &str {
        "Cached Races"
    }

    fn list_races(&self) -> Result<Vec<RaceSummary>> {
        self.read(RACE_LIST_FILE)
    }

    fn race_data(&self, year: i32, gp: &str, session: &str) -> Result<Session> {
        let mut data: Session = self.read(&Self::session_file(year, gp, session))?;
        data.year.get_or_insert(year);
        data.gp.get_or_insert_with(|| gp.to_string());
        data.session.get_or_insert_with(|| session.to_string());
        Ok(data)
    }

    fn track_outline(&self, year: i32, gp: &str) -> Result<TrackOutline> {
        self.read(&Self::track_file(year, gp))
    }
}
