//! Track status and race control
//!
//! The status feed uses free-form codes and messages; they are folded into a
//! handful of conditions the sink can color. Event times are compared as
//! parsed seconds, so `"10:00:00"` sorts after `"9:59:59"`.

use crate::model::{RaceControlMessage, Session, StatusEvent};
use crate::time::TimeOfDay;
use serde::{Serialize, Serializer};
use std::fmt;

/// How far back race-control messages stay on screen
pub const RECENT_MESSAGE_WINDOW_SECS: f64 = 30.0;

/// Most recent messages shown at once
pub const RECENT_MESSAGE_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackCondition {
    Green,
    Yellow,
    SafetyCar,
    VirtualSafetyCar,
    RedFlag,
    /// Unrecognized status, capitalized for display
    Other(String),
}

impl TrackCondition {
    /// Normalize an event: its message if present, else its status code
    pub fn of(event: &StatusEvent) -> Self {
        let raw = status_text(event);
        let text = raw.to_lowercase();

        // "vscdeployed" contains "scdeployed"; the virtual variant is checked first
        if text.contains("vsc") || text.contains("virtual safety car") {
            Self::VirtualSafetyCar
        } else if text.contains("safety car deployed") || text.contains("sc") {
            Self::SafetyCar
        } else if text.contains("red") || text.contains("suspended") {
            Self::RedFlag
        } else if text.contains("yellow") {
            Self::Yellow
        } else if text.is_empty() || text.contains("green") || text.contains("clear") {
            Self::Green
        } else {
            Self::Other(capitalize(raw))
        }
    }
}

impl fmt::Display for TrackCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => f.write_str("Green"),
            Self::Yellow => f.write_str("Yellow Flag"),
            Self::SafetyCar => f.write_str("Safety Car"),
            Self::VirtualSafetyCar => f.write_str("Virtual Safety Car"),
            Self::RedFlag => f.write_str("Red Flag"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

impl Serialize for TrackCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Banner color of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
}

impl StatusColor {
    pub fn of(event: &StatusEvent) -> Self {
        let text = status_text(event).to_lowercase();
        if text.contains("red") || text.contains("suspended") {
            Self::Red
        } else if ["yellow", "safety car", "sc", "virtual"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            Self::Yellow
        } else {
            Self::Green
        }
    }
}

/// Status banner for the displayed moment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStatus {
    pub condition: TrackCondition,
    pub color: StatusColor,
    /// Time of the event that set the status; absent before the first event
    pub since: Option<String>,
}

impl Default for CurrentStatus {
    fn default() -> Self {
        Self {
            condition: TrackCondition::Green,
            color: StatusColor::Green,
            since: None,
        }
    }
}

/// Latest status event at or before `now` (seconds); green when none
pub fn current_status(session: &Session, now: f64) -> CurrentStatus {
    let mut latest: Option<(f64, &StatusEvent)> = None;
    for event in &session.track_status {
        let Some(at) = seconds(&event.time) else {
            continue;
        };
        if at <= now && latest.map_or(true, |(best, _)| at > best) {
            latest = Some((at, event));
        }
    }

    latest
        .map(|(_, event)| CurrentStatus {
            condition: TrackCondition::of(event),
            color: StatusColor::of(event),
            since: Some(event.time.clone()),
        })
        .unwrap_or_default()
}

/// Race-control messages from the last 30 s, newest first, at most 3
pub fn recent_messages(session: &Session, now: f64) -> Vec<&RaceControlMessage> {
    let mut recent: Vec<(f64, &RaceControlMessage)> = session
        .race_control_messages
        .iter()
        .filter_map(|msg| seconds(&msg.time).map(|at| (at, msg)))
        .filter(|(at, _)| *at <= now && now - *at <= RECENT_MESSAGE_WINDOW_SECS)
        .collect();
    recent.sort_by(|a, b| b.0.total_cmp(&a.0));
    recent
        .into_iter()
        .take(RECENT_MESSAGE_LIMIT)
        .map(|(_, msg)| msg)
        .collect()
}

fn status_text(event: &StatusEvent) -> &str {
    event
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .or(event.status.as_deref())
        .unwrap_or("")
}

fn seconds(time: &str) -> Option<f64> {
    TimeOfDay::parse(time).ok().map(|t| t.as_secs_f64())
}

fn capitalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
