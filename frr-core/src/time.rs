//! Time-of-day parsing and formatting
//!
//! Samples carry their time as text. Current payloads use `H:MM:SS` (hours
//! unpadded); legacy payloads use `H:MM:SS.ffffff`, `N day(s), H:MM:SS.ffffff`
//! or the pandas form `N days HH:MM:SS.ffffff`. The day count is stripped,
//! never added: the timeline starts at zero within the session.

use chrono::Duration;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("empty time string")]
    Empty,

    #[error("expected H:MM:SS, got {0:?}")]
    Malformed(String),

    #[error("invalid {field} in {input:?}")]
    InvalidField { field: &'static str, input: String },
}

/// Elapsed time of day within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(Duration);

impl Default for TimeOfDay {
    fn default() -> Self {
        Self(Duration::zero())
    }
}

impl TimeOfDay {
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::microseconds((secs * 1_000_000.0).round() as i64))
    }

    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TimeParseError::Empty);
        }

        let clock = strip_day_prefix(trimmed);
        let mut parts = clock.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeParseError::Malformed(input.to_string()));
        };

        let field_err = |field| TimeParseError::InvalidField {
            field,
            input: input.to_string(),
        };
        let hours: i64 = hours.trim().parse().map_err(|_| field_err("hours"))?;
        let minutes: i64 = minutes.parse().map_err(|_| field_err("minutes"))?;
        let seconds: f64 = seconds.parse().map_err(|_| field_err("seconds"))?;
        if hours < 0 || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
            return Err(TimeParseError::Malformed(input.to_string()));
        }

        let micros = (seconds * 1_000_000.0).round() as i64;
        let total = Duration::try_hours(hours)
            .and_then(|h| h.checked_add(&Duration::try_minutes(minutes)?))
            .and_then(|hm| hm.checked_add(&Duration::microseconds(micros)))
            .ok_or_else(|| field_err("hours"))?;
        Ok(Self(total))
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
    }

    /// Whole seconds, fractional part floored
    pub fn whole_seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Clock display: zero-padded `HH:MM:SS`, seconds floored
impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.whole_seconds();
        write!(
            f,
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// Drop a leading `N day,` / `N days,` / `N days ` prefix
fn strip_day_prefix(input: &str) -> &str {
    let digits = input.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return input;
    }
    let rest = input[digits..].trim_start();
    let Some(rest) = rest
        .strip_prefix("days")
        .or_else(|| rest.strip_prefix("day"))
    else {
        return input;
    };
    rest.trim_start_matches(',').trim_start()
}

/// Format a clock string for display, `00:00:00` when it cannot be parsed
pub fn format_clock(input: &str) -> String {
    TimeOfDay::parse(input)
        .map(|t| t.to_string())
        .unwrap_or_else(|_| "00:00:00".to_string())
}

/// Format a lap time as `M:SS.mmm`
pub fn format_lap_time(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as i64;
    let minutes = millis / 60_000;
    let rest = millis % 60_000;
    format!("{}:{:02}.{:03}", minutes, rest / 1000, rest % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_clock() {
        let t = TimeOfDay::parse("0:05:09").unwrap();
        assert_eq!(t.whole_seconds(), 309);
        assert_eq!(t.as_secs_f64(), 309.0);
    }

    #[test]
    fn test_parse_hours_unpadded() {
        let t = TimeOfDay::parse("1:23:45").unwrap();
        assert_eq!(t.whole_seconds(), 5025);
    }

    #[test]
    fn test_parse_strips_day_prefix() {
        let t = TimeOfDay::parse("1 day, 0:00:01.5").unwrap();
        assert_eq!(t.whole_seconds(), 1);
        assert!((t.as_secs_f64() - 1.5).abs() < 1e-9);

        let t = TimeOfDay::parse("2 days, 1:00:00.250000").unwrap();
        assert_eq!(t.whole_seconds(), 3600);
    }

    #[test]
    fn test_parse_pandas_form() {
        let t = TimeOfDay::parse("0 days 00:01:23.456789").unwrap();
        assert_eq!(t.whole_seconds(), 83);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(TimeOfDay::parse(""), Err(TimeParseError::Empty));
        assert!(matches!(
            TimeOfDay::parse("12:34"),
            Err(TimeParseError::Malformed(_))
        ));
        assert!(matches!(
            TimeOfDay::parse("a:00:00"),
            Err(TimeParseError::InvalidField { field: "hours", .. })
        ));
        assert!(TimeOfDay::parse("0:75:00").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_hours() {
        assert_eq!(
            TimeOfDay::parse("9999999999999:00:00"),
            Err(TimeParseError::InvalidField {
                field: "hours",
                input: "9999999999999:00:00".to_string()
            })
        );
        assert_eq!(format_clock("99999999999999:00:00"), "00:00:00");
    }

    #[test]
    fn test_display_pads_and_floors() {
        assert_eq!(TimeOfDay::parse("1:02:03.999").unwrap().to_string(), "01:02:03");
        assert_eq!(format_clock("0:00:07"), "00:00:07");
        assert_eq!(format_clock("nonsense"), "00:00:00");
    }

    #[test]
    fn test_ordering_follows_elapsed_time() {
        let early: TimeOfDay = "0:59:59".parse().unwrap();
        let late: TimeOfDay = "1:00:00".parse().unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(83.456), "1:23.456");
        assert_eq!(format_lap_time(63.0), "1:03.000");
        assert_eq!(format_lap_time(59.9996), "1:00.000");
    }
}
