//! Delay classification on a same-day, minute-granularity clock.
//!
//! Thresholds use inclusive lower bounds and a value sitting exactly on a
//! boundary belongs to the lower band:
//!
//! | delay (min) | severity   |
//! |-------------|------------|
//! | 0..=9       | `OnTime`   |
//! | 10..=20     | `Late`     |
//! | 21..=40     | `VeryLate` |
//! | > 40        | `Critical` |

use chrono::{NaiveTime, Timelike};
use fleetwatch_core::Severity;

use crate::error::DepartureError;

/// First delay (minutes) classified as `Late`.
pub const LATE_FROM: u32 = 10;
/// Last delay classified as `Late`.
pub const LATE_UNTIL: u32 = 20;
/// Last delay classified as `VeryLate`; anything above is `Critical`.
pub const VERY_LATE_UNTIL: u32 = 40;

const DEPARTURE_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub delay_minutes: u32,
    pub severity: Severity,
}

/// Map a delay in whole minutes to its severity tier.
pub fn severity_for(delay_minutes: u32) -> Severity {
    match delay_minutes {
        d if d < LATE_FROM => Severity::OnTime,
        d if d <= LATE_UNTIL => Severity::Late,
        d if d <= VERY_LATE_UNTIL => Severity::VeryLate,
        _ => Severity::Critical,
    }
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Classify a departure against the current time of day.
///
/// Seconds are truncated. If `now` precedes `scheduled` the delay is 0.
pub fn classify(scheduled: NaiveTime, now: NaiveTime) -> Classification {
    let delay_minutes = minute_of_day(now).saturating_sub(minute_of_day(scheduled));
    Classification {
        delay_minutes,
        severity: severity_for(delay_minutes),
    }
}

/// Parse a catalog departure value (`08:00`, `08:00:30`, `08:00 PM`).
pub fn parse_departure(raw: Option<&str>) -> Result<NaiveTime, DepartureError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(DepartureError::Missing);
    };

    DEPARTURE_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| DepartureError::Unparsable(raw.to_string()))
}
