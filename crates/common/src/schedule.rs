use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveTime, TimeZone};

/// Time-of-day range during which scheduled broadcasting is allowed.
///
/// Both ends are inclusive. When `start` is later than `end` the window wraps
/// over midnight, so `09:00-04:00` is active from 09:00 through 04:00 the
/// next morning and idle in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ScheduleWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            t >= self.start && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }

    pub fn within_schedule<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.contains(now.time())
    }
}

impl Default for ScheduleWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time"),
            end: NaiveTime::from_hms_opt(4, 0, 0).expect("04:00 is a valid time"),
        }
    }
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl FromStr for ScheduleWindow {
    type Err = chrono::ParseError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').unwrap_or((s, ""));
        Ok(Self {
            start: NaiveTime::parse_from_str(start.trim(), "%H:%M")?,
            end: NaiveTime::parse_from_str(end.trim(), "%H:%M")?,
        })
    }
}
