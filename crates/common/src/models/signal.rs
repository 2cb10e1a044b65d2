use std::{fmt, time::Duration};

use chrono::NaiveTime;

/// Every signal is a one-minute trade.
pub const SIGNAL_DURATION: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Call => "🟢",
            Self::Put => "🔴",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Put => write!(f, "Put"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub pair: String,
    pub direction: Direction,
    pub duration: Duration,
    pub entry_time: NaiveTime,
    pub mtg_step: u8, // recovery step, 1..=3
}

impl Signal {
    /// Short label used in chat, e.g. `1m` or `30s`.
    pub fn duration_label(&self) -> String {
        let secs = self.duration.as_secs();
        if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

    pub fn entry_label(&self) -> String {
        self.entry_time.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal_at(hour: u32, min: u32, duration: Duration) -> Signal {
        Signal {
            pair: "EUR/USD".to_string(),
            direction: Direction::Put,
            duration,
            entry_time: NaiveTime::from_hms_opt(hour, min, 42).unwrap(),
            mtg_step: 2,
        }
    }

    #[test]
    fn test_labels_use_24h_minutes() {
        let signal = signal_at(21, 5, SIGNAL_DURATION);
        assert_eq!(signal.entry_label(), "21:05");
        assert_eq!(signal.duration_label(), "1m");
    }

    #[test]
    fn test_duration_label_falls_back_to_seconds() {
        let signal = signal_at(0, 0, Duration::from_secs(90));
        assert_eq!(signal.duration_label(), "90s");
    }

    #[test]
    fn test_direction_markers() {
        assert_eq!(format!("{} {}", Direction::Call, Direction::Call.marker()), "Call 🟢");
        assert_eq!(format!("{} {}", Direction::Put, Direction::Put.marker()), "Put 🔴");
    }
}
