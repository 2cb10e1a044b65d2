use std::{env, fmt, time::Duration};

use chrono::FixedOffset;
use thiserror::Error;

use crate::schedule::ScheduleWindow;

pub const BANNER: &str = "**__Quotex Signal by A.A.M Trader__**";

pub const DEFAULT_PAIRS: &[&str; 9] = &[
    // Crypto
    "BTC/USDT",
    "ETH/USDT",
    // Forex
    "EUR/USD",
    "GBP/USD",
    "USD/JPY",
    "AUD/USD",
    "USD/CAD",
    // Metals
    "XAU/USD",
    "XAG/USD",
];

/// Asia/Dhaka, which has no daylight saving.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 6 * 3600;

/// Upper bound for every configured delay or interval.
pub const MAX_DELAY_SECS: u64 = 24 * 3600;

const TOKEN_KEYS: [&str; 2] = ["TELEGRAM_BOT_TOKEN", "BOT_TOKEN"];
const TARGET_KEYS: [&str; 2] = ["TELEGRAM_CHAT_ID", "CHAT_ID"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOT_TOKEN missing. Set env var TELEGRAM_BOT_TOKEN (or BOT_TOKEN).")]
    MissingToken,
    #[error("{key} is set but lists no pairs")]
    EmptyPairs { key: &'static str },
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Immutable runtime configuration, built once at startup and shared by `Arc`.
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    /// Chat id or `@channel` for scheduled broadcasts. `None` disables them.
    pub broadcast_target: Option<String>,
    pub pairs: Vec<String>,
    pub utc_offset: FixedOffset,
    pub window: ScheduleWindow,
    pub banner: String,
    pub first_tick_delay: Duration,
    pub tick_interval: Duration,
    pub result_delay: Duration,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("broadcast_target", &self.broadcast_target)
            .field("pairs", &self.pairs)
            .field("utc_offset", &self.utc_offset)
            .field("window", &self.window)
            .field("first_tick_delay", &self.first_tick_delay)
            .field("tick_interval", &self.tick_interval)
            .field("result_delay", &self.result_delay)
            .finish()
    }
}

impl BotConfig {
    /// Defaults for everything except the credential.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            broadcast_target: None,
            pairs: DEFAULT_PAIRS.iter().map(|p| p.to_string()).collect(),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS)
                .expect("default offset is in range"),
            window: ScheduleWindow::default(),
            banner: BANNER.to_string(),
            first_tick_delay: Duration::from_secs(5),
            tick_interval: Duration::from_secs(60),
            result_delay: Duration::from_secs(60),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let first_of = |keys: &[&str]| keys.iter().find_map(|k| get(*k));

        let token = first_of(&TOKEN_KEYS).ok_or(ConfigError::MissingToken)?;
        let mut config = Self::with_token(token);
        config.broadcast_target = first_of(&TARGET_KEYS);

        if let Some(raw) = get("SIGNAL_PAIRS") {
            config.pairs = parse_pairs(&raw);
            if config.pairs.is_empty() {
                return Err(ConfigError::EmptyPairs { key: "SIGNAL_PAIRS" });
            }
        }
        if let Some(raw) = get("SIGNAL_UTC_OFFSET") {
            config.utc_offset = parse_offset(&raw).map_err(|reason| ConfigError::Invalid {
                key: "SIGNAL_UTC_OFFSET",
                value: raw.clone(),
                reason,
            })?;
        }
        if let Some(raw) = get("SIGNAL_WINDOW") {
            config.window = raw.parse().map_err(|e: chrono::ParseError| ConfigError::Invalid {
                key: "SIGNAL_WINDOW",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(secs) = parse_secs(&get, "BROADCAST_FIRST_DELAY_SECS")? {
            config.first_tick_delay = secs;
        }
        if let Some(secs) = parse_secs(&get, "BROADCAST_INTERVAL_SECS")? {
            if secs.is_zero() {
                return Err(ConfigError::Invalid {
                    key: "BROADCAST_INTERVAL_SECS",
                    value: "0".to_string(),
                    reason: "interval must be positive".to_string(),
                });
            }
            config.tick_interval = secs;
        }
        if let Some(secs) = parse_secs(&get, "RESULT_DELAY_SECS")? {
            config.result_delay = secs;
        }

        Ok(config)
    }

    pub fn is_pair(&self, text: &str) -> bool {
        self.pairs.iter().any(|p| p == text)
    }
}

fn parse_pairs(raw: &str) -> Vec<String> {
    let mut pairs: Vec<String> = Vec::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !pairs.iter().any(|p| p == pair) {
            pairs.push(pair.to_string());
        }
    }
    pairs
}

fn parse_secs<G>(get: &G, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if secs > MAX_DELAY_SECS {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: format!("must be at most {} seconds", MAX_DELAY_SECS),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}

/// Parses `+HH:MM` / `-HH:MM` (a bare `HH:MM` is taken as east of UTC).
fn parse_offset(raw: &str) -> Result<FixedOffset, String> {
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'-') => (-1, &raw[1..]),
        Some(b'+') => (1, &raw[1..]),
        _ => (1, raw),
    };
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = h.parse().map_err(|_| "hours are not a number".to_string())?;
    let minutes: i32 = m.parse().map_err(|_| "minutes are not a number".to_string())?;
    if !(0..24).contains(&hours) {
        return Err("hours must be below 24".to_string());
    }
    if !(0..60).contains(&minutes) {
        return Err("minutes must be below 60".to_string());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| "offset out of range".to_string())
}
