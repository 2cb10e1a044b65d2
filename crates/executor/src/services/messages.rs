//! Chat texts. These are plain text (no parse mode) and are read by existing
//! channel consumers, so the layout must not drift.

use chrono::{DateTime, FixedOffset};
use common::config::BotConfig;
use common::models::{Outcome, Signal};

fn date_label(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d").to_string()
}

pub fn pair_menu(config: &BotConfig, now: &DateTime<FixedOffset>) -> String {
    format!(
        "{}\nDate: {}\nSelect Pair (reply with one):\n{}",
        config.banner,
        date_label(now),
        config.pairs.join("\n")
    )
}

pub fn invalid_pair(config: &BotConfig) -> String {
    format!("❌ Invalid pair.\nReply with one of:\n{}", config.pairs.join("\n"))
}

pub fn pair_info(config: &BotConfig, pair: &str, now: &DateTime<FixedOffset>) -> String {
    format!("{}\nDate: {}\nPair: {}", config.banner, date_label(now), pair)
}

pub fn signal_message(config: &BotConfig, signal: &Signal) -> String {
    format!(
        "{}\nPair: {}\nSignal: {} {}\nDuration: {}\nEntry Time: {}\nMTG Step: {}",
        config.banner,
        signal.pair,
        signal.direction,
        signal.direction.marker(),
        signal.duration_label(),
        signal.entry_label(),
        signal.mtg_step
    )
}

pub fn result_message(config: &BotConfig, pair: &str, outcome: &Outcome) -> String {
    format!(
        "{}\nPair: {}\nResult: {} {}",
        config.banner,
        pair,
        outcome.result,
        outcome.result.marker()
    )
}
