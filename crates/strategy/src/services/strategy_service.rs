use std::sync::Mutex;

use chrono::NaiveTime;
use common::models::{Direction, Outcome, SIGNAL_DURATION, Signal, TradeResult};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

pub const MTG_STEPS: std::ops::RangeInclusive<u8> = 1..=3;

/// Where signals and their outcomes come from.
///
/// This is the only seam between the chat front end and whatever decides a
/// trade. Callers read the clock and pass the entry time in, so an
/// implementation never needs one of its own.
pub trait SignalSource: Send + Sync {
    fn signal(&self, pair: &str, entry_time: NaiveTime) -> Signal;

    fn outcome(&self) -> Outcome;
}

/// Placeholder source: every field is a fair coin or die roll.
///
/// There is no market data behind it and the outcome does not depend on the
/// signal. It exists so the bot runs end to end until a real evaluator
/// replaces it.
pub struct RandomStrategy {
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for RandomStrategy {
    fn signal(&self, pair: &str, entry_time: NaiveTime) -> Signal {
        let (direction, mtg_step) = self.with_rng(|rng| {
            let direction = if rng.gen_bool(0.5) {
                Direction::Call
            } else {
                Direction::Put
            };
            (direction, rng.gen_range(MTG_STEPS))
        });

        debug!("Random signal for {}: {} MTG={}", pair, direction, mtg_step);

        Signal {
            pair: pair.to_string(),
            direction,
            duration: SIGNAL_DURATION,
            entry_time,
            mtg_step,
        }
    }

    fn outcome(&self) -> Outcome {
        let result = self.with_rng(|rng| {
            if rng.gen_bool(0.5) {
                TradeResult::Win
            } else {
                TradeResult::Loss
            }
        });
        Outcome { result }
    }
}
