pub mod outcome;
pub mod signal;

pub use outcome::{Outcome, TradeResult};
pub use signal::{Direction, SIGNAL_DURATION, Signal};
