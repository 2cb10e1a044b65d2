pub mod services;

pub use services::strategy_service::{RandomStrategy, SignalSource};
