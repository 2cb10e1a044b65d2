use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeResult {
    Win,
    Loss,
}

impl TradeResult {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Win => "✅",
            Self::Loss => "❌",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => write!(f, "Win"),
            Self::Loss => write!(f, "Loss"),
        }
    }
}

/// Drawn independently of the signal it is reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub result: TradeResult,
}
