// ==========================================
// Packing Station - domain types
// ==========================================
// Order state is a cached value derived from its details.
// Persisted as SCREAMING_SNAKE_CASE strings.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// Order state
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    Draft,     // packing in progress (or reset / repaired)
    Done,      // every detail fully packed
    Defective, // at least one detail carries defective units
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Draft => "DRAFT",
            OrderState::Done => "DONE",
            OrderState::Defective => "DEFECTIVE",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(OrderState::Draft),
            "DONE" => Ok(OrderState::Done),
            "DEFECTIVE" => Ok(OrderState::Defective),
            other => Err(format!("unknown order state: {}", other)),
        }
    }
}
