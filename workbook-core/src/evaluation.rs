//! Lifecycle of a derived value (idea score, formed-concept score, risk)

use serde::{Deserialize, Serialize};

/// State of a value computed from user inputs.
///
/// Any edit to an input moves `Computed` to `Stale`; only an explicit
/// recompute returns it to `Computed`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// Never computed
    #[default]
    Pending,
    /// Up to date with its inputs (full precision)
    Computed(f64),
    /// Inputs changed since this value was computed
    Stale(f64),
}

impl Evaluation {
    pub fn is_computed(&self) -> bool {
        matches!(self, Evaluation::Computed(_))
    }

    /// The current value, only when up to date
    pub fn value(&self) -> Option<f64> {
        match self {
            Evaluation::Computed(v) => Some(*v),
            _ => None,
        }
    }

    /// The last computed value, even if stale
    pub fn last_value(&self) -> Option<f64> {
        match self {
            Evaluation::Computed(v) | Evaluation::Stale(v) => Some(*v),
            Evaluation::Pending => None,
        }
    }

    /// Mark as needing recompute; returns true if the state changed
    pub fn invalidate(&mut self) -> bool {
        match *self {
            Evaluation::Computed(v) => {
                *self = Evaluation::Stale(v);
                true
            }
            _ => false,
        }
    }
}

/// Round to 2 decimals for display and storage
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
