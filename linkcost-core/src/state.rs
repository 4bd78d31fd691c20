//! Evaluator state - the derived scalars carried between calls
//!
//! Preprocessing computes the overflow guard and the initial running maximum
//! cost; batch evaluation updates the running maximum and the status. The
//! caller owns the state and passes it to every call, so independent contexts
//! (threads, scenarios) each hold their own.

use serde::{Deserialize, Serialize};

use crate::{Status, MAX_FLOAT};

/// Host feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VdfFlags {
    /// Host prices links by link type
    #[serde(default)]
    pub use_link_types: bool,
    /// Host applies turn penalties
    #[serde(default)]
    pub use_turn_penalties: bool,
}

/// Mutable scalars shared by one sequence of preprocess/evaluate calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VdfState {
    /// Largest v/c ratio that can be raised to Beta1 without overflowing
    pub big_real: f64,
    /// Running maximum current cost
    pub threshold: f64,
    /// Outcome of the most recent call
    pub status: Status,
    pub flags: VdfFlags,
}

impl VdfState {
    pub fn new() -> Self {
        Self {
            big_real: MAX_FLOAT,
            threshold: 0.0,
            status: Status::Okay,
            flags: VdfFlags::default(),
        }
    }

    /// Overflow guard for the largest segment exponent in the network
    pub fn guard_for_beta(max_beta: f64) -> f64 {
        MAX_FLOAT.powf(1.0 / max_beta)
    }

    pub fn set_flags(&mut self, flags: VdfFlags) {
        self.flags = flags;
    }
}

impl Default for VdfState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = VdfState::new();
        assert_eq!(state.big_real, MAX_FLOAT);
        assert_eq!(state.threshold, 0.0);
        assert!(state.status.is_okay());
        assert!(!state.flags.use_link_types);
    }

    #[test]
    fn test_guard_for_beta() {
        // 3.4e38 ^ (1/1.9) ≈ 1.57e20
        let guard = VdfState::guard_for_beta(1.9);
        assert!(guard > 1.0e20 && guard < 1.0e21);
        assert_eq!(VdfState::guard_for_beta(1.0), MAX_FLOAT);
        assert_eq!(VdfState::guard_for_beta(0.0), f64::INFINITY);
    }
}
