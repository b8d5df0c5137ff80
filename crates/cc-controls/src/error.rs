//! Error types for sequencer construction.

use cc_sim::SimError;
use thiserror::Error;

/// Result type for sequencer operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while building a sequencer. The tick path itself never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a sequencer function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Refill thresholds not in ascending order.
    #[error("Invalid refill thresholds for {circuit}: {reason}")]
    InvalidThresholds {
        circuit: &'static str,
        reason: &'static str,
    },

    /// Plant construction failed.
    #[error("Plant error: {0}")]
    Plant(#[from] SimError),
}
