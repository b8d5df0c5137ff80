//! Error types for building the twin.

use cc_controls::ControlError;
use cc_sim::SimError;
use thiserror::Error;

/// Result type for twin construction.
pub type LogicResult<T> = Result<T, LogicError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LogicError {
    /// Invalid argument provided to a logic constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Limits for one interlock channel are inconsistent.
    #[error("Invalid interlock limits for {channel}: {reason}")]
    InvalidLimits {
        channel: &'static str,
        reason: &'static str,
    },

    #[error("Sequencer error: {0}")]
    Control(#[from] ControlError),

    #[error("Plant error: {0}")]
    Plant(#[from] SimError),
}
