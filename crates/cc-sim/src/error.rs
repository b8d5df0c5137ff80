//! Error types for plant construction.

use thiserror::Error;

/// Errors raised while building a plant model. Stepping never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Numeric error: {0}")]
    Numeric(#[from] cc_core::CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
