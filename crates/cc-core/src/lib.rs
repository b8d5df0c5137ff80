//! cc-core: shared foundation for the cryo-cooler twin.
//!
//! Contains:
//! - units (uom SI types + constructors for the plant's engineering units)
//! - numeric (Real, finite and range checks, clamping and relaxation helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
