//! Operating logic, safety interlocks, and the twin facade.
//!
//! - [`InterlockEvaluator`]: per-channel limit classification with debounce and a
//!   critical latch
//! - [`OperatingLogic`]: the operating-mode state machine; the only authoritative
//!   mode record
//! - [`CryoTwin`]: owns the sequencer, logic and interlock and runs one tick of the
//!   full control flow per call

pub mod error;
pub mod interlock;
pub mod operating;
pub mod twin;

pub use error::{LogicError, LogicResult};
pub use interlock::{
    Channel, InterlockEvaluator, InterlockLimits, InterlockVerdict, LevelLimits, Severity,
};
pub use operating::{Command, OperatingLogic, OperatingParams, OperatingState};
pub use twin::{CryoTwin, StateOverride, TwinStatus};
