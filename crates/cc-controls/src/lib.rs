//! Rule-based actuator sequencing for the cryo-cooler twin.
//!
//! The [`Sequencer`] owns the plant and is the sole writer of its actuator outputs.
//! Each tick runs one rule per actuator in a fixed order, against the previous
//! readings and the active automatic procedure, then steps the plant.
//!
//! Building blocks:
//! - [`ProcedureKind`]: idle, cool-down, warm-up and the two refill procedures
//! - [`RefillHysteresis`]: initial fill plus idle/armed/filling recharge per circuit
//! - [`PulseTimer`]: square wave for the toggled heater-vessel vent
//! - [`ManualCommands`] / [`Posture`]: operator overrides and safe actuator sets
//! - [`ReadinessCriteria`]: the steady-state predicate published on the readings

pub mod error;
pub mod hysteresis;
pub mod manual;
pub mod params;
pub mod procedure;
pub mod pulse;
pub mod readiness;
pub mod sequencer;

pub use error::{ControlError, ControlResult};
pub use hysteresis::{RechargePhase, RefillHysteresis, RefillThresholds};
pub use manual::{ManualCommands, Posture};
pub use params::SequencerParams;
pub use procedure::{ProcedureKind, RefillCircuit};
pub use pulse::PulseTimer;
pub use readiness::ReadinessCriteria;
pub use sequencer::{Sequencer, SequencerStatus};
