//! Lumped-parameter plant model for the DCM cryo-cooler.
//!
//! Provides:
//! - Actuator outputs (`Controls`) and plant readings (`State`)
//! - Tunable physical constants (`PlantParams`)
//! - A fixed-order explicit integrator (`PhysicsEngine`): pressures, then
//!   temperatures, then levels

pub mod controls;
pub mod engine;
pub mod error;
pub mod heater;
pub mod params;
pub mod state;

pub use controls::Controls;
pub use engine::{Flows, PhysicsEngine};
pub use error::{SimError, SimResult};
pub use heater::HeaterController;
pub use params::PlantParams;
pub use state::{ProcedureProgress, State};
