//! Twin configuration file schema.

use cc_controls::SequencerParams;
use cc_logic::{InterlockLimits, OperatingParams};
use cc_sim::{Controls, PlantParams, State};
use serde::{Deserialize, Serialize};

/// Current configuration file version.
pub const LATEST_VERSION: u32 = 1;

/// Everything needed to build a twin. Every section may be omitted; missing
/// sections and fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TwinConfig {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub plant: PlantParams,
    pub sequencer: SequencerParams,
    pub interlock: InterlockLimits,
    pub operating: OperatingParams,
    pub initial: InitialConditions,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            version: LATEST_VERSION,
            name: None,
            plant: PlantParams::default(),
            sequencer: SequencerParams::default(),
            interlock: InterlockLimits::default(),
            operating: OperatingParams::default(),
            initial: InitialConditions::default(),
        }
    }
}

/// Plant readings and actuator positions at time zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialConditions {
    pub state: State,
    pub controls: Controls,
}
