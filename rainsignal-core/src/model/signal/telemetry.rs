use super::PhaseDefinition;
use serde::{Deserialize, Serialize};

pub type IntersectionId = String;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VehicleTelemetry {
    pub vehicle_id: String,
    /// current speed in m/s
    pub speed: f64,
    /// seconds spent stopped since entering the network
    pub accumulated_wait: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LaneTelemetry {
    pub lane_id: String,
    pub vehicles: Vec<VehicleTelemetry>,
}

/// snapshot of one signal-controlled junction as reported by the backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct IntersectionTelemetry {
    pub intersection_id: IntersectionId,
    /// ids of the signal heads controlled at this junction
    pub signal_ids: Vec<String>,
    pub incoming_lanes: Vec<LaneTelemetry>,
    /// currently running program
    pub program_id: String,
    /// phase list of the currently running program
    pub phases: Vec<PhaseDefinition>,
    pub phase_index: usize,
}
