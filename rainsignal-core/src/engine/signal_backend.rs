use crate::model::signal::{IntersectionId, IntersectionTelemetry, SignalProgram};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend has no intersection '{0}'")]
    UnknownIntersection(String),
    #[error("intersection '{intersection_id}' has no program '{program_id}'")]
    UnknownProgram {
        intersection_id: String,
        program_id: String,
    },
    #[error("{command} failed for intersection '{intersection_id}': {msg}")]
    CommandFailed {
        command: String,
        intersection_id: String,
        msg: String,
    },
    #[error("telemetry query failed: {0}")]
    QueryFailed(String),
    #[error("failure advancing the simulation: {0}")]
    StepFailed(String),
    #[error("invalid backend configuration: {0}")]
    ConfigurationError(String),
}

/// what the backend reports after advancing one tick
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    pub step: u64,
    /// vehicles that completed their trip during the tick
    pub arrived: usize,
    /// mean accumulated wait of vehicles in the network, in seconds
    pub mean_vehicle_wait: f64,
    /// mean pedestrian wait, when the backend models pedestrians
    pub mean_pedestrian_wait: Option<f64>,
}

/// the traffic backend driven by the control loop. queries take `&self`,
/// commands take `&mut self` so that commands are serialized by construction.
pub trait SignalBackend {
    /// ids of every signal-controlled intersection
    fn intersection_ids(&self) -> Result<Vec<IntersectionId>, BackendError>;

    fn telemetry(&self, intersection_id: &str) -> Result<IntersectionTelemetry, BackendError>;

    /// sets the total duration of the phase currently running at an intersection
    fn set_phase_duration(&mut self, intersection_id: &str, seconds: f64)
        -> Result<(), BackendError>;

    /// loads (or replaces) a program definition without activating it
    fn set_program_logic(
        &mut self,
        intersection_id: &str,
        program: &SignalProgram,
    ) -> Result<(), BackendError>;

    fn switch_program(&mut self, intersection_id: &str, program_id: &str)
        -> Result<(), BackendError>;

    /// receives the rain-adjusted flow parameters on every weather update.
    /// backends without a flow model ignore them.
    fn apply_flow_parameters(
        &mut self,
        _parameters: &BTreeMap<String, f64>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn advance(&mut self) -> Result<StepReport, BackendError>;
}
