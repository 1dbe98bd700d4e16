mod adaptive_controller;
mod controller_config;
mod controller_error;
mod intersection_state;
mod phase;
mod signal_program;
mod telemetry;

pub use adaptive_controller::{
    AdaptivePhaseController, PhaseAdjustment, ProgramTransition, StepOutcome, WeatherUpdateOutcome,
};
pub use controller_config::{CongestionFactors, CongestionThresholds, ControllerConfig};
pub use controller_error::ControllerError;
pub use intersection_state::{IntersectionState, SignalMode};
pub use phase::{Phase, PhaseDefinition, PhaseKind};
pub use signal_program::SignalProgram;
pub use telemetry::{IntersectionId, IntersectionTelemetry, LaneTelemetry, VehicleTelemetry};
