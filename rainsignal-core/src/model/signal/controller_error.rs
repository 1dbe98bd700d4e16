use crate::engine::BackendError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("intersection '{0}' was never initialized")]
    UnknownIntersection(String),
    #[error("controller already initialized")]
    AlreadyInitialized,
    #[error("rain intensity must be in [0, 1], found {0}")]
    InvalidIntensity(f64),
    #[error("phase {index} of intersection '{intersection_id}' has malformed state '{state}' (unexpected '{character}')")]
    MalformedPhaseState {
        intersection_id: String,
        index: usize,
        state: String,
        character: char,
    },
    #[error("phase {index} of intersection '{intersection_id}' has no state string and parity fallback is disabled")]
    UnclassifiablePhase { intersection_id: String, index: usize },
    #[error("intersection '{0}' reports an empty phase schedule")]
    EmptySchedule(String),
    #[error("phase index {index} out of range for intersection '{intersection_id}' with {len} phases")]
    PhaseIndexOutOfRange {
        intersection_id: String,
        index: usize,
        len: usize,
    },
    #[error("invalid controller configuration: {0}")]
    ConfigurationError(String),
    #[error("backend command failure: {source}")]
    BackendCommandFailure {
        #[from]
        source: BackendError,
    },
}
