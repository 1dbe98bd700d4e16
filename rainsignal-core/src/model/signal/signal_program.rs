use super::PhaseDefinition;
use serde::{Deserialize, Serialize};

/// a complete phase schedule under a program identifier, as loaded into the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignalProgram {
    pub program_id: String,
    pub phases: Vec<PhaseDefinition>,
}

impl SignalProgram {
    pub fn new(program_id: &str, phases: Vec<PhaseDefinition>) -> SignalProgram {
        SignalProgram {
            program_id: program_id.to_string(),
            phases,
        }
    }

    /// duration of one full cycle, in seconds
    pub fn cycle_length(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }
}
