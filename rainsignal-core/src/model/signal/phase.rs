use super::ControllerError;
use serde::{Deserialize, Serialize};

/// signal characters recognized in a phase state string, one per controlled link.
const SIGNAL_ALPHABET: &str = "GgyYuUrRsoO";

/// a phase as exchanged with the backend: duration and per-link signal states.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PhaseDefinition {
    /// seconds
    pub duration: f64,
    /// one signal character per controlled link, for example "GGgrr"
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,
}

impl PhaseDefinition {
    pub fn new(duration: f64, state: &str) -> PhaseDefinition {
        PhaseDefinition {
            duration,
            state: state.to_string(),
            min_duration: None,
            max_duration: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Green,
    Yellow,
    Red,
}

impl PhaseKind {
    /// classifies a phase by its state string. any amber or red-amber signal
    /// makes the phase a clearance (yellow) phase; otherwise any green signal
    /// makes it a green phase; otherwise it is red.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` for an empty state string, `Err(c)` for the first character
    ///   outside the signal alphabet
    pub fn from_state(state: &str) -> Result<Option<PhaseKind>, char> {
        if state.is_empty() {
            return Ok(None);
        }
        if let Some(bad) = state.chars().find(|c| !SIGNAL_ALPHABET.contains(*c)) {
            return Err(bad);
        }
        if state.chars().any(|c| matches!(c, 'y' | 'Y' | 'u' | 'U')) {
            Ok(Some(PhaseKind::Yellow))
        } else if state.chars().any(|c| matches!(c, 'G' | 'g')) {
            Ok(Some(PhaseKind::Green))
        } else {
            Ok(Some(PhaseKind::Red))
        }
    }

    /// legacy rule for schedules without state strings: even phases are green,
    /// odd phases are the clearance interval that follows them.
    pub fn from_parity(index: usize) -> PhaseKind {
        if index % 2 == 0 {
            PhaseKind::Green
        } else {
            PhaseKind::Yellow
        }
    }
}

/// a captured phase with its classification, derived once and never re-derived.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Phase {
    pub definition: PhaseDefinition,
    pub kind: PhaseKind,
}

impl Phase {
    /// classifies a backend phase.
    ///
    /// # Arguments
    ///
    /// * `intersection_id` - junction owning the phase, for error reporting
    /// * `index` - position of the phase in its program
    /// * `definition` - the backend phase
    /// * `parity_fallback` - allow index parity for phases with no state string
    pub fn capture(
        intersection_id: &str,
        index: usize,
        definition: &PhaseDefinition,
        parity_fallback: bool,
    ) -> Result<Phase, ControllerError> {
        let kind = match PhaseKind::from_state(&definition.state) {
            Ok(Some(kind)) => kind,
            Ok(None) if parity_fallback => {
                let kind = PhaseKind::from_parity(index);
                log::warn!(
                    "phase {index} of intersection '{intersection_id}' has no state string, classified as {kind:?} by index parity"
                );
                kind
            }
            Ok(None) => {
                return Err(ControllerError::UnclassifiablePhase {
                    intersection_id: intersection_id.to_string(),
                    index,
                })
            }
            Err(bad) => {
                return Err(ControllerError::MalformedPhaseState {
                    intersection_id: intersection_id.to_string(),
                    index,
                    state: definition.state.clone(),
                    character: bad,
                })
            }
        };
        Ok(Phase {
            definition: definition.clone(),
            kind,
        })
    }

    pub fn duration(&self) -> f64 {
        self.definition.duration
    }

    pub fn is_green(&self) -> bool {
        self.kind == PhaseKind::Green
    }
}
