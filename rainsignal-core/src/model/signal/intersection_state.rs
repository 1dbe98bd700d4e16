use super::{
    ControllerError, IntersectionId, IntersectionTelemetry, Phase, PhaseDefinition, SignalProgram,
};
use crate::model::rain::SeverityCategory;
use serde::Serialize;

/// control state of an initialized intersection. an intersection the controller
/// has not captured yet is idle and has no [`IntersectionState`] at all.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SignalMode {
    /// default program active, green phases retimed per step
    Tracking,
    /// a rain program sized to `category`/`intensity` is active
    RainAdapted {
        program: SignalProgram,
        category: SeverityCategory,
        intensity: f64,
    },
}

/// per-junction record owned by the controller. the original schedule is
/// captured once and never modified.
#[derive(Serialize, Debug, Clone)]
pub struct IntersectionState {
    intersection_id: IntersectionId,
    signal_ids: Vec<String>,
    original: Vec<Phase>,
    default_program_id: String,
    incoming_lanes: usize,
    mode: SignalMode,
}

impl IntersectionState {
    /// captures the running program of an intersection, classifying each phase.
    pub fn capture(
        telemetry: &IntersectionTelemetry,
        parity_fallback: bool,
    ) -> Result<IntersectionState, ControllerError> {
        let id = &telemetry.intersection_id;
        if telemetry.phases.is_empty() {
            return Err(ControllerError::EmptySchedule(id.clone()));
        }
        let original = telemetry
            .phases
            .iter()
            .enumerate()
            .map(|(idx, p)| Phase::capture(id, idx, p, parity_fallback))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IntersectionState {
            intersection_id: id.clone(),
            signal_ids: telemetry.signal_ids.clone(),
            original,
            default_program_id: telemetry.program_id.clone(),
            incoming_lanes: telemetry.incoming_lanes.len(),
            mode: SignalMode::Tracking,
        })
    }

    pub fn intersection_id(&self) -> &str {
        &self.intersection_id
    }

    pub fn signal_ids(&self) -> &[String] {
        &self.signal_ids
    }

    pub fn original(&self) -> &[Phase] {
        &self.original
    }

    pub fn default_program_id(&self) -> &str {
        &self.default_program_id
    }

    pub fn incoming_lanes(&self) -> usize {
        self.incoming_lanes
    }

    pub fn mode(&self) -> &SignalMode {
        &self.mode
    }

    pub fn is_rain_adapted(&self) -> bool {
        matches!(self.mode, SignalMode::RainAdapted { .. })
    }

    /// the captured schedule as a program under the default id
    pub fn default_program(&self) -> SignalProgram {
        let phases: Vec<PhaseDefinition> =
            self.original.iter().map(|p| p.definition.clone()).collect();
        SignalProgram::new(&self.default_program_id, phases)
    }

    pub fn active_program_id(&self) -> &str {
        match &self.mode {
            SignalMode::Tracking => &self.default_program_id,
            SignalMode::RainAdapted { program, .. } => &program.program_id,
        }
    }

    /// classified phase at `index`. rain programs keep the phase layout of the
    /// original schedule, so the captured classification applies to both.
    pub fn phase(&self, index: usize) -> Result<&Phase, ControllerError> {
        self.original
            .get(index)
            .ok_or_else(|| ControllerError::PhaseIndexOutOfRange {
                intersection_id: self.intersection_id.clone(),
                index,
                len: self.original.len(),
            })
    }

    pub(super) fn enter_rain(
        &mut self,
        program: SignalProgram,
        category: SeverityCategory,
        intensity: f64,
    ) {
        self.mode = SignalMode::RainAdapted {
            program,
            category,
            intensity,
        };
    }

    pub(super) fn restore(&mut self) {
        self.mode = SignalMode::Tracking;
    }
}
