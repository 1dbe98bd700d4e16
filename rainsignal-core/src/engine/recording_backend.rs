//! in-memory backend for unit tests. keeps every loaded program, applies
//! commands literally and records them in order. phases only change when a
//! test moves them with [`RecordingBackend::set_phase`].
use super::{BackendError, SignalBackend, StepReport};
use crate::model::signal::{
    IntersectionId, IntersectionTelemetry, LaneTelemetry, PhaseDefinition, SignalProgram,
    VehicleTelemetry,
};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPhaseDuration(String, f64),
    SetProgramLogic(String, String),
    SwitchProgram(String, String),
    FlowParameters(BTreeMap<String, f64>),
}

#[derive(Debug, Clone)]
pub struct MockIntersection {
    pub programs: HashMap<String, Vec<PhaseDefinition>>,
    pub active: String,
    pub phase_index: usize,
    /// duration of the running phase set by `set_phase_duration`. dropped when
    /// the phase or program changes, so loaded programs are never rewritten.
    pub duration_override: Option<f64>,
    pub lanes: Vec<LaneTelemetry>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub intersections: BTreeMap<IntersectionId, MockIntersection>,
    pub commands: Vec<Command>,
    /// intersections whose commands fail
    pub failing: HashSet<IntersectionId>,
    /// step at which `advance` fails
    pub failing_step: Option<u64>,
    pub step: u64,
}

impl RecordingBackend {
    /// intersections running the four-phase "0" program (31/5/31/5)
    pub fn with_intersections(ids: &[&str]) -> RecordingBackend {
        let mut backend = RecordingBackend::default();
        for id in ids {
            backend.add(id, "0", four_phase());
        }
        backend
    }

    pub fn add(&mut self, id: &str, program_id: &str, phases: Vec<PhaseDefinition>) {
        let mut programs = HashMap::new();
        programs.insert(program_id.to_string(), phases);
        let lanes = ["n_0", "e_0", "s_0", "w_0"]
            .iter()
            .map(|l| LaneTelemetry {
                lane_id: format!("{id}_{l}"),
                vehicles: vec![],
            })
            .collect();
        self.intersections.insert(
            id.to_string(),
            MockIntersection {
                programs,
                active: program_id.to_string(),
                phase_index: 0,
                duration_override: None,
                lanes,
            },
        );
    }

    /// puts `count` stopped vehicles on the first lane of an intersection
    pub fn queue(&mut self, id: &str, count: usize) {
        if let Some(i) = self.intersections.get_mut(id) {
            i.lanes[0].vehicles = (0..count)
                .map(|n| VehicleTelemetry {
                    vehicle_id: format!("{id}_v{n}"),
                    speed: 0.0,
                    accumulated_wait: 10.0,
                })
                .collect();
        }
    }

    /// moves an intersection to another phase, ending any duration override
    pub fn set_phase(&mut self, id: &str, phase_index: usize) {
        if let Some(i) = self.intersections.get_mut(id) {
            i.phase_index = phase_index;
            i.duration_override = None;
        }
    }

    /// duration the running phase will last: the override if one is set,
    /// else the active program's duration
    pub fn running_duration(&self, id: &str) -> Option<f64> {
        let i = self.intersections.get(id)?;
        i.duration_override.or_else(|| {
            i.programs
                .get(&i.active)
                .and_then(|p| p.get(i.phase_index))
                .map(|p| p.duration)
        })
    }

    pub fn active_phases(&self, id: &str) -> Vec<PhaseDefinition> {
        self.intersections
            .get(id)
            .and_then(|i| i.programs.get(&i.active))
            .cloned()
            .unwrap_or_default()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut MockIntersection, BackendError> {
        if self.failing.contains(id) {
            return Err(BackendError::CommandFailed {
                command: String::from("command"),
                intersection_id: id.to_string(),
                msg: String::from("injected failure"),
            });
        }
        self.intersections
            .get_mut(id)
            .ok_or_else(|| BackendError::UnknownIntersection(id.to_string()))
    }
}

pub fn four_phase() -> Vec<PhaseDefinition> {
    vec![
        PhaseDefinition::new(31.0, "GGGgrr"),
        PhaseDefinition::new(5.0, "yyygrr"),
        PhaseDefinition::new(31.0, "rrrGGG"),
        PhaseDefinition::new(5.0, "rrryyy"),
    ]
}

impl SignalBackend for RecordingBackend {
    fn intersection_ids(&self) -> Result<Vec<IntersectionId>, BackendError> {
        Ok(self.intersections.keys().cloned().collect())
    }

    fn telemetry(&self, intersection_id: &str) -> Result<IntersectionTelemetry, BackendError> {
        let i = self
            .intersections
            .get(intersection_id)
            .ok_or_else(|| BackendError::UnknownIntersection(intersection_id.to_string()))?;
        Ok(IntersectionTelemetry {
            intersection_id: intersection_id.to_string(),
            signal_ids: vec![intersection_id.to_string()],
            incoming_lanes: i.lanes.clone(),
            program_id: i.active.clone(),
            phases: i.programs.get(&i.active).cloned().unwrap_or_default(),
            phase_index: i.phase_index,
        })
    }

    fn set_phase_duration(
        &mut self,
        intersection_id: &str,
        seconds: f64,
    ) -> Result<(), BackendError> {
        self.get_mut(intersection_id)?.duration_override = Some(seconds);
        self.commands
            .push(Command::SetPhaseDuration(intersection_id.to_string(), seconds));
        Ok(())
    }

    fn set_program_logic(
        &mut self,
        intersection_id: &str,
        program: &SignalProgram,
    ) -> Result<(), BackendError> {
        let i = self.get_mut(intersection_id)?;
        i.programs
            .insert(program.program_id.clone(), program.phases.clone());
        self.commands.push(Command::SetProgramLogic(
            intersection_id.to_string(),
            program.program_id.clone(),
        ));
        Ok(())
    }

    fn switch_program(
        &mut self,
        intersection_id: &str,
        program_id: &str,
    ) -> Result<(), BackendError> {
        let i = self.get_mut(intersection_id)?;
        if !i.programs.contains_key(program_id) {
            return Err(BackendError::UnknownProgram {
                intersection_id: intersection_id.to_string(),
                program_id: program_id.to_string(),
            });
        }
        i.active = program_id.to_string();
        i.duration_override = None;
        self.commands.push(Command::SwitchProgram(
            intersection_id.to_string(),
            program_id.to_string(),
        ));
        Ok(())
    }

    fn apply_flow_parameters(
        &mut self,
        parameters: &BTreeMap<String, f64>,
    ) -> Result<(), BackendError> {
        self.commands.push(Command::FlowParameters(parameters.clone()));
        Ok(())
    }

    fn advance(&mut self) -> Result<StepReport, BackendError> {
        if self.failing_step == Some(self.step) {
            return Err(BackendError::StepFailed(format!(
                "injected failure at step {}",
                self.step
            )));
        }
        self.step += 1;
        let waiting: Vec<f64> = self
            .intersections
            .values()
            .flat_map(|i| i.lanes.iter().flat_map(|l| l.vehicles.iter()))
            .map(|v| v.accumulated_wait)
            .collect();
        let mean_vehicle_wait = if waiting.is_empty() {
            0.0
        } else {
            waiting.iter().sum::<f64>() / waiting.len() as f64
        };
        Ok(StepReport {
            step: self.step,
            arrived: 1,
            mean_vehicle_wait,
            mean_pedestrian_wait: None,
        })
    }
}
