use super::GridSimulationConfig;
use rainsignal_core::engine::{BackendError, SignalBackend, StepReport};
use rainsignal_core::model::signal::{
    IntersectionId, IntersectionTelemetry, LaneTelemetry, PhaseDefinition, SignalProgram,
    VehicleTelemetry,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// approach name and the signal link that controls it
const APPROACHES: [(&str, usize); 4] = [("n", 0), ("s", 1), ("e", 4), ("w", 5)];
/// crosswalks walk with the parallel vehicle movement
const CROSSWALKS: [usize; 2] = [0, 4];

#[derive(Debug, Clone)]
struct Vehicle {
    id: String,
    speed: f64,
    wait: f64,
}

#[derive(Debug, Clone)]
struct Approach {
    lane_id: String,
    link: usize,
    queue: VecDeque<Vehicle>,
    /// fractional vehicles released so far in the current green
    credit: f64,
}

#[derive(Debug, Clone)]
struct Crosswalk {
    link: usize,
    waiting: Vec<f64>,
}

#[derive(Debug, Clone)]
struct GridIntersection {
    programs: HashMap<String, Vec<PhaseDefinition>>,
    active: String,
    phase_index: usize,
    elapsed: f64,
    /// duration set for the running phase, dropped when the phase ends
    duration_override: Option<f64>,
    approaches: Vec<Approach>,
    crosswalks: Vec<Crosswalk>,
}

impl GridIntersection {
    fn phases(&self) -> &[PhaseDefinition] {
        self.programs
            .get(&self.active)
            .map(|p| p.as_slice())
            .unwrap_or_default()
    }

    fn current_state(&self) -> &str {
        self.phases()
            .get(self.phase_index)
            .map(|p| p.state.as_str())
            .unwrap_or_default()
    }

    fn current_duration(&self) -> f64 {
        self.duration_override.unwrap_or_else(|| {
            self.phases()
                .get(self.phase_index)
                .map(|p| p.duration)
                .unwrap_or(1.0)
        })
    }

    fn advance_timer(&mut self) {
        self.elapsed += 1.0;
        if self.elapsed >= self.current_duration() {
            let n = self.phases().len().max(1);
            self.phase_index = (self.phase_index + 1) % n;
            self.elapsed = 0.0;
            self.duration_override = None;
        }
    }
}

fn is_green(state: &str, link: usize) -> bool {
    matches!(state.chars().nth(link), Some('G') | Some('g'))
}

/// deterministic queue simulation of a grid of four-phase intersections.
/// each approach is an independent queue fed by seeded random arrivals and
/// discharged at the saturation flow while its signal is green. a discharged
/// vehicle counts as arrived.
pub struct GridSimulation {
    intersections: BTreeMap<IntersectionId, GridIntersection>,
    rng: StdRng,
    arrival_probability: f64,
    pedestrian_arrival_probability: f64,
    free_flow_speed: f64,
    speed: f64,
    capacity: f64,
    step: u64,
    next_vehicle: u64,
}

impl GridSimulation {
    pub fn new(config: &GridSimulationConfig) -> Result<GridSimulation, BackendError> {
        config.validate()?;
        let program = vec![
            PhaseDefinition::new(config.green_duration, "GGGgrr"),
            PhaseDefinition::new(config.yellow_duration, "yyygrr"),
            PhaseDefinition::new(config.green_duration, "rrrGGG"),
            PhaseDefinition::new(config.yellow_duration, "rrryyy"),
        ];
        let mut intersections = BTreeMap::new();
        for row in 0..config.rows {
            for col in 0..config.cols {
                let id = format!("j_{row}_{col}");
                let approaches = APPROACHES
                    .iter()
                    .map(|(name, link)| Approach {
                        lane_id: format!("{id}_{name}_0"),
                        link: *link,
                        queue: VecDeque::new(),
                        credit: 0.0,
                    })
                    .collect();
                let crosswalks = CROSSWALKS
                    .iter()
                    .map(|link| Crosswalk {
                        link: *link,
                        waiting: vec![],
                    })
                    .collect();
                let mut programs = HashMap::new();
                programs.insert(config.program_id.clone(), program.clone());
                intersections.insert(
                    id,
                    GridIntersection {
                        programs,
                        active: config.program_id.clone(),
                        phase_index: 0,
                        elapsed: 0.0,
                        duration_override: None,
                        approaches,
                        crosswalks,
                    },
                );
            }
        }
        log::info!(
            "created {}x{} grid simulation with {} signalized intersections",
            config.rows,
            config.cols,
            intersections.len()
        );
        Ok(GridSimulation {
            intersections,
            rng: StdRng::seed_from_u64(config.seed),
            arrival_probability: config.arrival_probability,
            pedestrian_arrival_probability: config.pedestrian_arrival_probability,
            free_flow_speed: config.free_flow_speed,
            speed: config.free_flow_speed,
            capacity: config.saturation_flow,
            step: 0,
            next_vehicle: 0,
        })
    }

    /// vehicles released per second by one green approach
    fn discharge_rate(&self) -> f64 {
        let speed_ratio = (self.speed / self.free_flow_speed).min(1.0);
        self.capacity / 3600.0 * speed_ratio
    }

    fn get_mut(&mut self, intersection_id: &str) -> Result<&mut GridIntersection, BackendError> {
        self.intersections
            .get_mut(intersection_id)
            .ok_or_else(|| BackendError::UnknownIntersection(intersection_id.to_string()))
    }
}

impl SignalBackend for GridSimulation {
    fn intersection_ids(&self) -> Result<Vec<IntersectionId>, BackendError> {
        Ok(self.intersections.keys().cloned().collect())
    }

    fn telemetry(&self, intersection_id: &str) -> Result<IntersectionTelemetry, BackendError> {
        let i = self
            .intersections
            .get(intersection_id)
            .ok_or_else(|| BackendError::UnknownIntersection(intersection_id.to_string()))?;
        let incoming_lanes = i
            .approaches
            .iter()
            .map(|a| LaneTelemetry {
                lane_id: a.lane_id.clone(),
                vehicles: a
                    .queue
                    .iter()
                    .map(|v| VehicleTelemetry {
                        vehicle_id: v.id.clone(),
                        speed: v.speed,
                        accumulated_wait: v.wait,
                    })
                    .collect(),
            })
            .collect();
        Ok(IntersectionTelemetry {
            intersection_id: intersection_id.to_string(),
            signal_ids: vec![intersection_id.to_string()],
            incoming_lanes,
            program_id: i.active.clone(),
            phases: i.phases().to_vec(),
            phase_index: i.phase_index,
        })
    }

    fn set_phase_duration(
        &mut self,
        intersection_id: &str,
        seconds: f64,
    ) -> Result<(), BackendError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(BackendError::CommandFailed {
                command: String::from("set_phase_duration"),
                intersection_id: intersection_id.to_string(),
                msg: format!("invalid duration {seconds}"),
            });
        }
        self.get_mut(intersection_id)?.duration_override = Some(seconds);
        Ok(())
    }

    fn set_program_logic(
        &mut self,
        intersection_id: &str,
        program: &SignalProgram,
    ) -> Result<(), BackendError> {
        if program.phases.is_empty() {
            return Err(BackendError::CommandFailed {
                command: String::from("set_program_logic"),
                intersection_id: intersection_id.to_string(),
                msg: format!("program '{}' has no phases", program.program_id),
            });
        }
        self.get_mut(intersection_id)?
            .programs
            .insert(program.program_id.clone(), program.phases.clone());
        Ok(())
    }

    fn switch_program(
        &mut self,
        intersection_id: &str,
        program_id: &str,
    ) -> Result<(), BackendError> {
        let i = self.get_mut(intersection_id)?;
        let len = match i.programs.get(program_id) {
            Some(phases) => phases.len(),
            None => {
                return Err(BackendError::UnknownProgram {
                    intersection_id: intersection_id.to_string(),
                    program_id: program_id.to_string(),
                })
            }
        };
        i.active = program_id.to_string();
        i.phase_index %= len;
        i.duration_override = None;
        Ok(())
    }

    fn apply_flow_parameters(
        &mut self,
        parameters: &BTreeMap<String, f64>,
    ) -> Result<(), BackendError> {
        if let Some(speed) = parameters.get("speed") {
            self.speed = *speed;
        }
        if let Some(capacity) = parameters.get("capacity") {
            self.capacity = *capacity;
        }
        log::debug!(
            "flow parameters: speed {:.2} m/s, capacity {:.0} veh/h",
            self.speed,
            self.capacity
        );
        Ok(())
    }

    fn advance(&mut self) -> Result<StepReport, BackendError> {
        self.step += 1;
        let rate = self.discharge_rate();
        let mut arrived = 0;
        for i in self.intersections.values_mut() {
            let state = i.current_state().to_string();
            for approach in i.approaches.iter_mut() {
                for v in approach.queue.iter_mut() {
                    v.speed = 0.0;
                    v.wait += 1.0;
                }
                if is_green(&state, approach.link) {
                    approach.credit += rate;
                    while approach.credit >= 1.0 && approach.queue.pop_front().is_some() {
                        approach.credit -= 1.0;
                        arrived += 1;
                    }
                    if approach.queue.is_empty() {
                        approach.credit = approach.credit.min(1.0);
                    }
                } else {
                    approach.credit = 0.0;
                }
                if self.rng.random_bool(self.arrival_probability) {
                    self.next_vehicle += 1;
                    approach.queue.push_back(Vehicle {
                        id: format!("veh{}", self.next_vehicle),
                        speed: self.speed,
                        wait: 0.0,
                    });
                }
            }
            for crosswalk in i.crosswalks.iter_mut() {
                if is_green(&state, crosswalk.link) {
                    crosswalk.waiting.clear();
                } else {
                    crosswalk.waiting.iter_mut().for_each(|w| *w += 1.0);
                }
                if self.rng.random_bool(self.pedestrian_arrival_probability) {
                    crosswalk.waiting.push(0.0);
                }
            }
            i.advance_timer();
        }

        let waits: Vec<f64> = self
            .intersections
            .values()
            .flat_map(|i| i.approaches.iter().flat_map(|a| a.queue.iter()))
            .map(|v| v.wait)
            .collect();
        let mean_vehicle_wait = mean(&waits);
        let mean_pedestrian_wait = if self.pedestrian_arrival_probability > 0.0 {
            let waiting: Vec<f64> = self
                .intersections
                .values()
                .flat_map(|i| i.crosswalks.iter().flat_map(|c| c.waiting.iter().copied()))
                .collect();
            Some(mean(&waiting))
        } else {
            None
        };
        Ok(StepReport {
            step: self.step,
            arrived,
            mean_vehicle_wait,
            mean_pedestrian_wait,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
