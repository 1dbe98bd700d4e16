use rainsignal_core::engine::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridSimulationConfig {
    pub rows: usize,
    pub cols: usize,
    pub seed: u64,
    /// chance that a vehicle joins each approach in a step
    pub arrival_probability: f64,
    /// chance that a pedestrian joins each crosswalk in a step. zero disables pedestrians.
    pub pedestrian_arrival_probability: f64,
    /// dry-weather vehicle speed in m/s
    pub free_flow_speed: f64,
    /// dry-weather discharge of one green approach in vehicles per hour
    pub saturation_flow: f64,
    pub program_id: String,
    /// seconds
    pub green_duration: f64,
    /// seconds
    pub yellow_duration: f64,
}

impl Default for GridSimulationConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            seed: 42,
            arrival_probability: 0.12,
            pedestrian_arrival_probability: 0.02,
            free_flow_speed: 13.89,
            saturation_flow: 1800.0,
            program_id: String::from("0"),
            green_duration: 31.0,
            yellow_duration: 5.0,
        }
    }
}

impl GridSimulationConfig {
    pub fn validate(&self) -> Result<(), BackendError> {
        let err = |msg: String| Err(BackendError::ConfigurationError(msg));
        if self.rows == 0 || self.cols == 0 {
            return err(format!(
                "grid must have at least one row and column, found {}x{}",
                self.rows, self.cols
            ));
        }
        for (name, p) in [
            ("arrival_probability", self.arrival_probability),
            ("pedestrian_arrival_probability", self.pedestrian_arrival_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return err(format!("{name} must be in [0, 1], found {p}"));
            }
        }
        if self.free_flow_speed <= 0.0 || self.saturation_flow <= 0.0 {
            return err(String::from(
                "free_flow_speed and saturation_flow must be positive",
            ));
        }
        if self.green_duration <= 0.0 || self.yellow_duration <= 0.0 {
            return err(String::from("phase durations must be positive"));
        }
        Ok(())
    }
}
