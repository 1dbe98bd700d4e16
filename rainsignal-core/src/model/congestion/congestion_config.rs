use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CongestionConfig {
    /// number of most recent queue samples averaged into the congestion level
    pub window: usize,
    /// vehicles per incoming lane treated as a fully congested lane
    pub per_lane_capacity: f64,
    /// vehicles slower than this speed (m/s) count as queued
    pub stopped_speed_threshold: f64,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            window: 5,
            per_lane_capacity: 10.0,
            stopped_speed_threshold: 0.1,
        }
    }
}
