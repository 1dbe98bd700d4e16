use crate::model::rain::SeverityCategory;
use serde::{Deserialize, Serialize};

/// one row of the per-step statistics time series
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatisticsRecord {
    pub step: u64,
    /// mean vehicle wait in seconds
    pub vehicle_wait_time: f64,
    /// empty when the backend does not model pedestrians
    pub pedestrian_wait_time: Option<f64>,
    /// vehicles that completed their trip during the step
    pub traffic_flow: usize,
    pub rain_category: SeverityCategory,
    pub rainfall_mm_h: f64,
    pub visibility: f64,
    pub friction: f64,
}
